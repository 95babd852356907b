/// Custom `validator` crate rules not covered by its built-in validators.
use validator::ValidationError;

/// Rejects a string that is empty once whitespace is trimmed.
/// `validator`'s built-in `length(min = 1)` counts raw characters, so a
/// string of only spaces would otherwise pass.
pub fn validate_non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("blank"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_whitespace_only() {
        assert!(validate_non_blank("   ").is_err());
    }

    #[test]
    fn accepts_non_blank() {
        assert!(validate_non_blank("Alice").is_ok());
    }
}
