/// Operational outbox endpoints (spec §6). Retained so a pull-based
/// dispatcher variant remains possible; these bypass the row-level lock used
/// by the drainer and should be network-restricted in production.
use crate::error::{AppError, AppResult};
use actix_web::{web, HttpResponse};
use event_schema::OutboxEvent;
use serde::Deserialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct UnsentQuery {
    #[serde(default = "default_max")]
    pub max: i64,
}

fn default_max() -> i64 {
    100
}

fn row_to_event(row: sqlx::postgres::PgRow) -> Result<OutboxEvent, sqlx::Error> {
    Ok(OutboxEvent {
        id: row.try_get("id")?,
        aggregate_id: row.try_get("aggregate_id")?,
        event_type: row.try_get("event_type")?,
        payload: row.try_get::<serde_json::Value, _>("payload")?.to_string(),
        created_at: row.try_get("created_at")?,
        sent_at: row.try_get("sent_at")?,
        retry_count: row.try_get::<i32, _>("retry_count")? as u32,
        last_error: row.try_get("last_error")?,
    })
}

/// `GET /api/outbox/unsent?max=N`
pub async fn unsent(pool: web::Data<PgPool>, query: web::Query<UnsentQuery>) -> AppResult<HttpResponse> {
    let rows = sqlx::query(
        r#"
        SELECT id, aggregate_id, event_type, payload, created_at, sent_at, retry_count, last_error
        FROM outbox_events
        WHERE sent_at IS NULL
        ORDER BY created_at ASC
        LIMIT $1
        "#,
    )
    .bind(query.max)
    .fetch_all(pool.get_ref())
    .await?;

    let events = rows
        .into_iter()
        .map(row_to_event)
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

    Ok(HttpResponse::Ok().json(events))
}

/// `POST /api/outbox/mark-sent/{id}`
pub async fn mark_sent(pool: web::Data<PgPool>, id: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let result = sqlx::query("UPDATE outbox_events SET sent_at = NOW() WHERE id = $1")
        .bind(id.into_inner())
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("outbox row not found".to_string()));
    }
    Ok(HttpResponse::NoContent().finish())
}

/// `POST /api/outbox/increment-retry/{id}`
pub async fn increment_retry(pool: web::Data<PgPool>, id: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let result = sqlx::query(
        "UPDATE outbox_events SET retry_count = retry_count + 1 WHERE id = $1",
    )
    .bind(id.into_inner())
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("outbox row not found".to_string()));
    }
    Ok(HttpResponse::NoContent().finish())
}
