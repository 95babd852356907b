/// User command handlers - HTTP endpoints for the User aggregate.
use crate::db::SqlxUserRepository;
use crate::error::AppResult;
use crate::models::{ChangeUserStatusRequest, CreateUserRequest};
use crate::services::UserCommandService;
use actix_web::{web, HttpResponse};
use sqlx::PgPool;
use std::sync::Arc;
use transactional_outbox::SqlxOutboxRepository;
use uuid::Uuid;

fn service(pool: &PgPool) -> UserCommandService<SqlxUserRepository, SqlxOutboxRepository> {
    UserCommandService::new(
        pool.clone(),
        Arc::new(SqlxUserRepository::new(pool.clone())),
        Arc::new(SqlxOutboxRepository::new(pool.clone())),
    )
}

/// `POST /api/users`
pub async fn create_user(
    pool: web::Data<PgPool>,
    req: web::Json<CreateUserRequest>,
) -> AppResult<HttpResponse> {
    let user = service(&pool).create_user(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(user))
}

/// `GET /api/users/{id}`
pub async fn get_user(pool: web::Data<PgPool>, id: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let user = service(&pool).get_user(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// `PATCH /api/users/{id}/status`
pub async fn change_user_status(
    pool: web::Data<PgPool>,
    id: web::Path<Uuid>,
    req: web::Json<ChangeUserStatusRequest>,
) -> AppResult<HttpResponse> {
    service(&pool)
        .change_user_status(id.into_inner(), req.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
