/// Order command handlers - HTTP endpoints for the Order aggregate.
use crate::error::AppResult;
use crate::models::{CreateOrderRequest, UpdateOrderStatusRequest};
use crate::services::OrderService;
use actix_web::{web, HttpResponse};
use uuid::Uuid;

/// `POST /api/orders`
pub async fn create_order(
    service: web::Data<OrderService>,
    req: web::Json<CreateOrderRequest>,
) -> AppResult<HttpResponse> {
    let order = service.create_order(req.into_inner()).await?;
    Ok(HttpResponse::Created().json(order))
}

/// `GET /api/orders/{id}`
pub async fn get_order(
    service: web::Data<OrderService>,
    id: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let order = service.get_order(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

/// `PATCH /api/orders/{id}/status`
pub async fn update_order_status(
    service: web::Data<OrderService>,
    id: web::Path<Uuid>,
    req: web::Json<UpdateOrderStatusRequest>,
) -> AppResult<HttpResponse> {
    service
        .update_order_status(id.into_inner(), req.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
