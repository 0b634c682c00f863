// src/api/staff_orders.rs

use actix_web::{get, patch, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::models::OrderStatus;
use crate::orders::{self, StatusChangeError};
use crate::{db, AppState};

/// Kitchen board: every order, newest first, with customer and items.
#[utoipa::path(
    get,
    path = "/api/orders",
    responses((status = 200, description = "All orders, newest first", body = [crate::models::OrderDetail])),
    tag = "staff"
)]
#[get("/orders")]
pub async fn list_orders(state: web::Data<AppState>) -> impl Responder {
    match db::list_order_details(&state.pool).await {
        Ok(orders) => HttpResponse::Ok().json(orders),
        Err(e) => {
            log::error!("list orders error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusChangeRequest {
    pub status: OrderStatus,
}

/// Staff move orders through fulfillment. Payment states are owned by
/// the gateway flow and are rejected here.
#[utoipa::path(
    patch,
    path = "/api/orders/{id}/status",
    params(("id" = i64, Path, description = "Order to update")),
    request_body = StatusChangeRequest,
    responses(
        (status = 200, description = "Updated order", body = crate::models::OrderDetail),
        (status = 400, description = "Transition not allowed"),
        (status = 404, description = "Unknown order")
    ),
    tag = "staff"
)]
#[patch("/orders/{id}/status")]
pub async fn update_order_status(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<StatusChangeRequest>,
) -> impl Responder {
    let order_id = path.into_inner();

    match orders::set_order_status(&state.pool, order_id, body.status).await {
        Ok(detail) => HttpResponse::Ok().json(detail),
        Err(StatusChangeError::NotFound) => {
            HttpResponse::NotFound().json(json!({"error": "order not found"}))
        }
        Err(StatusChangeError::NotAllowed(reason)) => {
            HttpResponse::BadRequest().json(json!({"error": reason}))
        }
        Err(StatusChangeError::Db(e)) => {
            log::error!("update order {order_id} status error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
