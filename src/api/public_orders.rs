// src/api/public_orders.rs

use actix_web::{get, post, web, HttpResponse, Responder};
use serde_json::json;

use crate::orders::{self, CartRequest, PlaceOrderError};
use crate::{db, AppState};

/// Storefront checkout: validate the cart, persist the order atomically
/// and, for cash orders, push it to the kitchen right away.
#[utoipa::path(
    post,
    path = "/api/public/orders",
    request_body = CartRequest,
    responses(
        (status = 201, description = "Order stored", body = crate::models::OrderDetail),
        (status = 400, description = "Cart failed validation"),
        (status = 500, description = "Storage error")
    ),
    tag = "public"
)]
#[post("/public/orders")]
pub async fn create_public_order(
    state: web::Data<AppState>,
    cart: web::Json<CartRequest>,
) -> impl Responder {
    match orders::place_order(&state.pool, &state.channel, &cart).await {
        Ok(detail) => HttpResponse::Created().json(detail),
        Err(PlaceOrderError::Invalid(fields)) => {
            HttpResponse::BadRequest().json(json!({"error": "invalid cart", "fields": fields}))
        }
        Err(PlaceOrderError::Db(e)) => {
            log::error!("place order error: {e}");
            HttpResponse::InternalServerError().json(json!({"error": "could not store order"}))
        }
    }
}

/// How many orders the kitchen is currently working through. The
/// storefront uses it to show a rough wait before checkout.
#[utoipa::path(
    get,
    path = "/api/public/orders/active-count",
    responses((status = 200, description = "Count of NEW and IN_PROGRESS orders")),
    tag = "public"
)]
#[get("/public/orders/active-count")]
pub async fn active_order_count(state: web::Data<AppState>) -> impl Responder {
    match db::active_order_count(&state.pool).await {
        Ok(count) => HttpResponse::Ok().json(json!({"count": count})),
        Err(e) => {
            log::error!("active order count error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
