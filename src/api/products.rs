// src/api/products.rs

use actix_web::{get, web, HttpResponse, Responder};

use crate::{db, AppState};

/// Menu for the storefront: available products only, ordered by name.
#[utoipa::path(
    get,
    path = "/api/products",
    responses((status = 200, description = "Available products", body = [crate::models::Product])),
    tag = "public"
)]
#[get("/products")]
pub async fn list_products(state: web::Data<AppState>) -> impl Responder {
    match db::list_available_products(&state.pool).await {
        Ok(products) => HttpResponse::Ok().json(products),
        Err(e) => {
            log::error!("list products error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
