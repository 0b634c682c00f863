// src/main.rs
use actix::Actor;
use actix_web::{App, HttpResponse, HttpServer, Responder, web};
use dotenvy::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use cevicheria_server::api::webpay_client::WebpayConfig;
use cevicheria_server::notify::ChannelLayer;
use cevicheria_server::ws::{HubChannel, OrdersHub};
use cevicheria_server::{AppState, api, docs, ws};

async fn index() -> impl Responder {
    HttpResponse::Ok().body("Cevicheria backend ready!")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://cevicheria.db".to_string());
    let options = SqliteConnectOptions::from_str(&database_url)
        .expect("invalid DATABASE_URL")
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .expect("Failed to connect to DB");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let webpay = WebpayConfig::from_env();

    let public_base_url =
        env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let webpay_return_url = env::var("WEBPAY_RETURN_URL")
        .unwrap_or_else(|_| format!("{public_base_url}/webpay/commit"));
    let webpay_final_url = env::var("WEBPAY_FINAL_URL")
        .unwrap_or_else(|_| format!("{public_base_url}/pago-finalizado"));
    let webpay_failed_url =
        env::var("WEBPAY_FAILED_URL").unwrap_or_else(|_| format!("{public_base_url}/pago-fallido"));

    let hub = OrdersHub::new().start();
    let channel: Arc<dyn ChannelLayer> = Arc::new(HubChannel::new(hub.clone()));

    let state = web::Data::new(AppState {
        pool,
        hub,
        channel,
        webpay,
        webpay_return_url,
        webpay_final_url,
        webpay_failed_url,
    });

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("listening on {host}:{port}, webpay host {}", state.webpay.host);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/", web::get().to(index))
            .service(
                SwaggerUi::new("/docs/{_:.*}")
                    .url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
            )
            .service(
                web::scope("/api")
                    .service(api::products::list_products)
                    .service(api::public_orders::create_public_order)
                    .service(api::public_orders::active_order_count)
                    .service(api::staff_orders::list_orders)
                    .service(api::staff_orders::update_order_status)
                    .service(api::webpay::webpay_init),
            )
            // Webpay redirects the customer's browser here, outside /api.
            .service(api::webpay::webpay_commit)
            .route("/ws/orders", web::get().to(ws::orders_ws))
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
