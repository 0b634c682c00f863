pub mod api;
pub mod db;
pub mod docs;
pub mod eta;
pub mod models;
pub mod money;
pub mod notify;
pub mod orders;
pub mod ws;

use actix::Addr;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::api::webpay_client::WebpayConfig;
use crate::notify::ChannelLayer;
use crate::ws::OrdersHub;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub hub: Addr<OrdersHub>,
    pub channel: Arc<dyn ChannelLayer>,
    pub webpay: WebpayConfig,
    pub webpay_return_url: String,
    pub webpay_final_url: String,
    pub webpay_failed_url: String,
}
