use actix::Actor;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use cevicheria_server::AppState;
use cevicheria_server::api::webpay_client::WebpayConfig;
use cevicheria_server::notify::ChannelLayer;
use cevicheria_server::ws::OrdersHub;

/// Channel double that records every publish instead of pushing to a hub.
pub struct RecordingChannel {
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            messages: Mutex::new(Vec::new()),
        })
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.messages.lock().expect("channel lock").clone()
    }
}

impl ChannelLayer for RecordingChannel {
    fn publish(&self, topic: &str, payload: String) {
        self.messages
            .lock()
            .expect("channel lock")
            .push((topic.to_string(), payload));
    }
}

/// Fresh in-memory database per test. A single connection keeps every
/// query on the same :memory: instance.
pub async fn init_test_db() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("sqlite options")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("connect test db");
    sqlx::migrate!().run(&pool).await.expect("migrations");
    pool
}

pub fn webpay_test_config() -> WebpayConfig {
    WebpayConfig {
        host: "http://localhost:0".to_string(),
        commerce_code: "597055555532".to_string(),
        api_key: "test-key".to_string(),
    }
}

pub fn build_state(pool: SqlitePool, channel: Arc<dyn ChannelLayer>) -> AppState {
    AppState {
        pool,
        hub: OrdersHub::new().start(),
        channel,
        webpay: webpay_test_config(),
        webpay_return_url: "http://localhost:8080/webpay/commit".to_string(),
        webpay_final_url: "http://localhost:8080/pago-finalizado".to_string(),
        webpay_failed_url: "http://localhost:8080/pago-fallido".to_string(),
    }
}
