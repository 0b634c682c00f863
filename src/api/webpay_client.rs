// src/api/webpay_client.rs
//
// Minimal client for the Transbank Webpay Plus REST API (v1.2).
// Auth: Tbk-Api-Key-Id (commerce code) + Tbk-Api-Key-Secret headers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

pub const WEBPAY_INTEGRATION_HOST: &str = "https://webpay3gint.transbank.cl";
pub const WEBPAY_PRODUCTION_HOST: &str = "https://webpay3g.transbank.cl";

/// Public Transbank integration credentials, shared by every test shop.
pub const INTEGRATION_COMMERCE_CODE: &str = "597055555532";
pub const INTEGRATION_API_KEY: &str =
    "579B532A7440BB0C9079DED94D31EA1615BACEB56610332264630D42D0A36B1C";

const TRANSACTIONS_PATH: &str = "/rswebpaytransaction/api/webpay/v1.2/transactions";

#[derive(Debug)]
pub enum WebpayError {
    Http(reqwest::Error),
    Api { status: u16, body: String },
    InvalidResponse(String),
}

impl fmt::Display for WebpayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebpayError::Http(e) => write!(f, "http error: {e}"),
            WebpayError::Api { status, body } => {
                write!(f, "webpay api error status={status} body={body}")
            }
            WebpayError::InvalidResponse(e) => write!(f, "invalid response: {e}"),
        }
    }
}

impl From<reqwest::Error> for WebpayError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

#[derive(Debug, Clone)]
pub struct WebpayConfig {
    pub host: String,
    pub commerce_code: String,
    pub api_key: String,
}

impl WebpayConfig {
    /// Sandbox credentials unless the environment overrides them, so a
    /// bare checkout works against the Transbank integration host.
    pub fn from_env() -> Self {
        let environment = env::var("WEBPAY_ENVIRONMENT").unwrap_or_else(|_| "TEST".to_string());
        let host = if environment.eq_ignore_ascii_case("LIVE") {
            WEBPAY_PRODUCTION_HOST
        } else {
            WEBPAY_INTEGRATION_HOST
        };
        Self {
            host: host.to_string(),
            commerce_code: env::var("WEBPAY_COMMERCE_CODE")
                .unwrap_or_else(|_| INTEGRATION_COMMERCE_CODE.to_string()),
            api_key: env::var("WEBPAY_API_KEY")
                .unwrap_or_else(|_| INTEGRATION_API_KEY.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateTransactionRequest {
    pub buy_order: String,
    pub session_id: String,
    /// Webpay takes the amount as a JSON number.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub return_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransactionResponse {
    pub token: String,
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommitTransactionResponse {
    pub vci: Option<String>,
    pub status: Option<String>,
    pub response_code: Option<i32>,
    pub buy_order: Option<String>,
    pub session_id: Option<String>,
    pub authorization_code: Option<String>,
    pub transaction_date: Option<String>,
    pub amount: Option<f64>,

    #[serde(flatten)]
    pub extra: serde_json::Value,
}

/// Webpay approval is the conjunction of all three signals; anything
/// less is a rejected payment.
pub fn is_authorized(resp: &CommitTransactionResponse) -> bool {
    resp.status.as_deref() == Some("AUTHORIZED")
        && resp.response_code == Some(0)
        && resp.vci.as_deref() == Some("TSY")
}

pub async fn create_transaction(
    cfg: &WebpayConfig,
    req: &CreateTransactionRequest,
) -> Result<CreateTransactionResponse, WebpayError> {
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}{TRANSACTIONS_PATH}", cfg.host))
        .header("Tbk-Api-Key-Id", &cfg.commerce_code)
        .header("Tbk-Api-Key-Secret", &cfg.api_key)
        .json(req)
        .send()
        .await?;

    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(WebpayError::Api {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str::<CreateTransactionResponse>(&body)
        .map_err(|e| WebpayError::InvalidResponse(format!("{e}; body={body}")))
}

pub async fn commit_transaction(
    cfg: &WebpayConfig,
    token: &str,
) -> Result<CommitTransactionResponse, WebpayError> {
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("{}{TRANSACTIONS_PATH}/{token}", cfg.host))
        .header("Tbk-Api-Key-Id", &cfg.commerce_code)
        .header("Tbk-Api-Key-Secret", &cfg.api_key)
        .send()
        .await?;

    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(WebpayError::Api {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str::<CommitTransactionResponse>(&body)
        .map_err(|e| WebpayError::InvalidResponse(format!("{e}; body={body}")))
}
