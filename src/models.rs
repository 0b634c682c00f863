// src/models.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Order lifecycle as the kitchen board sees it. PAID and FAILED are the
/// terminal outcomes of a card payment attempt; cash orders move along
/// NEW -> IN_PROGRESS -> READY -> DELIVERED by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    InProgress,
    Ready,
    Delivered,
    Paid,
    Failed,
}

impl OrderStatus {
    /// Orders the kitchen is still working on; these feed the ETA estimate.
    pub fn is_active(self) -> bool {
        matches!(self, OrderStatus::New | OrderStatus::InProgress)
    }

    /// Statuses the staff board may set by hand. Everything else belongs
    /// to the creation or payment flow.
    pub fn is_fulfillment(self) -> bool {
        matches!(
            self,
            OrderStatus::InProgress | OrderStatus::Ready | OrderStatus::Delivered
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Webpay,
    #[serde(rename = "MERCADOPAGO")]
    #[sqlx(rename = "MERCADOPAGO")]
    MercadoPago,
}

impl PaymentMethod {
    /// Cash settles at the counter, so the kitchen hears about the order
    /// right away. Gateway methods stay silent until confirmation.
    pub fn requires_confirmation(self) -> bool {
        !matches!(self, PaymentMethod::Cash)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CASH" => Some(PaymentMethod::Cash),
            "WEBPAY" => Some(PaymentMethod::Webpay),
            "MERCADOPAGO" => Some(PaymentMethod::MercadoPago),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub available: bool,
    pub image: Option<String>,
}

/// Bare order row, without customer or items. Internal to the payment and
/// staff flows; API responses use `OrderDetail`.
#[derive(Debug)]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    pub status: OrderStatus,
    pub total_price: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub token_ws: Option<String>,
    pub buy_order: Option<String>,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order joined with its customer and items, the shape handed to the
/// storefront and the staff board.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetail {
    pub id: i64,
    pub customer_id: i64,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub email: String,
    pub status: OrderStatus,
    pub total_price: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemDetail>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemDetail {
    pub id: i64,
    pub product_name: String,
    pub qty: i64,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}
