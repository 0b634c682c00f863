// src/orders.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::models::{OrderDetail, OrderStatus, PaymentMethod, PaymentStatus};
use crate::notify::{self, ChannelLayer, OrderChange};
use crate::{db, money};

/// Cart as the storefront posts it. Unknown fields (client-side totals
/// included) are dropped on deserialization; totals are always recomputed
/// server-side.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CartRequest {
    pub customer_id: Option<i64>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    /// CASH | WEBPAY | MERCADOPAGO; defaults to CASH.
    pub payment_method: Option<String>,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CartItem {
    pub product_name: String,
    pub qty: i64,
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

fn field_error(field: impl Into<String>, message: &str) -> FieldError {
    FieldError {
        field: field.into(),
        message: message.to_string(),
    }
}

#[derive(Debug)]
pub enum PlaceOrderError {
    Invalid(Vec<FieldError>),
    Db(sqlx::Error),
}

impl From<sqlx::Error> for PlaceOrderError {
    fn from(value: sqlx::Error) -> Self {
        Self::Db(value)
    }
}

enum CustomerRef {
    Existing(i64),
    New {
        name: String,
        phone: String,
        address: String,
        email: String,
    },
}

struct ValidItem {
    product_name: String,
    qty: i64,
    unit_price: Decimal,
    subtotal: Decimal,
}

struct ValidCart {
    customer: CustomerRef,
    payment_method: PaymentMethod,
    items: Vec<ValidItem>,
}

fn trimmed(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or("").to_string()
}

/// Field-level validation; all failures are collected and reported
/// together so the storefront can highlight every bad input at once.
fn validate_cart(cart: &CartRequest) -> Result<ValidCart, Vec<FieldError>> {
    let mut errors = Vec::new();

    let customer = match cart.customer_id {
        Some(id) => Some(CustomerRef::Existing(id)),
        None => {
            let name = cart.name.as_deref().map(str::trim).unwrap_or("");
            if name.is_empty() {
                errors.push(field_error(
                    "name",
                    "a customer_id or a non-empty name is required",
                ));
                None
            } else {
                Some(CustomerRef::New {
                    name: name.to_string(),
                    phone: trimmed(&cart.phone),
                    address: trimmed(&cart.address),
                    email: trimmed(&cart.email),
                })
            }
        }
    };

    let payment_method = match cart.payment_method.as_deref().map(str::trim) {
        None | Some("") => Some(PaymentMethod::Cash),
        Some(raw) => match PaymentMethod::parse(raw) {
            Some(method) => Some(method),
            None => {
                errors.push(field_error("payment_method", "unknown payment method"));
                None
            }
        },
    };

    if cart.items.is_empty() {
        errors.push(field_error("items", "at least one item is required"));
    }

    let mut items = Vec::with_capacity(cart.items.len());
    for (idx, item) in cart.items.iter().enumerate() {
        let mut ok = true;
        if item.product_name.trim().is_empty() {
            errors.push(field_error(
                format!("items[{idx}].product_name"),
                "product name is required",
            ));
            ok = false;
        }
        if item.qty <= 0 {
            errors.push(field_error(
                format!("items[{idx}].qty"),
                "qty must be a positive integer",
            ));
            ok = false;
        }
        if item.unit_price < Decimal::ZERO {
            errors.push(field_error(
                format!("items[{idx}].unit_price"),
                "unit price cannot be negative",
            ));
            ok = false;
        } else if item.unit_price.scale() > money::DECIMAL_PLACES {
            errors.push(field_error(
                format!("items[{idx}].unit_price"),
                "unit price has more than two decimal places",
            ));
            ok = false;
        }
        if ok {
            let mut unit_price = item.unit_price;
            unit_price.rescale(money::DECIMAL_PLACES);
            items.push(ValidItem {
                product_name: item.product_name.trim().to_string(),
                qty: item.qty,
                unit_price,
                subtotal: money::line_subtotal(item.qty, unit_price),
            });
        }
    }

    match (errors.is_empty(), customer, payment_method) {
        (true, Some(customer), Some(payment_method)) => Ok(ValidCart {
            customer,
            payment_method,
            items,
        }),
        _ => Err(errors),
    }
}

/// Re-derive the stored order total from its items. Money lives in TEXT
/// columns, so the sum happens here in Decimal, never in SQL.
pub async fn recompute_total(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: i64,
    now: DateTime<Utc>,
) -> Result<Decimal, sqlx::Error> {
    let rows = sqlx::query("SELECT subtotal FROM order_items WHERE order_id = ?")
        .bind(order_id)
        .fetch_all(&mut **tx)
        .await?;

    let mut total = Decimal::ZERO;
    for row in &rows {
        let raw: String = row.try_get("subtotal")?;
        total += Decimal::from_str(&raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    }
    total.rescale(money::DECIMAL_PLACES);

    sqlx::query("UPDATE orders SET total_price = ?, updated_at = ? WHERE id = ?")
        .bind(total.to_string())
        .bind(now)
        .bind(order_id)
        .execute(&mut **tx)
        .await?;

    Ok(total)
}

/// Validate the cart, persist it in one transaction, then let the
/// dispatcher decide whether the kitchen hears about it now (cash) or
/// after the gateway confirms.
pub async fn place_order(
    pool: &SqlitePool,
    channel: &Arc<dyn ChannelLayer>,
    cart: &CartRequest,
) -> Result<OrderDetail, PlaceOrderError> {
    let valid = validate_cart(cart).map_err(PlaceOrderError::Invalid)?;

    let mut tx = pool.begin().await?;

    let customer_id = match &valid.customer {
        CustomerRef::Existing(id) => {
            let found = sqlx::query("SELECT id FROM customers WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
            if found.is_none() {
                return Err(PlaceOrderError::Invalid(vec![field_error(
                    "customer_id",
                    "customer does not exist",
                )]));
            }
            *id
        }
        CustomerRef::New {
            name,
            phone,
            address,
            email,
        } => {
            let row = sqlx::query(
                r#"INSERT INTO customers (name, phone, address, email)
                   VALUES (?, ?, ?, ?)
                   RETURNING id"#,
            )
            .bind(name)
            .bind(phone)
            .bind(address)
            .bind(email)
            .fetch_one(&mut *tx)
            .await?;
            row.try_get("id")?
        }
    };

    let now = Utc::now();
    let order_row = sqlx::query(
        r#"INSERT INTO orders
               (customer_id, status, total_price, payment_method, payment_status, created_at, updated_at)
           VALUES (?, ?, '0.00', ?, ?, ?, ?)
           RETURNING id"#,
    )
    .bind(customer_id)
    .bind(OrderStatus::New)
    .bind(valid.payment_method)
    .bind(PaymentStatus::Pending)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;
    let order_id: i64 = order_row.try_get("id")?;

    for item in &valid.items {
        sqlx::query(
            r#"INSERT INTO order_items (order_id, product_name, qty, unit_price, subtotal)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(order_id)
        .bind(&item.product_name)
        .bind(item.qty)
        .bind(item.unit_price.to_string())
        .bind(item.subtotal.to_string())
        .execute(&mut *tx)
        .await?;
    }

    recompute_total(&mut tx, order_id, now).await?;
    tx.commit().await?;

    if notify::should_notify(valid.payment_method, &OrderChange::Created) {
        notify::dispatch_order(pool, channel, order_id).await;
    } else {
        log::info!("order {order_id} created, notification deferred until payment confirmation");
    }

    match db::fetch_order_detail(pool, order_id).await? {
        Some(detail) => Ok(detail),
        None => Err(PlaceOrderError::Db(sqlx::Error::RowNotFound)),
    }
}

#[derive(Debug)]
pub enum StatusChangeError {
    NotFound,
    NotAllowed(&'static str),
    Db(sqlx::Error),
}

impl From<sqlx::Error> for StatusChangeError {
    fn from(value: sqlx::Error) -> Self {
        Self::Db(value)
    }
}

/// Staff fulfillment transition. Payment outcomes (PAID/FAILED) belong to
/// the gateway flow and cannot be set here, and the kitchen feed stays
/// quiet: staff edits are corrections, not new orders.
pub async fn set_order_status(
    pool: &SqlitePool,
    order_id: i64,
    new_status: OrderStatus,
) -> Result<OrderDetail, StatusChangeError> {
    if !new_status.is_fulfillment() {
        return Err(StatusChangeError::NotAllowed(
            "only IN_PROGRESS, READY or DELIVERED can be set here",
        ));
    }

    let order = db::fetch_order(pool, order_id)
        .await?
        .ok_or(StatusChangeError::NotFound)?;

    if order.status == OrderStatus::Failed {
        return Err(StatusChangeError::NotAllowed(
            "order is in a failed payment state",
        ));
    }

    sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ?")
        .bind(new_status)
        .bind(Utc::now())
        .bind(order_id)
        .execute(pool)
        .await?;

    db::fetch_order_detail(pool, order_id)
        .await?
        .ok_or(StatusChangeError::NotFound)
}
