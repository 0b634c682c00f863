// src/db.rs

use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

use crate::models::{Order, OrderDetail, OrderItemDetail, Product};

/// Money columns are TEXT; parse failures surface as decode errors
/// instead of panicking mid-request.
pub(crate) fn money_column(row: &SqliteRow, column: &str) -> Result<Decimal, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str(&raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn order_from_row(row: &SqliteRow) -> Result<Order, sqlx::Error> {
    Ok(Order {
        id: row.try_get("id")?,
        customer_id: row.try_get("customer_id")?,
        status: row.try_get("status")?,
        total_price: money_column(row, "total_price")?,
        payment_method: row.try_get("payment_method")?,
        payment_status: row.try_get("payment_status")?,
        token_ws: row.try_get("token_ws")?,
        buy_order: row.try_get("buy_order")?,
        session_id: row.try_get("session_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub async fn fetch_order(pool: &SqlitePool, order_id: i64) -> Result<Option<Order>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT id, customer_id, status, total_price, payment_method, payment_status,
                  token_ws, buy_order, session_id, created_at, updated_at
           FROM orders
           WHERE id = ?"#,
    )
    .bind(order_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(order_from_row).transpose()
}

pub async fn fetch_order_by_token(
    pool: &SqlitePool,
    token: &str,
) -> Result<Option<Order>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT id, customer_id, status, total_price, payment_method, payment_status,
                  token_ws, buy_order, session_id, created_at, updated_at
           FROM orders
           WHERE token_ws = ?"#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(order_from_row).transpose()
}

pub async fn fetch_order_by_buy_order(
    pool: &SqlitePool,
    buy_order: &str,
) -> Result<Option<Order>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT id, customer_id, status, total_price, payment_method, payment_status,
                  token_ws, buy_order, session_id, created_at, updated_at
           FROM orders
           WHERE buy_order = ?"#,
    )
    .bind(buy_order)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(order_from_row).transpose()
}

fn detail_from_row(row: &SqliteRow, items: Vec<OrderItemDetail>) -> Result<OrderDetail, sqlx::Error> {
    Ok(OrderDetail {
        id: row.try_get("id")?,
        customer_id: row.try_get("customer_id")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        email: row.try_get("email")?,
        status: row.try_get("status")?,
        total_price: money_column(row, "total_price")?,
        payment_method: row.try_get("payment_method")?,
        payment_status: row.try_get("payment_status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        items,
    })
}

pub async fn fetch_order_items(
    pool: &SqlitePool,
    order_id: i64,
) -> Result<Vec<OrderItemDetail>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT id, product_name, qty, unit_price, subtotal
           FROM order_items
           WHERE order_id = ?
           ORDER BY id"#,
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|r| {
            Ok(OrderItemDetail {
                id: r.try_get("id")?,
                product_name: r.try_get("product_name")?,
                qty: r.try_get("qty")?,
                unit_price: money_column(r, "unit_price")?,
                subtotal: money_column(r, "subtotal")?,
            })
        })
        .collect()
}

/// Order with customer fields and items, the full board/storefront shape.
pub async fn fetch_order_detail(
    pool: &SqlitePool,
    order_id: i64,
) -> Result<Option<OrderDetail>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT o.id, o.customer_id, c.name, c.phone, c.address, c.email,
                  o.status, o.total_price, o.payment_method, o.payment_status,
                  o.created_at, o.updated_at
           FROM orders o
           JOIN customers c ON c.id = o.customer_id
           WHERE o.id = ?"#,
    )
    .bind(order_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let items = fetch_order_items(pool, order_id).await?;
    Ok(Some(detail_from_row(&row, items)?))
}

/// Newest first, for the staff board bootstrap.
pub async fn list_order_details(pool: &SqlitePool) -> Result<Vec<OrderDetail>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT o.id, o.customer_id, c.name, c.phone, c.address, c.email,
                  o.status, o.total_price, o.payment_method, o.payment_status,
                  o.created_at, o.updated_at
           FROM orders o
           JOIN customers c ON c.id = o.customer_id
           ORDER BY o.id DESC"#,
    )
    .fetch_all(pool)
    .await?;

    let mut details = Vec::with_capacity(rows.len());
    for row in &rows {
        let order_id: i64 = row.try_get("id")?;
        let items = fetch_order_items(pool, order_id).await?;
        details.push(detail_from_row(row, items)?);
    }
    Ok(details)
}

pub async fn active_order_count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM orders WHERE status IN ('NEW', 'IN_PROGRESS')")
        .fetch_one(pool)
        .await?;
    row.try_get("n")
}

pub async fn list_available_products(pool: &SqlitePool) -> Result<Vec<Product>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT id, name, description, price, available, image
           FROM products
           WHERE available = 1
           ORDER BY name ASC"#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|r| {
            Ok(Product {
                id: r.try_get("id")?,
                name: r.try_get("name")?,
                description: r.try_get("description")?,
                price: money_column(r, "price")?,
                available: r.try_get("available")?,
                image: r.try_get("image")?,
            })
        })
        .collect()
}
