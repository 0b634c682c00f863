// src/notify.rs

use std::sync::Arc;

use chrono::Local;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::models::{OrderStatus, PaymentMethod};
use crate::{db, eta};

/// Topic the kitchen displays subscribe to.
pub const ORDERS_TOPIC: &str = "orders";

/// Transport the dispatcher publishes through. The in-process
/// implementation forwards to the WebSocket hub; tests plug in a
/// recorder; a distributed backend would sit behind the same trait.
pub trait ChannelLayer: Send + Sync {
    fn publish(&self, topic: &str, payload: String);
}

/// What just happened to an order.
#[derive(Debug, Clone, Copy)]
pub enum OrderChange {
    Created,
    StatusChanged { from: OrderStatus, to: OrderStatus },
}

/// Single decision point for kitchen notifications: cash orders announce
/// on creation, gateway orders announce when the gateway confirms, and
/// nothing else ever announces.
pub fn should_notify(method: PaymentMethod, change: &OrderChange) -> bool {
    match change {
        OrderChange::Created => !method.requires_confirmation(),
        OrderChange::StatusChanged { from, to } => {
            method.requires_confirmation()
                && *to == OrderStatus::Paid
                && *from != OrderStatus::Paid
        }
    }
}

#[derive(Debug, Serialize)]
pub struct KitchenEvent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub order: KitchenOrder,
}

#[derive(Debug, Serialize)]
pub struct KitchenOrder {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub email: String,
    pub payment_method: PaymentMethod,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub created_at: String,
    pub eta_minutes: i64,
    pub items: Vec<KitchenItem>,
}

#[derive(Debug, Serialize)]
pub struct KitchenItem {
    pub product_name: String,
    pub qty: i64,
    pub subtotal: Decimal,
}

/// Publish the kitchen payload for an order. Re-reads the row so the
/// payload reflects committed state; a vanished order drops the event.
pub async fn dispatch_order(pool: &SqlitePool, channel: &Arc<dyn ChannelLayer>, order_id: i64) {
    let detail = match db::fetch_order_detail(pool, order_id).await {
        Ok(Some(d)) => d,
        Ok(None) => {
            log::warn!("order {order_id} vanished before dispatch, dropping notification");
            return;
        }
        Err(e) => {
            log::error!("dispatch read error for order {order_id}: {e}");
            return;
        }
    };

    let active = match db::active_order_count(pool).await {
        Ok(n) => n,
        Err(e) => {
            log::error!("active order count error for order {order_id}: {e}");
            return;
        }
    };

    let eta_minutes = eta::estimate_minutes(Local::now().time(), active);

    let event = KitchenEvent {
        kind: "new_order",
        order: KitchenOrder {
            id: detail.id,
            name: detail.name,
            phone: detail.phone,
            address: detail.address,
            email: detail.email,
            payment_method: detail.payment_method,
            total_price: detail.total_price,
            status: detail.status,
            created_at: detail.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            eta_minutes,
            items: detail
                .items
                .into_iter()
                .map(|i| KitchenItem {
                    product_name: i.product_name,
                    qty: i.qty,
                    subtotal: i.subtotal,
                })
                .collect(),
        },
    };

    match serde_json::to_string(&event) {
        Ok(payload) => {
            log::info!("kitchen notified: order {order_id} eta {eta_minutes}min");
            channel.publish(ORDERS_TOPIC, payload);
        }
        Err(e) => log::error!("kitchen payload serialize error for order {order_id}: {e}"),
    }
}
