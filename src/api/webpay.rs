// src/api/webpay.rs

use actix_web::{get, http::header, web, HttpResponse, Responder};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::webpay_client::{self, CommitTransactionResponse, WebpayError};
use crate::models::{OrderStatus, PaymentMethod, PaymentStatus};
use crate::notify::{self, ChannelLayer, OrderChange};
use crate::{db, AppState};

/// Correlation id sent to Webpay; the wire format caps it at 26 chars.
fn new_buy_order(order_id: i64) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("O-{}-{}", order_id, &suffix[..8])
}

fn new_session_id() -> String {
    format!("S-{}", Uuid::new_v4())
}

/// Phase one of the card flow: register the transaction with Webpay and
/// hand the storefront the redirect target. The order itself only gains
/// correlation fields; status moves when the gateway answers.
#[utoipa::path(
    get,
    path = "/api/webpay/init/{order_id}",
    params(("order_id" = i64, Path, description = "Order to pay")),
    responses(
        (status = 200, description = "Redirect url and token for the gateway"),
        (status = 404, description = "Unknown order"),
        (status = 409, description = "Payment already resolved"),
        (status = 502, description = "Webpay rejected the create call")
    ),
    tag = "payments"
)]
#[get("/webpay/init/{order_id}")]
pub async fn webpay_init(state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    let order_id = path.into_inner();

    let order = match db::fetch_order(&state.pool, order_id).await {
        Ok(Some(o)) => o,
        Ok(None) => return HttpResponse::NotFound().json(json!({"error": "order not found"})),
        Err(e) => {
            log::error!("webpay init load order {order_id} error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if order.payment_status != PaymentStatus::Pending {
        return HttpResponse::Conflict()
            .json(json!({"error": "payment already resolved for this order"}));
    }

    // Counter orders were announced to the kitchen at creation; letting
    // them enter the gateway flow would announce them a second time.
    if !order.payment_method.requires_confirmation() {
        return HttpResponse::Conflict()
            .json(json!({"error": "order is payable at the counter"}));
    }

    let buy_order = new_buy_order(order_id);
    let session_id = new_session_id();

    log::info!(
        "webpay init order {order_id} buy_order={buy_order} amount={}",
        order.total_price
    );

    let created = match webpay_client::create_transaction(
        &state.webpay,
        &webpay_client::CreateTransactionRequest {
            buy_order: buy_order.clone(),
            session_id: session_id.clone(),
            amount: order.total_price,
            return_url: state.webpay_return_url.clone(),
        },
    )
    .await
    {
        Ok(r) => r,
        Err(e) => {
            log::error!("webpay create transaction error for order {order_id}: {e}");
            return HttpResponse::BadGateway().json(json!({
                "error": "webpay transaction create failed",
                "details": e.to_string()
            }));
        }
    };

    // Latest init wins: a re-entry before commit overwrites the
    // correlation fields, and the stale token can no longer resolve.
    if let Err(e) = sqlx::query(
        r#"UPDATE orders
           SET token_ws = ?, buy_order = ?, session_id = ?, payment_method = ?, updated_at = ?
           WHERE id = ?"#,
    )
    .bind(&created.token)
    .bind(&buy_order)
    .bind(&session_id)
    .bind(PaymentMethod::Webpay)
    .bind(Utc::now())
    .bind(order_id)
    .execute(&state.pool)
    .await
    {
        log::error!("webpay init persist error for order {order_id}: {e}");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok().json(json!({"url": created.url, "token": created.token}))
}

#[derive(Debug, Deserialize)]
pub struct CommitQuery {
    pub token_ws: Option<String>,

    // Webpay switches to TBK_* parameters when the user backs out.
    #[serde(rename = "TBK_TOKEN")]
    pub tbk_token: Option<String>,

    #[serde(rename = "TBK_ORDEN_COMPRA")]
    pub tbk_orden_compra: Option<String>,
}

/// Outcome of resolving a commit callback against the stored order.
#[derive(Debug, PartialEq, Eq)]
pub enum CommitResolution {
    Approved { order_id: i64 },
    Rejected { order_id: i64 },
    AlreadyPaid { order_id: i64 },
    AlreadyFailed { order_id: i64 },
    UnknownToken,
}

/// Apply a commit outcome to the order that owns `token`. The status flip
/// is a compare-and-set against the non-terminal states, so a duplicate
/// callback can neither double-apply nor double-notify.
pub async fn finalize_commit(
    pool: &SqlitePool,
    channel: &Arc<dyn ChannelLayer>,
    token: &str,
    outcome: Result<CommitTransactionResponse, WebpayError>,
) -> Result<CommitResolution, sqlx::Error> {
    let Some(order) = db::fetch_order_by_token(pool, token).await? else {
        return Ok(CommitResolution::UnknownToken);
    };

    let approved = match &outcome {
        Ok(resp) => {
            let ok = webpay_client::is_authorized(resp);
            if !ok {
                log::warn!(
                    "webpay commit rejected for order {} token {token}: status={:?} response_code={:?} vci={:?}",
                    order.id,
                    resp.status,
                    resp.response_code,
                    resp.vci
                );
            }
            ok
        }
        Err(e) => {
            log::error!("webpay commit call failed for order {} token {token}: {e}", order.id);
            false
        }
    };

    let (status, payment_status) = if approved {
        (OrderStatus::Paid, PaymentStatus::Success)
    } else {
        (OrderStatus::Failed, PaymentStatus::Failed)
    };

    let updated = sqlx::query(
        r#"UPDATE orders
           SET status = ?, payment_status = ?, updated_at = ?
           WHERE id = ? AND status NOT IN ('PAID', 'FAILED')"#,
    )
    .bind(status)
    .bind(payment_status)
    .bind(Utc::now())
    .bind(order.id)
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        // Late or duplicate callback; the first resolution stands.
        let current = db::fetch_order(pool, order.id).await?.map(|o| o.status);
        return Ok(match current {
            Some(OrderStatus::Paid) => CommitResolution::AlreadyPaid { order_id: order.id },
            _ => CommitResolution::AlreadyFailed { order_id: order.id },
        });
    }

    if approved {
        let change = OrderChange::StatusChanged {
            from: order.status,
            to: OrderStatus::Paid,
        };
        if notify::should_notify(order.payment_method, &change) {
            notify::dispatch_order(pool, channel, order.id).await;
        }
        Ok(CommitResolution::Approved { order_id: order.id })
    } else {
        Ok(CommitResolution::Rejected { order_id: order.id })
    }
}

/// The user backed out at the gateway. Resolve the attempt as FAILED
/// without calling Webpay; aborted payments never notify the kitchen.
pub async fn abort_payment(
    pool: &SqlitePool,
    token: &str,
    buy_order: Option<&str>,
) -> Result<CommitResolution, sqlx::Error> {
    let order = match db::fetch_order_by_token(pool, token).await? {
        Some(o) => Some(o),
        None => match buy_order {
            Some(b) => db::fetch_order_by_buy_order(pool, b).await?,
            None => None,
        },
    };

    let Some(order) = order else {
        return Ok(CommitResolution::UnknownToken);
    };

    let updated = sqlx::query(
        r#"UPDATE orders
           SET status = 'FAILED', payment_status = 'FAILED', updated_at = ?
           WHERE id = ? AND status NOT IN ('PAID', 'FAILED')"#,
    )
    .bind(Utc::now())
    .bind(order.id)
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        let current = db::fetch_order(pool, order.id).await?.map(|o| o.status);
        return Ok(match current {
            Some(OrderStatus::Paid) => CommitResolution::AlreadyPaid { order_id: order.id },
            _ => CommitResolution::AlreadyFailed { order_id: order.id },
        });
    }

    log::warn!("webpay payment aborted by user for order {}", order.id);
    Ok(CommitResolution::Rejected { order_id: order.id })
}

/// Browser return target for both the normal and the abort flow. No JSON
/// on purpose: the customer lands on the final or failed page.
#[get("/webpay/commit")]
pub async fn webpay_commit(
    state: web::Data<AppState>,
    query: web::Query<CommitQuery>,
) -> impl Responder {
    let query = query.into_inner();

    if let Some(token) = query.token_ws.as_deref() {
        let outcome = webpay_client::commit_transaction(&state.webpay, token).await;
        let resolution = match finalize_commit(&state.pool, &state.channel, token, outcome).await {
            Ok(r) => r,
            Err(e) => {
                log::error!("webpay commit persist error: {e}");
                return HttpResponse::InternalServerError().finish();
            }
        };
        return redirect_for(&state, resolution);
    }

    if let Some(aborted) = query.tbk_token.as_deref() {
        let resolution =
            match abort_payment(&state.pool, aborted, query.tbk_orden_compra.as_deref()).await {
                Ok(r) => r,
                Err(e) => {
                    log::error!("webpay abort persist error: {e}");
                    return HttpResponse::InternalServerError().finish();
                }
            };
        return redirect_for(&state, resolution);
    }

    HttpResponse::BadRequest().json(json!({"error": "missing token_ws"}))
}

fn redirect_for(state: &AppState, resolution: CommitResolution) -> HttpResponse {
    let target = match resolution {
        CommitResolution::Approved { order_id } | CommitResolution::AlreadyPaid { order_id } => {
            format!("{}?order={}", state.webpay_final_url, order_id)
        }
        CommitResolution::Rejected { .. } | CommitResolution::AlreadyFailed { .. } => {
            state.webpay_failed_url.clone()
        }
        CommitResolution::UnknownToken => {
            return HttpResponse::NotFound().json(json!({"error": "unknown payment token"}));
        }
    };

    HttpResponse::Found()
        .insert_header((header::LOCATION, target))
        .finish()
}
