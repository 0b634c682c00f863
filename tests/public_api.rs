mod support;

use actix_web::http::{StatusCode, header};
use actix_web::test::TestRequest;
use actix_web::{App, test, web};
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;

use cevicheria_server::api;
use cevicheria_server::notify::ChannelLayer;
use cevicheria_server::orders::{CartItem, CartRequest, place_order};

use support::{RecordingChannel, build_state, init_test_db};

fn cart_with_method(name: &str, payment_method: Option<&str>) -> CartRequest {
    CartRequest {
        customer_id: None,
        name: Some(name.to_string()),
        phone: None,
        address: None,
        email: None,
        payment_method: payment_method.map(str::to_string),
        items: vec![CartItem {
            product_name: "Ceviche clasico".to_string(),
            qty: 1,
            unit_price: Decimal::from_str("8.00").expect("price"),
        }],
    }
}

fn cash_cart(name: &str) -> CartRequest {
    cart_with_method(name, None)
}

#[actix_web::test]
async fn checkout_round_trip_over_http() {
    let pool = init_test_db().await;
    let recorder = RecordingChannel::new();
    let channel: Arc<dyn ChannelLayer> = recorder.clone();
    let state = web::Data::new(build_state(pool.clone(), channel));
    let app = test::init_service(
        App::new().app_data(state.clone()).service(
            web::scope("/api")
                .service(api::public_orders::create_public_order)
                .service(api::public_orders::active_order_count),
        ),
    )
    .await;

    // Client-side totals and status are junk fields and must be dropped.
    let payload = json!({
        "name": "Maria Soto",
        "phone": "+56 9 5555 0001",
        "address": "Av. del Mar 123",
        "email": "maria@example.com",
        "total_price": "999.99",
        "status": "PAID",
        "items": [
            {"product_name": "Ceviche mixto", "qty": 2, "unit_price": "7.50"},
            {"product_name": "Chicha morada", "qty": 1, "unit_price": "3.50"}
        ]
    });

    let req = TestRequest::post()
        .uri("/api/public/orders")
        .set_json(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "NEW");
    assert_eq!(body["payment_method"], "CASH");
    assert_eq!(body["payment_status"], "PENDING");
    assert_eq!(body["total_price"], "18.50");
    assert_eq!(body["name"], "Maria Soto");
    assert_eq!(body["items"].as_array().expect("items").len(), 2);

    assert_eq!(recorder.published().len(), 1);

    let req = TestRequest::get()
        .uri("/api/public/orders/active-count")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["count"], 1);
}

#[actix_web::test]
async fn invalid_cart_returns_field_errors() {
    let pool = init_test_db().await;
    let recorder = RecordingChannel::new();
    let channel: Arc<dyn ChannelLayer> = recorder.clone();
    let state = web::Data::new(build_state(pool.clone(), channel));
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .service(web::scope("/api").service(api::public_orders::create_public_order)),
    )
    .await;

    let req = TestRequest::post()
        .uri("/api/public/orders")
        .set_json(json!({"name": "Maria Soto", "items": []}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid cart");
    let fields = body["fields"].as_array().expect("fields");
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0]["field"], "items");
}

#[actix_web::test]
async fn menu_lists_available_products_by_name() {
    let pool = init_test_db().await;
    let recorder = RecordingChannel::new();
    let channel: Arc<dyn ChannelLayer> = recorder.clone();

    sqlx::query(
        r#"INSERT INTO products (name, description, price, available, image) VALUES
           ('Tiradito', 'Fine cut fish', '9.50', 1, NULL),
           ('Arroz con mariscos', 'Seafood rice', '11.00', 1, '/img/arroz.jpg'),
           ('Chupe de camarones', 'Off season', '12.00', 0, NULL)"#,
    )
    .execute(&pool)
    .await
    .expect("seed products");

    let state = web::Data::new(build_state(pool.clone(), channel));
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .service(web::scope("/api").service(api::products::list_products)),
    )
    .await;

    let req = TestRequest::get().uri("/api/products").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    let products = body.as_array().expect("array");
    assert_eq!(products.len(), 2);
    assert_eq!(products[0]["name"], "Arroz con mariscos");
    assert_eq!(products[0]["price"], "11.00");
    assert_eq!(products[1]["name"], "Tiradito");
    assert_eq!(products[1]["image"], serde_json::Value::Null);
}

#[actix_web::test]
async fn staff_board_lists_newest_first_and_updates_status() {
    let pool = init_test_db().await;
    let recorder = RecordingChannel::new();
    let channel: Arc<dyn ChannelLayer> = recorder.clone();

    let first = place_order(&pool, &channel, &cash_cart("Maria Soto"))
        .await
        .expect("first order");
    let second = place_order(&pool, &channel, &cash_cart("Pedro Rivas"))
        .await
        .expect("second order");

    let state = web::Data::new(build_state(pool.clone(), channel));
    let app = test::init_service(
        App::new().app_data(state.clone()).service(
            web::scope("/api")
                .service(api::staff_orders::list_orders)
                .service(api::staff_orders::update_order_status),
        ),
    )
    .await;

    let req = TestRequest::get().uri("/api/orders").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    let orders = body.as_array().expect("array");
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["id"].as_i64(), Some(second.id));
    assert_eq!(orders[1]["id"].as_i64(), Some(first.id));

    let req = TestRequest::patch()
        .uri(&format!("/api/orders/{}/status", first.id))
        .set_json(json!({"status": "IN_PROGRESS"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "IN_PROGRESS");

    let req = TestRequest::patch()
        .uri(&format!("/api/orders/{}/status", first.id))
        .set_json(json!({"status": "PAID"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = TestRequest::patch()
        .uri("/api/orders/9999/status")
        .set_json(json!({"status": "READY"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn webpay_init_guards_unknown_resolved_and_counter_orders() {
    let pool = init_test_db().await;
    let recorder = RecordingChannel::new();
    let channel: Arc<dyn ChannelLayer> = recorder.clone();

    let paid = place_order(
        &pool,
        &channel,
        &cart_with_method("Ana Torres", Some("WEBPAY")),
    )
    .await
    .expect("order");
    sqlx::query("UPDATE orders SET payment_status = 'SUCCESS', status = 'PAID' WHERE id = ?")
        .bind(paid.id)
        .execute(&pool)
        .await
        .expect("mark paid");

    // Cash orders already reached the kitchen; the gateway flow would
    // announce them twice.
    let counter = place_order(&pool, &channel, &cash_cart("Elsa Pino"))
        .await
        .expect("cash order");

    let state = web::Data::new(build_state(pool.clone(), channel));
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .service(web::scope("/api").service(api::webpay::webpay_init)),
    )
    .await;

    let req = TestRequest::get().uri("/api/webpay/init/9999").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = TestRequest::get()
        .uri(&format!("/api/webpay/init/{}", paid.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = TestRequest::get()
        .uri(&format!("/api/webpay/init/{}", counter.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn webpay_init_without_gateway_reports_bad_gateway() {
    let pool = init_test_db().await;
    let recorder = RecordingChannel::new();
    let channel: Arc<dyn ChannelLayer> = recorder.clone();

    let pending = place_order(
        &pool,
        &channel,
        &cart_with_method("Jorge Nuñez", Some("WEBPAY")),
    )
    .await
    .expect("order");

    // Test config points at a closed port, so the create call fails fast.
    let state = web::Data::new(build_state(pool.clone(), channel));
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .service(web::scope("/api").service(api::webpay::webpay_init)),
    )
    .await;

    let req = TestRequest::get()
        .uri(&format!("/api/webpay/init/{}", pending.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let order = cevicheria_server::db::fetch_order(&pool, pending.id)
        .await
        .expect("fetch")
        .expect("order");
    assert!(order.token_ws.is_none(), "failed init must not store a token");
}

#[actix_web::test]
async fn commit_without_params_is_bad_request() {
    let pool = init_test_db().await;
    let recorder = RecordingChannel::new();
    let channel: Arc<dyn ChannelLayer> = recorder.clone();
    let state = web::Data::new(build_state(pool.clone(), channel));
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .service(api::webpay::webpay_commit),
    )
    .await;

    let req = TestRequest::get().uri("/webpay/commit").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn abort_redirect_lands_on_the_failed_page() {
    let pool = init_test_db().await;
    let recorder = RecordingChannel::new();
    let channel: Arc<dyn ChannelLayer> = recorder.clone();

    let detail = place_order(&pool, &channel, &cash_cart("Rosa Leon"))
        .await
        .expect("order");
    sqlx::query("UPDATE orders SET token_ws = 'tok-abort', payment_method = 'WEBPAY' WHERE id = ?")
        .bind(detail.id)
        .execute(&pool)
        .await
        .expect("set token");

    let state = web::Data::new(build_state(pool.clone(), channel));
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .service(api::webpay::webpay_commit),
    )
    .await;

    let req = TestRequest::get()
        .uri("/webpay/commit?TBK_TOKEN=tok-abort&TBK_ORDEN_COMPRA=O-9-ffff0000")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let location = resp
        .headers()
        .get(header::LOCATION)
        .expect("location")
        .to_str()
        .expect("ascii");
    assert_eq!(location, "http://localhost:8080/pago-fallido");

    let req = TestRequest::get()
        .uri("/webpay/commit?TBK_TOKEN=tok-unknown")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn paid_orders_redirect_to_the_final_page() {
    let pool = init_test_db().await;
    let recorder = RecordingChannel::new();
    let channel: Arc<dyn ChannelLayer> = recorder.clone();

    let detail = place_order(&pool, &channel, &cash_cart("Hugo Diaz"))
        .await
        .expect("order");
    sqlx::query(
        r#"UPDATE orders
           SET token_ws = 'tok-paid', payment_method = 'WEBPAY',
               status = 'PAID', payment_status = 'SUCCESS'
           WHERE id = ?"#,
    )
    .bind(detail.id)
    .execute(&pool)
    .await
    .expect("mark paid");

    let state = web::Data::new(build_state(pool.clone(), channel));
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .service(api::webpay::webpay_commit),
    )
    .await;

    // A late abort callback cannot undo a settled payment.
    let req = TestRequest::get()
        .uri("/webpay/commit?TBK_TOKEN=tok-paid")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let location = resp
        .headers()
        .get(header::LOCATION)
        .expect("location")
        .to_str()
        .expect("ascii");
    assert_eq!(
        location,
        format!("http://localhost:8080/pago-finalizado?order={}", detail.id)
    );
}
