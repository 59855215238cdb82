mod support;

use std::sync::atomic::Ordering;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use order_service::{build_router, AppState};
use serde_json::{json, Value};
use support::harness;
use tower::ServiceExt;

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let code = resp.headers().get("X-Error-Code").and_then(|v| v.to_str().ok()).map(str::to_string);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
    (status, code, body)
}

fn post_order(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/orders")
        .header("content-type", "application/json")
        .header("x-request-id", "req-http")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn scenario_body() -> Value {
    json!({
        "email": "a@x.com",
        "productsIds": ["P1", "P2"],
        "movieId": "M1",
        "movieChairs": [{"id": "A1"}],
        "payment": "PIX"
    })
}

#[tokio::test]
async fn create_get_delete_round_trip() {
    let h = harness();
    let app = build_router(AppState { saga: h.saga.clone() });

    let (status, _, created) = send(&app, post_order(scenario_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["billing"]["totalPrice"], "23.00");
    assert_eq!(created["billing"]["payment"], "PIX");
    assert_eq!(created["products"][0]["code"], "P1");
    assert_eq!(created["movie"]["movieChairs"][0]["id"], "A1");
    let id = created["id"].as_str().unwrap().to_string();

    let (_, event) = h.topic.published()[0].decode().unwrap();
    assert_eq!(event.request_id, "req-http");

    let uri = format!("/orders?email=a@x.com&orderId={id}");
    let (status, _, fetched) = send(&app, Request::get(&uri).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, _, listed) = send(&app, Request::get("/orders?email=a@x.com").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _, all) = send(&app, Request::get("/orders").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 1);

    let (status, _, deleted) = send(&app, Request::delete(&uri).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["id"], id.as_str());
    assert!(!h.chair_reserved("A1").await);

    let (status, code, body) = send(&app, Request::get(&uri).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(code.as_deref(), Some("order_not_found"));
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn missing_product_maps_to_404() {
    let h = harness();
    let app = build_router(AppState { saga: h.saga.clone() });
    let mut body = scenario_body();
    body["productsIds"] = json!(["P1", "P404"]);
    let (status, code, body) = send(&app, post_order(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(code.as_deref(), Some("product_not_found"));
    assert_eq!(body["request_id"], "req-http");
    assert_eq!(h.orders.count().await, 0);
}

#[tokio::test]
async fn malformed_body_is_a_validation_failure() {
    let h = harness();
    let app = build_router(AppState { saga: h.saga.clone() });
    let (status, code, _) = send(&app, post_order(json!({"email": "a@x.com", "payment": "GOLD"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(code.as_deref(), Some("validation_failed"));

    let mut dup = scenario_body();
    dup["productsIds"] = json!(["P1", "P1"]);
    let (status, _, body) = send(&app, post_order(dup)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("repeated"));
}

#[tokio::test]
async fn order_id_without_email_is_rejected() {
    let h = harness();
    let app = build_router(AppState { saga: h.saga.clone() });
    let (status, _, _) = send(&app, Request::get("/orders?orderId=abc").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _, _) = send(&app, Request::delete("/orders?email=a@x.com").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn partial_commit_surfaces_step_and_order() {
    let h = harness();
    h.flaky.fail_updates.store(true, Ordering::SeqCst);
    let app = build_router(AppState { saga: h.saga.clone() });
    let (status, code, body) = send(&app, post_order(scenario_body())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(code.as_deref(), Some("partial_commit"));
    assert_eq!(body["step"], "seat_reservation");
    assert_eq!(body["committed"]["billing"]["totalPrice"], "23.00");
    assert!(body["detail"].as_str().unwrap().contains("conditional write rejected"));
}

#[tokio::test]
async fn health_and_metrics() {
    let h = harness();
    let app = build_router(AppState { saga: h.saga.clone() });
    let resp = app.clone().oneshot(Request::get("/healthz").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    send(&app, post_order(scenario_body())).await;
    let resp = app.clone().oneshot(Request::get("/metrics").body(Body::empty()).unwrap()).await.unwrap();
    let text = String::from_utf8(resp.into_body().collect().await.unwrap().to_bytes().to_vec()).unwrap();
    assert!(text.contains("orders_created_total 1"));
}
