use axum::http::StatusCode;
use axum::response::IntoResponse;
use common_http_errors::ApiError;
use http_body_util::BodyExt;

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn bad_request_variant() {
    let err = ApiError::BadRequest { code: "validation_failed", request_id: None, message: Some("email is required".into()) };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "validation_failed");
    let body = body_json(resp).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "email is required");
}

#[test]
fn not_found_variant() {
    let err = ApiError::not_found("order_not_found", "order not found");
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "order_not_found");
}

#[tokio::test]
async fn partial_commit_variant_carries_step_and_order() {
    let err = ApiError::PartialCommit {
        step: "seat_reservation",
        request_id: Some("req-1".into()),
        message: "order persisted but seats were not reserved".into(),
        detail: Some("store unavailable".into()),
        committed: Some(serde_json::json!({"id": "o-1"})),
    };
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "partial_commit");
    let body = body_json(resp).await;
    assert_eq!(body["step"], "seat_reservation");
    assert_eq!(body["detail"], "store unavailable");
    assert_eq!(body["committed"]["id"], "o-1");
    assert_eq!(body["request_id"], "req-1");
}

#[test]
fn internal_variant() {
    let err = ApiError::internal("boom", None).with_request_id("abc");
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.headers().get("X-Error-Code").unwrap(), "internal_error");
}
