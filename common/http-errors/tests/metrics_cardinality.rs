use axum::{http::StatusCode, middleware, routing::get, Router};
use common_http_errors::{error_registry, http_error_metrics_layer, ApiError};
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;

static DYNAMIC_COUNTER: AtomicUsize = AtomicUsize::new(0);

// Emits a different error code each time until the guard threshold is exceeded.
async fn dyn_error() -> Result<&'static str, ApiError> {
    let n = DYNAMIC_COUNTER.fetch_add(1, Ordering::Relaxed);
    let code = format!("dyn_code_{}", n);
    Err(ApiError::BadRequest { code: Box::leak(code.into_boxed_str()), request_id: None, message: None })
}

#[tokio::test]
async fn error_code_cardinality_guard_caps_labels() {
    let app = Router::new()
        .route("/err", get(dyn_error))
        .layer(middleware::from_fn(http_error_metrics_layer("test-svc")));

    for _ in 0..50 {
        let resp = app.clone().oneshot(axum::http::Request::builder().uri("/err").body(axum::body::Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
    let families = error_registry().gather();
    let errors = families.iter().find(|f| f.get_name() == "http_errors_total").expect("http_errors_total registered");
    assert!(errors.get_metric().len() <= 41, "labels should be capped, got {}", errors.get_metric().len());
}
