use axum::extract::State;
use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderName, HeaderValue, Method, Request, StatusCode};
use axum::{middleware, routing::get, Router};
use common_http_errors::{error_registry, http_error_metrics_layer};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::order_handlers::{create_order, delete_order, get_orders};
use crate::saga::OrderSaga;

pub const SERVICE_NAME: &str = "order-service";

pub async fn health() -> &'static str { "ok" }

#[derive(Clone)]
pub struct AppState {
    pub saga: OrderSaga,
}

async fn metrics(State(state): State<AppState>) -> (StatusCode, String) {
    match common_observability::render(&[&state.saga.metrics().registry, error_registry()]) {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("metrics encode error: {e}")),
    }
}

pub fn build_router(state: AppState) -> Router {
    let allowed_origins = [
        "http://localhost:3000",
        "http://localhost:5173",
    ];
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            allowed_origins.iter().filter_map(|o| o.parse::<HeaderValue>().ok()).collect::<Vec<_>>(),
        ))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE, HeaderName::from_static("x-request-id")]);

    let trace = TraceLayer::new_for_http().make_span_with(|req: &Request<axum::body::Body>| {
        tracing::info_span!("http", method = %req.method(), path = %req.uri().path(), request_id = tracing::field::Empty)
    });

    Router::new()
        .route("/healthz", get(health))
        .route("/orders", get(get_orders).post(create_order).delete(delete_order))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(cors)
        .layer(middleware::from_fn(http_error_metrics_layer(SERVICE_NAME)))
        .layer(trace)
}
