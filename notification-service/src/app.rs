use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Router};
use common_observability::ConsumerMetrics;

async fn health() -> &'static str { "ok" }

async fn render_metrics(State(metrics): State<ConsumerMetrics>) -> (StatusCode, String) {
    match common_observability::render(&[&metrics.registry]) {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("metrics encode error: {e}")),
    }
}

pub fn ops_router(metrics: ConsumerMetrics) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(render_metrics))
        .with_state(metrics)
}
