use std::sync::Arc;

use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderName, HeaderValue, Method, Request, StatusCode};
use axum::{middleware, routing::get, Router};
use common_http_errors::{error_registry, http_error_metrics_layer};
use common_store::{InfoRepository, MovieRepository, ProductRepository};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::catalog_handlers::{
    create_info, create_movie, create_product, delete_info, delete_movie, delete_product, get_info, get_movie, get_product,
    list_infos, list_movies, list_products, update_info, update_movie, update_product,
};

pub const SERVICE_NAME: &str = "product-service";

#[derive(Clone)]
pub struct AppState {
    pub products: Arc<dyn ProductRepository>,
    pub movies: Arc<dyn MovieRepository>,
    pub infos: Arc<dyn InfoRepository>,
}

async fn health() -> &'static str { "ok" }

async fn metrics() -> (StatusCode, String) {
    match common_observability::render(&[error_registry()]) {
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
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE, HeaderName::from_static("x-request-id")]);

    let trace = TraceLayer::new_for_http().make_span_with(|req: &Request<axum::body::Body>| {
        tracing::info_span!("http", method = %req.method(), path = %req.uri().path(), request_id = tracing::field::Empty)
    });

    Router::new()
        .route("/healthz", get(health))
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id", get(get_product).put(update_product).delete(delete_product))
        .route("/movies", get(list_movies).post(create_movie))
        .route("/movies/:id", get(get_movie).put(update_movie).delete(delete_movie))
        .route("/infos", get(list_infos).post(create_info))
        .route("/infos/:id", get(get_info).put(update_info).delete(delete_info))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(cors)
        .layer(middleware::from_fn(http_error_metrics_layer(SERVICE_NAME)))
        .layer(trace)
}
