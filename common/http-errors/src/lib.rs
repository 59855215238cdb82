use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use axum::{extract::Request, http::{HeaderValue, StatusCode}, middleware::Next, response::{IntoResponse, Response}, Json};
use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use serde::Serialize;

mod request_id;
pub use request_id::{RequestId, REQUEST_ID_HEADER};

pub const ERROR_CODE_HEADER: &str = "X-Error-Code";

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub status: &'static str,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")] pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")] pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")] pub step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")] pub committed: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")] pub request_id: Option<String>,
}

impl ErrorBody {
    fn new(code: &str, request_id: Option<String>, message: Option<String>) -> Self {
        Self { status: "error", code: code.into(), message, detail: None, step: None, committed: None, request_id }
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: &'static str, request_id: Option<String>, message: Option<String> },
    NotFound { code: &'static str, request_id: Option<String>, message: Option<String> },
    /// The primary write committed but a follow-up step did not.
    PartialCommit {
        step: &'static str,
        request_id: Option<String>,
        message: String,
        detail: Option<String>,
        committed: Option<serde_json::Value>,
    },
    Internal { request_id: Option<String>, message: Option<String> },
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(e: E, request_id: Option<String>) -> Self { Self::Internal { request_id, message: Some(e.to_string()) } }
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self { Self::BadRequest { code, request_id: None, message: Some(message.into()) } }
    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self { Self::NotFound { code, request_id: None, message: Some(message.into()) } }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        let id = Some(id.into());
        match &mut self {
            ApiError::BadRequest { request_id, .. }
            | ApiError::NotFound { request_id, .. }
            | ApiError::PartialCommit { request_id, .. }
            | ApiError::Internal { request_id, .. } => *request_id = id,
        }
        self
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { code, .. } | ApiError::NotFound { code, .. } => *code,
            ApiError::PartialCommit { .. } => "partial_commit",
            ApiError::Internal { .. } => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_code = self.code();
        let (status, body) = match self {
            ApiError::BadRequest { code, request_id, message } => (StatusCode::BAD_REQUEST, ErrorBody::new(code, request_id, message)),
            ApiError::NotFound { code, request_id, message } => (StatusCode::NOT_FOUND, ErrorBody::new(code, request_id, message)),
            ApiError::PartialCommit { step, request_id, message, detail, committed } => {
                let mut body = ErrorBody::new(error_code, request_id, Some(message));
                body.detail = detail;
                body.step = Some(step.to_string());
                body.committed = committed;
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
            ApiError::Internal { request_id, message } => (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::new(error_code, request_id, message)),
        };
        let mut resp = (status, Json(body)).into_response();
        if let Ok(val) = HeaderValue::from_str(error_code) {
            resp.headers_mut().insert(ERROR_CODE_HEADER, val);
        }
        resp
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

// --- Error metrics shared by every service router ---

const MAX_ERROR_CODES: usize = 40;
const OVERFLOW_LABEL: &str = "other";

static ERROR_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);
static HTTP_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let v = IntCounterVec::new(
        Opts::new("http_errors_total", "Count of HTTP error responses emitted (status >= 400)"),
        &["service", "code", "status"],
    ).expect("static metric definition");
    ERROR_REGISTRY.register(Box::new(v.clone())).ok();
    v
});
static DISTINCT_CODES_GAUGE: Lazy<IntGauge> = Lazy::new(|| {
    let g = IntGauge::new("http_error_codes_distinct", "Distinct error codes observed (capped)").expect("static metric definition");
    ERROR_REGISTRY.register(Box::new(g.clone())).ok();
    g
});
static CODE_OVERFLOW_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let c = IntCounter::new("http_error_code_overflow_total", "Error responses whose code was folded into the overflow label").expect("static metric definition");
    ERROR_REGISTRY.register(Box::new(c.clone())).ok();
    c
});
static SEEN_CODES: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Registry holding the HTTP error counters; services append it to their `/metrics` output.
pub fn error_registry() -> &'static Registry { &ERROR_REGISTRY }

fn code_label(code: &str) -> String {
    let mut seen = SEEN_CODES.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if seen.contains(code) {
        return code.to_string();
    }
    if seen.len() >= MAX_ERROR_CODES {
        CODE_OVERFLOW_TOTAL.inc();
        return OVERFLOW_LABEL.to_string();
    }
    seen.insert(code.to_string());
    DISTINCT_CODES_GAUGE.set(seen.len() as i64);
    code.to_string()
}

pub fn record_error(service: &str, code: &str, status: StatusCode) {
    let label = code_label(code);
    HTTP_ERRORS_TOTAL.with_label_values(&[service, label.as_str(), status.as_str()]).inc();
}

type MiddlewareFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// `axum::middleware::from_fn` compatible layer counting error responses by `X-Error-Code`.
pub fn http_error_metrics_layer(service: &'static str) -> impl Fn(Request, Next) -> MiddlewareFuture + Clone + Send + Sync + 'static {
    move |req: Request, next: Next| {
        Box::pin(async move {
            let resp = next.run(req).await;
            let status = resp.status();
            if status.as_u16() >= 400 {
                let code = resp.headers().get(ERROR_CODE_HEADER).and_then(|v| v.to_str().ok()).unwrap_or("unknown");
                record_error(service, code, status);
                if status.is_server_error() {
                    tracing::warn!(service, code, status = status.as_u16(), "server error response");
                }
            }
            resp
        }) as MiddlewareFuture
    }
}

#[doc(hidden)]
pub mod test_helpers {
    use super::*;

    pub fn simulate_error_code(code: &str) { record_error("test", code, StatusCode::BAD_REQUEST); }
    pub fn distinct_gauge() -> i64 { DISTINCT_CODES_GAUGE.get() }
    pub fn overflow_count() -> u64 { CODE_OVERFLOW_TOTAL.get() }
}
