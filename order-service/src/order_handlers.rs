use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common_http_errors::{ApiError, ApiResult};
use serde::Deserialize;
use tracing::error;

use crate::app::AppState;
use crate::models::{to_response, OrderRequest, OrderResponse};
use common_http_errors::RequestId;
use crate::saga::SagaError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    pub email: Option<String>,
    pub order_id: Option<String>,
}

impl OrderQuery {
    fn email(&self) -> Option<&str> { self.email.as_deref().map(str::trim).filter(|s| !s.is_empty()) }
    fn order_id(&self) -> Option<&str> { self.order_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) }
}

pub(crate) fn saga_error_to_api(err: SagaError, request_id: &str) -> ApiError {
    let api = match err {
        SagaError::Validation(msg) => ApiError::bad_request("validation_failed", msg),
        e @ SagaError::ProductNotFound(_) => ApiError::not_found("product_not_found", e.to_string()),
        e @ SagaError::MovieNotFound(_) => ApiError::not_found("movie_not_found", e.to_string()),
        e @ SagaError::OrderNotFound { .. } => ApiError::not_found("order_not_found", e.to_string()),
        SagaError::PartialCommit { step, order, source } => ApiError::PartialCommit {
            step: step.as_str(),
            request_id: None,
            message: format!("order {} was saved but {} did not complete", order.order_id, step.as_str()),
            detail: Some(source.to_string()),
            committed: serde_json::to_value(to_response(&order)).ok(),
        },
        SagaError::Store(e) => {
            error!(error = %e, request_id, "order store failure");
            ApiError::internal(e, None)
        }
    };
    api.with_request_id(request_id)
}

pub async fn create_order(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<OrderResponse>)> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request("validation_failed", e.body_text()).with_request_id(&request_id))?;
    let order = state.saga.create_order(request, &request_id).await.map_err(|e| saga_error_to_api(e, &request_id))?;
    Ok((StatusCode::CREATED, Json(to_response(&order))))
}

/// `email`+`orderId` → one order, `email` → that customer's orders, neither → every order.
pub async fn get_orders(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Query(query): Query<OrderQuery>,
) -> ApiResult<Response> {
    let saga = &state.saga;
    let response = match (query.email(), query.order_id()) {
        (Some(email), Some(order_id)) => {
            let order = saga.get_order(email, order_id).await.map_err(|e| saga_error_to_api(e, &request_id))?;
            Json(to_response(&order)).into_response()
        }
        (Some(email), None) => {
            let orders = saga.orders_by_email(email).await.map_err(|e| saga_error_to_api(e, &request_id))?;
            Json(orders.iter().map(to_response).collect::<Vec<_>>()).into_response()
        }
        (None, None) => {
            let orders = saga.all_orders().await.map_err(|e| saga_error_to_api(e, &request_id))?;
            Json(orders.iter().map(to_response).collect::<Vec<_>>()).into_response()
        }
        (None, Some(_)) => {
            return Err(ApiError::bad_request("validation_failed", "orderId requires email").with_request_id(&request_id));
        }
    };
    Ok(response)
}

pub async fn delete_order(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Query(query): Query<OrderQuery>,
) -> ApiResult<Json<OrderResponse>> {
    let (Some(email), Some(order_id)) = (query.email(), query.order_id()) else {
        return Err(ApiError::bad_request("validation_failed", "email and orderId are required").with_request_id(&request_id));
    };
    let order = state.saga.delete_order(email, order_id, &request_id).await.map_err(|e| saga_error_to_api(e, &request_id))?;
    Ok(Json(to_response(&order)))
}
