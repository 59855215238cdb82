use std::collections::HashSet;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use common_http_errors::{ApiError, ApiResult, RequestId};
use common_money::Money;
use common_store::{Chair, CinemaInfo, MovieSession, Product, StoreError};
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::app::AppState;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub code: String,
    #[serde(rename = "productName")]
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(rename = "productUrl", default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovieSessionInput {
    #[serde(rename = "movieTitle")]
    pub title: String,
    #[serde(rename = "movieSession")]
    pub session: String,
    #[serde(rename = "moviePrice")]
    pub price: Money,
    #[serde(rename = "movieCategory", default)]
    pub category: Option<String>,
    #[serde(rename = "moviePoster", default)]
    pub poster: Option<String>,
    #[serde(rename = "movieLanguage", default)]
    pub language: Option<String>,
    #[serde(rename = "movieChairs", default)]
    pub chairs: Vec<Chair>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CinemaInfoInput {
    pub cinema_name: String,
    pub address: String,
    pub phone: String,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request("validation_failed", format!("{field} is required")));
    }
    Ok(())
}

fn non_negative(field: &str, price: &Money) -> Result<(), ApiError> {
    if price.is_negative() {
        return Err(ApiError::bad_request("validation_failed", format!("{field} must be zero or greater")));
    }
    Ok(())
}

impl ProductInput {
    fn into_product(self, id: String) -> Result<Product, ApiError> {
        require("code", &self.code)?;
        require("productName", &self.name)?;
        non_negative("price", &self.price)?;
        Ok(Product {
            id,
            code: self.code.trim().to_string(),
            name: self.name.trim().to_string(),
            price: self.price,
            model: blank_to_none(self.model),
            url: blank_to_none(self.url),
        })
    }
}

impl MovieSessionInput {
    fn into_session(self, id: String) -> Result<MovieSession, ApiError> {
        require("movieTitle", &self.title)?;
        require("movieSession", &self.session)?;
        non_negative("moviePrice", &self.price)?;
        let mut seen = HashSet::new();
        for chair in &self.chairs {
            require("chair id", &chair.id)?;
            if !seen.insert(chair.id.trim()) {
                return Err(ApiError::bad_request("validation_failed", format!("chair {} is repeated", chair.id.trim())));
            }
        }
        let chairs = self.chairs.into_iter().map(|c| Chair { id: c.id.trim().to_string(), reserved: c.reserved }).collect();
        Ok(MovieSession {
            id,
            title: self.title.trim().to_string(),
            session: self.session.trim().to_string(),
            price: self.price,
            category: blank_to_none(self.category),
            poster: blank_to_none(self.poster),
            language: blank_to_none(self.language),
            chairs,
        })
    }
}

impl CinemaInfoInput {
    fn into_info(self, id: String) -> Result<CinemaInfo, ApiError> {
        require("cinemaName", &self.cinema_name)?;
        require("address", &self.address)?;
        require("phone", &self.phone)?;
        Ok(CinemaInfo {
            id,
            cinema_name: self.cinema_name.trim().to_string(),
            address: self.address.trim().to_string(),
            phone: self.phone.trim().to_string(),
        })
    }
}

fn store_error(err: StoreError, missing_code: &'static str, request_id: &str) -> ApiError {
    match err {
        e @ StoreError::NotFound { .. } => ApiError::not_found(missing_code, e.to_string()).with_request_id(request_id),
        e => {
            error!(error = %e, request_id, "catalog store failure");
            ApiError::internal(e, Some(request_id.to_string()))
        }
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>, request_id: &str) -> Result<T, ApiError> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| ApiError::bad_request("validation_failed", e.body_text()).with_request_id(request_id))
}

pub async fn list_products(State(state): State<AppState>, RequestId(request_id): RequestId) -> ApiResult<Json<Vec<Product>>> {
    let products = state.products.list().await.map_err(|e| store_error(e, "product_not_found", &request_id))?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    let product = state.products.get(&id).await.map_err(|e| store_error(e, "product_not_found", &request_id))?;
    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = body(payload, &request_id)?
        .into_product(Uuid::new_v4().to_string())
        .map_err(|e| e.with_request_id(&request_id))?;
    let product = state.products.create(product).await.map_err(|e| store_error(e, "product_not_found", &request_id))?;
    info!(product_id = %product.id, code = %product.code, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(id): Path<String>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> ApiResult<Json<Product>> {
    let product = body(payload, &request_id)?.into_product(id).map_err(|e| e.with_request_id(&request_id))?;
    let product = state.products.update(product).await.map_err(|e| store_error(e, "product_not_found", &request_id))?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    let product = state.products.delete(&id).await.map_err(|e| store_error(e, "product_not_found", &request_id))?;
    info!(product_id = %product.id, "product deleted");
    Ok(Json(product))
}

pub async fn list_movies(State(state): State<AppState>, RequestId(request_id): RequestId) -> ApiResult<Json<Vec<MovieSession>>> {
    let movies = state.movies.list().await.map_err(|e| store_error(e, "movie_not_found", &request_id))?;
    Ok(Json(movies))
}

pub async fn get_movie(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(id): Path<String>,
) -> ApiResult<Json<MovieSession>> {
    let movie = state.movies.get(&id).await.map_err(|e| store_error(e, "movie_not_found", &request_id))?;
    Ok(Json(movie))
}

pub async fn create_movie(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    payload: Result<Json<MovieSessionInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MovieSession>)> {
    let movie = body(payload, &request_id)?
        .into_session(Uuid::new_v4().to_string())
        .map_err(|e| e.with_request_id(&request_id))?;
    let movie = state.movies.create(movie).await.map_err(|e| store_error(e, "movie_not_found", &request_id))?;
    info!(movie_id = %movie.id, chairs = movie.chairs.len(), "movie session created");
    Ok((StatusCode::CREATED, Json(movie)))
}

/// Replaces the whole session, seat map included.
pub async fn update_movie(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(id): Path<String>,
    payload: Result<Json<MovieSessionInput>, JsonRejection>,
) -> ApiResult<Json<MovieSession>> {
    let movie = body(payload, &request_id)?.into_session(id).map_err(|e| e.with_request_id(&request_id))?;
    let movie = state.movies.update(movie).await.map_err(|e| store_error(e, "movie_not_found", &request_id))?;
    Ok(Json(movie))
}

pub async fn delete_movie(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(id): Path<String>,
) -> ApiResult<Json<MovieSession>> {
    let movie = state.movies.delete(&id).await.map_err(|e| store_error(e, "movie_not_found", &request_id))?;
    info!(movie_id = %movie.id, "movie session deleted");
    Ok(Json(movie))
}

pub async fn list_infos(State(state): State<AppState>, RequestId(request_id): RequestId) -> ApiResult<Json<Vec<CinemaInfo>>> {
    let infos = state.infos.list().await.map_err(|e| store_error(e, "info_not_found", &request_id))?;
    Ok(Json(infos))
}

pub async fn get_info(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(id): Path<String>,
) -> ApiResult<Json<CinemaInfo>> {
    let info = state.infos.get(&id).await.map_err(|e| store_error(e, "info_not_found", &request_id))?;
    Ok(Json(info))
}

pub async fn create_info(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    payload: Result<Json<CinemaInfoInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CinemaInfo>)> {
    let info = body(payload, &request_id)?
        .into_info(Uuid::new_v4().to_string())
        .map_err(|e| e.with_request_id(&request_id))?;
    let info = state.infos.create(info).await.map_err(|e| store_error(e, "info_not_found", &request_id))?;
    info!(info_id = %info.id, cinema = %info.cinema_name, "cinema info created");
    Ok((StatusCode::CREATED, Json(info)))
}

pub async fn update_info(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(id): Path<String>,
    payload: Result<Json<CinemaInfoInput>, JsonRejection>,
) -> ApiResult<Json<CinemaInfo>> {
    let info = body(payload, &request_id)?.into_info(id).map_err(|e| e.with_request_id(&request_id))?;
    let info = state.infos.update(info).await.map_err(|e| store_error(e, "info_not_found", &request_id))?;
    Ok(Json(info))
}

pub async fn delete_info(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(id): Path<String>,
) -> ApiResult<Json<CinemaInfo>> {
    let info = state.infos.delete(&id).await.map_err(|e| store_error(e, "info_not_found", &request_id))?;
    info!(info_id = %info.id, "cinema info deleted");
    Ok(Json(info))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(price: i64) -> ProductInput {
        ProductInput { code: " P1 ".into(), name: "Popcorn".into(), price: Money::from_cents(price), model: Some("  ".into()), url: None }
    }

    #[test]
    fn product_input_is_trimmed() {
        let p = input(1500).into_product("id-1".into()).unwrap();
        assert_eq!(p.code, "P1");
        assert_eq!(p.model, None);
        assert_eq!(p.id, "id-1");
    }

    #[test]
    fn negative_price_is_rejected() {
        let err = input(-1).into_product("id-1".into()).unwrap_err();
        assert_eq!(err.code(), "validation_failed");
    }
}
