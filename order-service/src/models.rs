use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use common_events::{EventBilling, OrderEvent};
use common_money::Money;
use common_store::{MovieSession, Product};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    Cash,
    DebitCard,
    Pix,
    CreditCard,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Cash => "CASH",
            PaymentType::DebitCard => "DEBIT_CARD",
            PaymentType::Pix => "PIX",
            PaymentType::CreditCard => "CREDIT_CARD",
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for PaymentType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CASH" => Ok(PaymentType::Cash),
            "DEBIT_CARD" => Ok(PaymentType::DebitCard),
            "PIX" => Ok(PaymentType::Pix),
            "CREDIT_CARD" => Ok(PaymentType::CreditCard),
            other => Err(format!("unknown payment type {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChairSelection {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub email: String,
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    pub products_ids: Vec<String>,
    pub movie_id: String,
    #[serde(default)]
    pub movie_chairs: Vec<ChairSelection>,
    pub payment: PaymentType,
}

impl OrderRequest {
    /// Shape checks only; nothing here touches storage.
    pub fn validate(&self) -> Result<(), String> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err("email must be a valid address".into());
        }
        if self.products_ids.is_empty() {
            return Err("productsIds must not be empty".into());
        }
        if self.products_ids.iter().any(|id| id.trim().is_empty()) {
            return Err("productsIds must not contain blank ids".into());
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.products_ids.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(format!("product id {dup} is repeated"));
        }
        if self.movie_id.trim().is_empty() {
            return Err("movieId is required".into());
        }
        let mut chairs = HashSet::new();
        for chair in &self.movie_chairs {
            if chair.id.trim().is_empty() {
                return Err("movieChairs must not contain blank ids".into());
            }
            if !chairs.insert(chair.id.as_str()) {
                return Err(format!("chair {} is repeated", chair.id));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderProductLine {
    pub code: String,
    pub price: Money,
}

/// Session details frozen at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMovieSnapshot {
    pub movie_id: String,
    pub movie_title: String,
    pub movie_session: String,
    pub movie_chairs: Vec<ChairSelection>,
}

impl OrderMovieSnapshot {
    pub fn chair_ids(&self) -> Vec<String> { self.movie_chairs.iter().map(|c| c.id.clone()).collect() }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Billing {
    pub payment: PaymentType,
    pub total_price: Money,
}

/// Stored order, keyed by (email, order_id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub email: String,
    pub order_id: String,
    pub created_at: DateTime<Utc>,
    pub cpf: Option<String>,
    pub client_name: Option<String>,
    pub products: Vec<OrderProductLine>,
    pub movie: OrderMovieSnapshot,
    pub billing: Billing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub email: String,
    pub id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    pub billing: Billing,
    pub products: Vec<OrderProductLine>,
    pub movie: OrderMovieSnapshot,
}

/// `products` must be the fetched records in request order.
pub fn build_order(request: &OrderRequest, products: &[Product], movie: &MovieSession, order_id: String, created_at: DateTime<Utc>) -> Order {
    let lines: Vec<OrderProductLine> = products
        .iter()
        .map(|p| OrderProductLine { code: p.code.clone(), price: p.price.clone() })
        .collect();
    let total_price = lines.iter().map(|l| &l.price).sum::<Money>() + &movie.price;
    Order {
        email: request.email.trim().to_string(),
        order_id,
        created_at,
        cpf: request.cpf.clone(),
        client_name: request.client_name.clone(),
        products: lines,
        movie: OrderMovieSnapshot {
            movie_id: movie.id.clone(),
            movie_title: movie.title.clone(),
            movie_session: movie.session.clone(),
            movie_chairs: request.movie_chairs.clone(),
        },
        billing: Billing { payment: request.payment, total_price },
    }
}

pub fn to_response(order: &Order) -> OrderResponse {
    OrderResponse {
        email: order.email.clone(),
        id: order.order_id.clone(),
        created_at: order.created_at,
        cpf: order.cpf.clone(),
        client_name: order.client_name.clone(),
        billing: order.billing.clone(),
        products: order.products.clone(),
        movie: order.movie.clone(),
    }
}

pub fn order_event(order: &Order, request_id: &str) -> OrderEvent {
    OrderEvent {
        email: order.email.clone(),
        order_id: order.order_id.clone(),
        billing: EventBilling { payment: order.billing.payment.as_str().to_string(), total_price: order.billing.total_price.clone() },
        product_codes: order.products.iter().map(|p| p.code.clone()).collect(),
        movie_id: order.movie.movie_id.clone(),
        request_id: request_id.to_string(),
    }
}
