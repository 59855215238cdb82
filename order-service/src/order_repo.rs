use std::collections::BTreeMap;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use common_money::Money;
use common_store::{StoreError, StoreResult};
use sqlx::types::Json;
use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::models::{Billing, Order, OrderMovieSnapshot, OrderProductLine, PaymentType};

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Unconditional put keyed by (email, order id).
    async fn create(&self, order: Order) -> StoreResult<Order>;
    async fn get(&self, email: &str, order_id: &str) -> StoreResult<Order>;
    async fn list_by_email(&self, email: &str) -> StoreResult<Vec<Order>>;
    async fn list_all(&self) -> StoreResult<Vec<Order>>;
    /// Conditional on existence; returns the removed record.
    async fn delete(&self, email: &str, order_id: &str) -> StoreResult<Order>;
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    email: String,
    order_id: String,
    created_at: DateTime<Utc>,
    cpf: Option<String>,
    client_name: Option<String>,
    products: Json<Vec<OrderProductLine>>,
    movie: Json<OrderMovieSnapshot>,
    payment: String,
    total_price: BigDecimal,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        let payment: PaymentType = r.payment.parse().map_err(StoreError::Backend)?;
        Ok(Order {
            email: r.email,
            order_id: r.order_id,
            created_at: r.created_at,
            cpf: r.cpf,
            client_name: r.client_name,
            products: r.products.0,
            movie: r.movie.0,
            billing: Billing { payment, total_price: Money::new(r.total_price) },
        })
    }
}

const ORDER_COLUMNS: &str = "email, order_id, created_at, cpf, client_name, products, movie, payment, total_price";

#[derive(Clone)]
pub struct PgOrderRepository {
    db: PgPool,
}

impl PgOrderRepository {
    pub fn new(db: PgPool) -> Self { Self { db } }
}

fn rows_to_orders(rows: Vec<OrderRow>) -> StoreResult<Vec<Order>> {
    rows.into_iter().map(Order::try_from).collect()
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create(&self, order: Order) -> StoreResult<Order> {
        sqlx::query(
            r#"INSERT INTO orders (email, order_id, created_at, cpf, client_name, products, movie, payment, total_price)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               ON CONFLICT (email, order_id) DO UPDATE SET
                 created_at = EXCLUDED.created_at, cpf = EXCLUDED.cpf, client_name = EXCLUDED.client_name,
                 products = EXCLUDED.products, movie = EXCLUDED.movie, payment = EXCLUDED.payment,
                 total_price = EXCLUDED.total_price"#,
        )
        .bind(&order.email)
        .bind(&order.order_id)
        .bind(order.created_at)
        .bind(&order.cpf)
        .bind(&order.client_name)
        .bind(Json(&order.products))
        .bind(Json(&order.movie))
        .bind(order.billing.payment.as_str())
        .bind(order.billing.total_price.amount())
        .execute(&self.db)
        .await?;
        Ok(order)
    }

    async fn get(&self, email: &str, order_id: &str) -> StoreResult<Order> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE email = $1 AND order_id = $2"))
            .bind(email)
            .bind(order_id)
            .fetch_optional(&self.db)
            .await?;
        row.ok_or_else(|| StoreError::not_found("order", order_id))?.try_into()
    }

    async fn list_by_email(&self, email: &str) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE email = $1 ORDER BY created_at"))
            .bind(email)
            .fetch_all(&self.db)
            .await?;
        rows_to_orders(rows)
    }

    async fn list_all(&self) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY email, created_at"))
            .fetch_all(&self.db)
            .await?;
        rows_to_orders(rows)
    }

    async fn delete(&self, email: &str, order_id: &str) -> StoreResult<Order> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("DELETE FROM orders WHERE email = $1 AND order_id = $2 RETURNING {ORDER_COLUMNS}"))
            .bind(email)
            .bind(order_id)
            .fetch_optional(&self.db)
            .await?;
        row.ok_or_else(|| StoreError::not_found("order", order_id))?.try_into()
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    rows: RwLock<BTreeMap<(String, String), Order>>,
}

impl InMemoryOrderRepository {
    pub async fn count(&self) -> usize { self.rows.read().await.len() }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: Order) -> StoreResult<Order> {
        self.rows.write().await.insert((order.email.clone(), order.order_id.clone()), order.clone());
        Ok(order)
    }

    async fn get(&self, email: &str, order_id: &str) -> StoreResult<Order> {
        self.rows
            .read()
            .await
            .get(&(email.to_string(), order_id.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::not_found("order", order_id))
    }

    async fn list_by_email(&self, email: &str) -> StoreResult<Vec<Order>> {
        let rows = self.rows.read().await;
        let mut orders: Vec<Order> = rows.values().filter(|o| o.email == email).cloned().collect();
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    async fn list_all(&self) -> StoreResult<Vec<Order>> {
        Ok(self.rows.read().await.values().cloned().collect())
    }

    async fn delete(&self, email: &str, order_id: &str) -> StoreResult<Order> {
        self.rows
            .write()
            .await
            .remove(&(email.to_string(), order_id.to_string()))
            .ok_or_else(|| StoreError::not_found("order", order_id))
    }
}
