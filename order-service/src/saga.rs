use std::collections::HashSet;
use std::sync::Arc;

use common_events::{Clock, EventPublisher, OrderEventType, PublishError};
use common_observability::SagaMetrics;
use common_store::{MovieRepository, ProductRepository, StoreError};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{build_order, order_event, Order, OrderRequest};
use crate::order_repo::OrderRepository;
use crate::seats::{self, SeatAction};

/// Follow-up steps that run after the order write has committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaStep {
    SeatReservation,
    SeatRelease,
    EventPublish,
}

impl SagaStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStep::SeatReservation => "seat_reservation",
            SagaStep::SeatRelease => "seat_release",
            SagaStep::EventPublish => "event_publish",
        }
    }
}

#[derive(Debug, Error)]
pub enum FollowUpError {
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Publish(PublishError),
}

#[derive(Debug, Error)]
pub enum SagaError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("products not found: {}", .0.join(", "))]
    ProductNotFound(Vec<String>),
    #[error("movie session {0} not found")]
    MovieNotFound(String),
    #[error("order {order_id} not found for {email}")]
    OrderNotFound { email: String, order_id: String },
    /// The order write is durable; `step` did not complete and nothing was rolled back.
    #[error("order {} committed but {} failed: {source}", .order.order_id, .step.as_str())]
    PartialCommit { step: SagaStep, order: Box<Order>, source: FollowUpError },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Handles shared by every saga run; built once at startup.
#[derive(Clone)]
pub struct SagaPorts {
    pub orders: Arc<dyn OrderRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub movies: Arc<dyn MovieRepository>,
    pub publisher: EventPublisher,
    pub clock: Arc<dyn Clock>,
}

#[derive(Clone)]
pub struct OrderSaga {
    ports: SagaPorts,
    metrics: SagaMetrics,
    publish_deletions: bool,
}

impl OrderSaga {
    pub fn new(ports: SagaPorts, metrics: SagaMetrics) -> Self {
        Self { ports, metrics, publish_deletions: true }
    }

    pub fn with_publish_deletions(mut self, enabled: bool) -> Self {
        self.publish_deletions = enabled;
        self
    }

    pub fn metrics(&self) -> &SagaMetrics { &self.metrics }

    pub async fn create_order(&self, request: OrderRequest, request_id: &str) -> Result<Order, SagaError> {
        if let Err(msg) = request.validate() {
            return Err(self.reject("validation", SagaError::Validation(msg)));
        }

        let (products, movie) = tokio::join!(
            self.ports.products.get_many(&request.products_ids),
            self.ports.movies.get(&request.movie_id),
        );
        let products = products?;
        if products.len() != request.products_ids.len() {
            let found: HashSet<&str> = products.iter().map(|p| p.id.as_str()).collect();
            let missing = request.products_ids.iter().filter(|id| !found.contains(id.as_str())).cloned().collect();
            return Err(self.reject("product_not_found", SagaError::ProductNotFound(missing)));
        }
        let mut session = match movie {
            Ok(m) => m,
            Err(e) if e.is_not_found() => {
                return Err(self.reject("movie_not_found", SagaError::MovieNotFound(request.movie_id.clone())));
            }
            Err(e) => return Err(e.into()),
        };

        let order = build_order(&request, &products, &session, Uuid::new_v4().to_string(), self.ports.clock.now());
        let order = self.ports.orders.create(order).await?;
        self.metrics.orders_created.inc();
        info!(order_id = %order.order_id, email = %order.email, total = %order.billing.total_price, request_id, "order committed");

        // Stale-read write: concurrent bookings of the same chair both succeed.
        let matched = seats::apply(&mut session, &order.movie.chair_ids(), SeatAction::Reserve);
        if let Err(e) = self.ports.movies.update(session).await {
            return Err(self.partial(SagaStep::SeatReservation, order, FollowUpError::Store(e)));
        }
        info!(order_id = %order.order_id, movie_id = %order.movie.movie_id, matched, "seats reserved");

        let event = order_event(&order, request_id);
        if let Err(e) = self.ports.publisher.publish(OrderEventType::Created, &event).await {
            return Err(self.partial(SagaStep::EventPublish, order, FollowUpError::Publish(e)));
        }
        Ok(order)
    }

    pub async fn delete_order(&self, email: &str, order_id: &str, request_id: &str) -> Result<Order, SagaError> {
        if email.trim().is_empty() || order_id.trim().is_empty() {
            return Err(self.reject("validation", SagaError::Validation("email and orderId are required".into())));
        }
        let order = match self.ports.orders.delete(email, order_id).await {
            Ok(o) => o,
            Err(e) if e.is_not_found() => return Err(self.order_not_found(email, order_id)),
            Err(e) => return Err(e.into()),
        };
        self.metrics.orders_deleted.inc();
        info!(order_id, email, request_id, "order deleted");

        let released = match self.ports.movies.get(&order.movie.movie_id).await {
            Ok(mut session) => {
                seats::apply(&mut session, &order.movie.chair_ids(), SeatAction::Release);
                self.ports.movies.update(session).await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = released {
            return Err(self.partial(SagaStep::SeatRelease, order, FollowUpError::Store(e)));
        }

        if self.publish_deletions {
            let event = order_event(&order, request_id);
            if let Err(e) = self.ports.publisher.publish(OrderEventType::Deleted, &event).await {
                return Err(self.partial(SagaStep::EventPublish, order, FollowUpError::Publish(e)));
            }
        }
        Ok(order)
    }

    pub async fn get_order(&self, email: &str, order_id: &str) -> Result<Order, SagaError> {
        match self.ports.orders.get(email, order_id).await {
            Ok(o) => Ok(o),
            Err(e) if e.is_not_found() => Err(SagaError::OrderNotFound { email: email.into(), order_id: order_id.into() }),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn orders_by_email(&self, email: &str) -> Result<Vec<Order>, SagaError> {
        Ok(self.ports.orders.list_by_email(email).await?)
    }

    pub async fn all_orders(&self) -> Result<Vec<Order>, SagaError> {
        Ok(self.ports.orders.list_all().await?)
    }

    fn order_not_found(&self, email: &str, order_id: &str) -> SagaError {
        self.reject("order_not_found", SagaError::OrderNotFound { email: email.into(), order_id: order_id.into() })
    }

    fn reject(&self, reason: &str, err: SagaError) -> SagaError {
        self.metrics.rejections.with_label_values(&[reason]).inc();
        info!(reason, error = %err, "request rejected");
        err
    }

    fn partial(&self, step: SagaStep, order: Order, source: FollowUpError) -> SagaError {
        self.metrics.partial_commits.with_label_values(&[step.as_str()]).inc();
        warn!(order_id = %order.order_id, step = step.as_str(), error = %source, "follow-up step failed after commit");
        SagaError::PartialCommit { step, order: Box::new(order), source }
    }
}
