use std::sync::Arc;

use common_events::{DecodeError, Delivery, EventFilter, OrderEvent, OrderEventType, EVENT_TYPE_ATTRIBUTE};
use common_observability::ConsumerMetrics;
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::mailer::{MailError, Mailer, Notification};

pub const ORDER_RECEIVED_SUBJECT: &str = "Order received";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent { to: String, order_id: String },
    /// Filtered out by the `eventType` attribute; the payload was not read.
    Skipped { event_type: Option<String> },
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("undecodable message {message_id}: {source}")]
    Decode { message_id: String, source: DecodeError },
    #[error("order {order_id} has no recipient address")]
    MissingRecipient { order_id: String },
    #[error("failed to notify {to} about order {order_id}: {source}")]
    Mail { to: String, order_id: String, source: MailError },
}

pub fn order_received(event: &OrderEvent, from: &str) -> Notification {
    let body = format!(
        "Hello,\n\nWe received your order {}.\nTotal: {} (paid with {}).\n\nEnjoy the movie!\n",
        event.order_id, event.billing.total_price, event.billing.payment,
    );
    Notification {
        to: event.email.clone(),
        from: from.to_string(),
        subject: ORDER_RECEIVED_SUBJECT.to_string(),
        body,
    }
}

/// Sends a confirmation for every order-created delivery.
#[derive(Clone)]
pub struct Dispatcher {
    mailer: Arc<dyn Mailer>,
    from: String,
    filter: EventFilter,
    metrics: ConsumerMetrics,
}

impl Dispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, from: impl Into<String>, metrics: ConsumerMetrics) -> Self {
        Self {
            mailer,
            from: from.into(),
            filter: EventFilter::only([OrderEventType::Created]),
            metrics,
        }
    }

    pub fn metrics(&self) -> &ConsumerMetrics { &self.metrics }

    pub async fn dispatch(&self, delivery: &Delivery) -> Result<DispatchOutcome, DispatchError> {
        if !self.filter.accepts(&delivery.attributes) {
            self.metrics.record("skipped");
            let event_type = delivery.attributes.get(EVENT_TYPE_ATTRIBUTE).cloned();
            debug!(message_id = %delivery.message_id, ?event_type, "not an order-created event");
            return Ok(DispatchOutcome::Skipped { event_type });
        }
        let result = self.notify(delivery).await;
        match &result {
            Ok(DispatchOutcome::Sent { to, order_id }) => {
                self.metrics.record("sent");
                info!(%to, %order_id, "order confirmation sent");
            }
            Ok(DispatchOutcome::Skipped { .. }) => {}
            Err(e @ (DispatchError::Decode { .. } | DispatchError::MissingRecipient { .. })) => {
                self.metrics.record("malformed");
                warn!(error = %e, "skipping order event");
            }
            Err(e) => {
                self.metrics.record("failed");
                warn!(error = %e, message_id = %delivery.message_id, "order confirmation failed");
            }
        }
        result
    }

    async fn notify(&self, delivery: &Delivery) -> Result<DispatchOutcome, DispatchError> {
        let (_, event) = delivery
            .decode()
            .map_err(|source| DispatchError::Decode { message_id: delivery.message_id.clone(), source })?;
        if event.email.trim().is_empty() {
            return Err(DispatchError::MissingRecipient { order_id: event.order_id });
        }
        let notification = order_received(&event, &self.from);
        self.mailer.send(&notification).await.map_err(|source| DispatchError::Mail {
            to: notification.to.clone(),
            order_id: event.order_id.clone(),
            source,
        })?;
        Ok(DispatchOutcome::Sent { to: notification.to, order_id: event.order_id })
    }

    /// Each delivery gets its own outcome; one failure never blocks the rest.
    pub async fn dispatch_batch(&self, deliveries: &[Delivery]) -> Vec<Result<DispatchOutcome, DispatchError>> {
        join_all(deliveries.iter().map(|d| self.dispatch(d))).await
    }
}
