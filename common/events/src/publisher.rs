use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Envelope, OrderEvent, OrderEventType, PublishError, EVENT_TYPE_ATTRIBUTE};

/// Transport port. Implementations return the message id assigned by the transport.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, key: &str, attributes: &BTreeMap<String, String>, body: &str) -> Result<String, PublishError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub message_id: String,
    pub envelope: Envelope,
}

/// Wraps order events in an [`Envelope`] and hands them to the configured sink.
#[derive(Clone)]
pub struct EventPublisher {
    sink: Arc<dyn EventSink>,
}

impl EventPublisher {
    pub fn new(sink: Arc<dyn EventSink>) -> Self { Self { sink } }

    pub async fn publish(&self, event_type: OrderEventType, event: &OrderEvent) -> Result<Published, PublishError> {
        let envelope = Envelope::wrap(event_type, event).map_err(|e| PublishError::Serialization(e.to_string()))?;
        let body = serde_json::to_string(&envelope).map_err(|e| PublishError::Serialization(e.to_string()))?;
        let mut attributes = BTreeMap::new();
        attributes.insert(EVENT_TYPE_ATTRIBUTE.to_string(), event_type.as_str().to_string());
        let message_id = self.sink.send(&event.order_id, &attributes, &body).await?;
        debug!(order_id = %event.order_id, event_type = %event_type, %message_id, "order event published");
        Ok(Published { message_id, envelope })
    }
}

/// Sink used when no broker is configured: logs and drops the message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn send(&self, key: &str, attributes: &BTreeMap<String, String>, body: &str) -> Result<String, PublishError> {
        let message_id = format!("noop-{}", Uuid::new_v4());
        info!(key, event_type = attributes.get(EVENT_TYPE_ATTRIBUTE).map(String::as_str).unwrap_or("-"), bytes = body.len(), %message_id, "event sink not configured; dropping event");
        Ok(message_id)
    }
}
