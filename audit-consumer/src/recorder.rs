use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use common_events::{Clock, DecodeError, Delivery, OrderEventType};
use common_observability::ConsumerMetrics;
use common_store::StoreError;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::repo::AuditRepository;

pub const DEFAULT_TTL_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditInfo {
    pub order_id: String,
    pub movie_id: String,
    pub product_codes: Vec<String>,
    pub message_id: String,
}

/// Best-effort trace of one order event. Never updated; removed once `expires_at` passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub subject_key: String,
    pub sort_key: String,
    pub expires_at: DateTime<Utc>,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub request_id: String,
    pub event_type: OrderEventType,
    pub info: AuditInfo,
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("undecodable message {message_id}: {source}")]
    Decode { message_id: String, source: DecodeError },
    #[error("failed to store audit record: {0}")]
    Store(#[from] StoreError),
}

pub fn subject_key(order_id: &str) -> String { format!("order_{order_id}") }

/// `<TYPE>#<millis>#<nonce>`. The nonce keeps redeliveries received in the same
/// millisecond on separate rows.
pub fn sort_key(event_type: OrderEventType, at: DateTime<Utc>, nonce: Uuid) -> String {
    format!("{}#{}#{}", event_type.as_str(), at.timestamp_millis(), nonce.simple())
}

/// Derives the audit row for a delivery received at `received_at`.
pub fn build_record(delivery: &Delivery, received_at: DateTime<Utc>, ttl: Duration) -> Result<AuditRecord, RecordError> {
    let (envelope, event) = delivery
        .decode()
        .map_err(|source| RecordError::Decode { message_id: delivery.message_id.clone(), source })?;
    Ok(AuditRecord {
        subject_key: subject_key(&event.order_id),
        sort_key: sort_key(envelope.event_type, received_at, Uuid::new_v4()),
        expires_at: received_at + ttl,
        email: event.email,
        created_at: received_at,
        request_id: event.request_id,
        event_type: envelope.event_type,
        info: AuditInfo {
            order_id: event.order_id,
            movie_id: event.movie_id,
            product_codes: event.product_codes,
            message_id: delivery.message_id.clone(),
        },
    })
}

#[derive(Clone)]
pub struct AuditRecorder {
    repo: Arc<dyn AuditRepository>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    metrics: ConsumerMetrics,
}

impl AuditRecorder {
    pub fn new(repo: Arc<dyn AuditRepository>, clock: Arc<dyn Clock>, metrics: ConsumerMetrics) -> Self {
        Self { repo, clock, ttl: Duration::seconds(DEFAULT_TTL_SECS), metrics }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn metrics(&self) -> &ConsumerMetrics { &self.metrics }

    /// Writes one row per delivery. Redelivered messages produce additional rows.
    pub async fn record(&self, delivery: &Delivery) -> Result<AuditRecord, RecordError> {
        let result = match build_record(delivery, self.clock.now(), self.ttl) {
            Ok(record) => self.repo.put(&record).await.map(|_| record).map_err(RecordError::from),
            Err(e) => Err(e),
        };
        match &result {
            Ok(record) => {
                self.metrics.record("recorded");
                debug!(subject = %record.subject_key, sort = %record.sort_key, "audit record written");
            }
            Err(e @ RecordError::Decode { .. }) => {
                self.metrics.record("malformed");
                warn!(error = %e, "skipping undecodable order event");
            }
            Err(e) => {
                self.metrics.record("failed");
                warn!(error = %e, message_id = %delivery.message_id, "audit write failed");
            }
        }
        result
    }

    /// Processes the batch concurrently; each delivery gets its own outcome.
    pub async fn record_batch(&self, deliveries: &[Delivery]) -> Vec<Result<AuditRecord, RecordError>> {
        join_all(deliveries.iter().map(|d| self.record(d))).await
    }
}
