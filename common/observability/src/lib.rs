use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters for the order create/delete workflow.
#[derive(Clone)]
pub struct SagaMetrics {
    pub registry: Registry,
    pub orders_created: IntCounter,
    pub orders_deleted: IntCounter,
    pub partial_commits: IntCounterVec,
    pub rejections: IntCounterVec,
}

impl SagaMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let orders_created = IntCounter::new("orders_created_total", "Orders committed by the create workflow")?;
        let orders_deleted = IntCounter::new("orders_deleted_total", "Orders removed by the delete workflow")?;
        let partial_commits = IntCounterVec::new(
            Opts::new("saga_partial_commits_total", "Workflows whose primary write committed but a follow-up step failed"),
            &["step"],
        )?;
        let rejections = IntCounterVec::new(
            Opts::new("saga_rejections_total", "Requests rejected before any write"),
            &["reason"],
        )?;
        registry.register(Box::new(orders_created.clone()))?;
        registry.register(Box::new(orders_deleted.clone()))?;
        registry.register(Box::new(partial_commits.clone()))?;
        registry.register(Box::new(rejections.clone()))?;
        Ok(SagaMetrics { registry, orders_created, orders_deleted, partial_commits, rejections })
    }
}

/// Counters shared by the topic consumers (audit recorder, notification dispatcher).
#[derive(Clone)]
pub struct ConsumerMetrics {
    pub registry: Registry,
    pub messages: IntCounterVec,
    pub expired_rows: IntCounter,
}

impl ConsumerMetrics {
    pub fn new(consumer: &str) -> prometheus::Result<Self> {
        let registry = Registry::new_custom(None, Some([("consumer".to_string(), consumer.to_string())].into_iter().collect()))?;
        let messages = IntCounterVec::new(
            Opts::new("consumer_messages_total", "Messages handled by outcome"),
            &["outcome"],
        )?;
        let expired_rows = IntCounter::new("audit_expired_rows_total", "Audit rows removed by the expiry sweeper")?;
        registry.register(Box::new(messages.clone()))?;
        registry.register(Box::new(expired_rows.clone()))?;
        Ok(ConsumerMetrics { registry, messages, expired_rows })
    }

    pub fn record(&self, outcome: &str) { self.messages.with_label_values(&[outcome]).inc(); }
}

/// Text exposition of several registries concatenated, as served on `/metrics`.
pub fn render(registries: &[&Registry]) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    for registry in registries {
        encoder.encode(&registry.gather(), &mut buf)?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
