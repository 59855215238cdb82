use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::{Delivery, EventSink, OrderEventType, PublishError, EVENT_TYPE_ATTRIBUTE};

/// Subscription filter evaluated against message attributes only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFilter {
    All,
    Only(BTreeSet<OrderEventType>),
}

impl EventFilter {
    pub fn only(types: impl IntoIterator<Item = OrderEventType>) -> Self {
        EventFilter::Only(types.into_iter().collect())
    }

    pub fn accepts(&self, attributes: &BTreeMap<String, String>) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Only(types) => attributes
                .get(EVENT_TYPE_ATTRIBUTE)
                .and_then(|raw| raw.parse::<OrderEventType>().ok())
                .map(|t| types.contains(&t))
                .unwrap_or(false),
        }
    }
}

#[derive(Default)]
struct TopicState {
    next_offset: u64,
    published: Vec<Delivery>,
    subscribers: Vec<(EventFilter, UnboundedSender<Delivery>)>,
}

/// Process-local fan-out topic. Every subscriber whose filter accepts a message
/// gets its own copy; the full publish log is kept for inspection.
#[derive(Default)]
pub struct InMemoryTopic {
    name: String,
    state: Mutex<TopicState>,
}

impl InMemoryTopic {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), state: Mutex::new(TopicState::default()) }
    }

    pub fn subscribe(&self, filter: EventFilter) -> UnboundedReceiver<Delivery> {
        let (tx, rx) = unbounded_channel();
        self.lock().subscribers.push((filter, tx));
        rx
    }

    pub fn published(&self) -> Vec<Delivery> { self.lock().published.clone() }

    fn lock(&self) -> std::sync::MutexGuard<'_, TopicState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl EventSink for InMemoryTopic {
    async fn send(&self, key: &str, attributes: &BTreeMap<String, String>, body: &str) -> Result<String, PublishError> {
        let mut state = self.lock();
        let message_id = format!("{}-0-{}", self.name, state.next_offset);
        state.next_offset += 1;
        let delivery = Delivery { message_id: message_id.clone(), attributes: attributes.clone(), body: body.to_string() };
        // closed receivers are dropped from the fan-out
        state.subscribers.retain(|(filter, tx)| !filter.accepts(attributes) || tx.send(delivery.clone()).is_ok());
        state.published.push(delivery);
        debug!(topic = %self.name, key, %message_id, "message appended");
        Ok(message_id)
    }
}
