use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::message::{Header, Headers, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::Message;

use crate::{Delivery, EventSink, PublishError};

/// Publishes to a Kafka topic; attributes travel as message headers.
#[derive(Clone)]
pub struct KafkaEventSink {
    producer: FutureProducer,
    topic: String,
    timeout: Duration,
}

impl KafkaEventSink {
    pub fn new(producer: FutureProducer, topic: impl Into<String>) -> Self {
        Self { producer, topic: topic.into(), timeout: Duration::from_secs(5) }
    }
}

#[async_trait]
impl EventSink for KafkaEventSink {
    async fn send(&self, key: &str, attributes: &BTreeMap<String, String>, body: &str) -> Result<String, PublishError> {
        let headers = attributes.iter().fold(OwnedHeaders::new(), |headers, (k, v)| {
            headers.insert(Header { key: k.as_str(), value: Some(v.as_str()) })
        });
        let record = FutureRecord::to(&self.topic).key(key).payload(body).headers(headers);
        match self.producer.send(record, self.timeout).await {
            Ok((partition, offset)) => Ok(format!("{}-{}-{}", self.topic, partition, offset)),
            Err((e, _)) => Err(PublishError::Transport(e.to_string())),
        }
    }
}

/// Converts a consumed Kafka message into a [`Delivery`]. Non-UTF8 headers are skipped.
pub fn delivery_from_message<M: Message>(message: &M) -> Delivery {
    let mut attributes = BTreeMap::new();
    if let Some(headers) = message.headers() {
        for header in headers.iter() {
            if let Some(Ok(value)) = header.value.map(std::str::from_utf8) {
                attributes.insert(header.key.to_string(), value.to_string());
            }
        }
    }
    let body = match message.payload_view::<str>() {
        Some(Ok(text)) => text.to_string(),
        _ => String::new(),
    };
    Delivery {
        message_id: format!("{}-{}-{}", message.topic(), message.partition(), message.offset()),
        attributes,
        body,
    }
}
