use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use common_money::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message attribute carrying the event type; subscription filters read only this.
pub const EVENT_TYPE_ATTRIBUTE: &str = "eventType";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OrderEventType {
    #[serde(rename = "ORDER_CREATED")]
    Created,
    #[serde(rename = "ORDER_DELETED")]
    Deleted,
}

impl OrderEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderEventType::Created => "ORDER_CREATED",
            OrderEventType::Deleted => "ORDER_DELETED",
        }
    }
}

impl fmt::Display for OrderEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderEventType {
    type Err = DecodeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ORDER_CREATED" => Ok(OrderEventType::Created),
            "ORDER_DELETED" => Ok(OrderEventType::Deleted),
            other => Err(DecodeError::UnknownEventType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBilling {
    pub payment: String,
    pub total_price: Money,
}

/// Domain payload describing one order transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub email: String,
    pub order_id: String,
    pub billing: EventBilling,
    pub product_codes: Vec<String>,
    pub movie_id: String,
    pub request_id: String,
}

/// Wire envelope: `data` holds the serialized [`OrderEvent`] as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub event_type: OrderEventType,
    pub data: String,
}

impl Envelope {
    pub fn wrap(event_type: OrderEventType, event: &OrderEvent) -> Result<Self, serde_json::Error> {
        Ok(Self { event_type, data: serde_json::to_string(event)? })
    }

    pub fn event(&self) -> Result<OrderEvent, DecodeError> {
        serde_json::from_str(&self.data).map_err(DecodeError::Event)
    }
}

/// One message as seen by a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: String,
    pub attributes: BTreeMap<String, String>,
    pub body: String,
}

impl Delivery {
    pub fn event_type_attribute(&self) -> Option<&str> {
        self.attributes.get(EVENT_TYPE_ATTRIBUTE).map(String::as_str)
    }

    pub fn envelope(&self) -> Result<Envelope, DecodeError> {
        if self.body.trim().is_empty() {
            return Err(DecodeError::EmptyPayload);
        }
        serde_json::from_str(&self.body).map_err(DecodeError::Envelope)
    }

    /// Decodes both layers: the envelope and the embedded event.
    pub fn decode(&self) -> Result<(Envelope, OrderEvent), DecodeError> {
        let envelope = self.envelope()?;
        let event = envelope.event()?;
        Ok((envelope, event))
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("empty payload")]
    EmptyPayload,
    #[error("malformed envelope: {0}")]
    Envelope(serde_json::Error),
    #[error("malformed order event: {0}")]
    Event(serde_json::Error),
    #[error("unknown event type: {0}")]
    UnknownEventType(String),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("transport error: {0}")]
    Transport(String),
}
