pub mod clock;
pub mod model;
pub mod publisher;
pub mod topic;
#[cfg(feature = "kafka")]
pub mod kafka;

pub use clock::{Clock, FixedClock, SystemClock};
pub use model::{DecodeError, Delivery, Envelope, EventBilling, OrderEvent, OrderEventType, PublishError, EVENT_TYPE_ATTRIBUTE};
pub use publisher::{EventPublisher, EventSink, NoopEventSink, Published};
pub use topic::{EventFilter, InMemoryTopic};
#[cfg(feature = "kafka")]
pub use kafka::{delivery_from_message, KafkaEventSink};
