use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common_events::{
    Delivery, Envelope, EventBilling, EventFilter, EventPublisher, InMemoryTopic, OrderEvent, OrderEventType, EVENT_TYPE_ATTRIBUTE,
};
use common_money::Money;
use common_observability::ConsumerMetrics;
use notification_service::{
    order_received, DispatchError, DispatchOutcome, Dispatcher, MailError, Mailer, Notification, ORDER_RECEIVED_SUBJECT,
};

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<Notification>>,
    reject: Option<String>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, notification: &Notification) -> Result<(), MailError> {
        if self.reject.as_deref() == Some(notification.to.as_str()) {
            return Err(MailError::Rejected(503));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

fn event(email: &str, order_id: &str) -> OrderEvent {
    OrderEvent {
        email: email.into(),
        order_id: order_id.into(),
        billing: EventBilling { payment: "PIX".into(), total_price: Money::from_cents(2300) },
        product_codes: vec!["P1".into()],
        movie_id: "M1".into(),
        request_id: "req-1".into(),
    }
}

fn dispatcher(mailer: Arc<RecordingMailer>) -> Dispatcher {
    Dispatcher::new(mailer, "orders@cinema.local", ConsumerMetrics::new("notification").unwrap())
}

async fn published(events: &[(OrderEventType, OrderEvent)]) -> Vec<Delivery> {
    let topic = Arc::new(InMemoryTopic::new("order-events"));
    let publisher = EventPublisher::new(topic.clone());
    for (event_type, event) in events {
        publisher.publish(*event_type, event).await.unwrap();
    }
    topic.published()
}

#[test]
fn template_names_the_order() {
    let n = order_received(&event("a@x.com", "o-42"), "orders@cinema.local");
    assert_eq!(n.to, "a@x.com");
    assert_eq!(n.from, "orders@cinema.local");
    assert_eq!(n.subject, ORDER_RECEIVED_SUBJECT);
    assert!(n.body.contains("o-42"));
    assert!(n.body.contains("23.00"));
}

#[tokio::test]
async fn only_created_events_are_mailed() {
    let mailer = Arc::new(RecordingMailer::default());
    let d = dispatcher(mailer.clone());
    let deliveries = published(&[
        (OrderEventType::Created, event("a@x.com", "o-1")),
        (OrderEventType::Deleted, event("a@x.com", "o-1")),
    ])
    .await;

    let outcomes = d.dispatch_batch(&deliveries).await;
    assert_eq!(outcomes[0].as_ref().unwrap(), &DispatchOutcome::Sent { to: "a@x.com".into(), order_id: "o-1".into() });
    assert_eq!(outcomes[1].as_ref().unwrap(), &DispatchOutcome::Skipped { event_type: Some("ORDER_DELETED".into()) });
    assert_eq!(mailer.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn filter_reads_the_attribute_not_the_payload() {
    let mailer = Arc::new(RecordingMailer::default());
    let d = dispatcher(mailer.clone());
    // payload claims ORDER_CREATED, attribute says otherwise
    let body = serde_json::to_string(&Envelope::wrap(OrderEventType::Created, &event("a@x.com", "o-1")).unwrap()).unwrap();
    let mut attributes = BTreeMap::new();
    attributes.insert(EVENT_TYPE_ATTRIBUTE.to_string(), "ORDER_DELETED".to_string());
    let mislabelled = Delivery { message_id: "m-1".into(), attributes, body };
    let unlabelled = Delivery { message_id: "m-2".into(), attributes: BTreeMap::new(), body: "{}".into() };

    assert!(matches!(d.dispatch(&mislabelled).await, Ok(DispatchOutcome::Skipped { .. })));
    assert_eq!(d.dispatch(&unlabelled).await.unwrap(), DispatchOutcome::Skipped { event_type: None });
    assert!(mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn one_failed_send_does_not_block_the_batch() {
    let mailer = Arc::new(RecordingMailer { reject: Some("bad@x.com".into()), ..Default::default() });
    let d = dispatcher(mailer.clone());
    let mut deliveries = published(&[
        (OrderEventType::Created, event("a@x.com", "o-1")),
        (OrderEventType::Created, event("bad@x.com", "o-2")),
        (OrderEventType::Created, event("c@x.com", "o-3")),
    ])
    .await;
    let mut attributes = BTreeMap::new();
    attributes.insert(EVENT_TYPE_ATTRIBUTE.to_string(), "ORDER_CREATED".to_string());
    deliveries.push(Delivery { message_id: "m-9".into(), attributes, body: "not json".into() });

    let outcomes = d.dispatch_batch(&deliveries).await;
    assert!(outcomes[0].is_ok());
    assert!(matches!(&outcomes[1], Err(DispatchError::Mail { order_id, .. }) if order_id == "o-2"));
    assert!(outcomes[2].is_ok());
    assert!(matches!(&outcomes[3], Err(DispatchError::Decode { .. })));

    let sent: Vec<String> = mailer.sent.lock().unwrap().iter().map(|n| n.to.clone()).collect();
    assert_eq!(sent, vec!["a@x.com".to_string(), "c@x.com".to_string()]);
    let text = common_observability::render(&[&d.metrics().registry]).unwrap();
    assert!(text.contains("outcome=\"sent\"} 2"));
    assert!(text.contains("outcome=\"failed\"} 1"));
    assert!(text.contains("outcome=\"malformed\"} 1"));
}

#[tokio::test]
async fn subscribes_through_a_filtered_topic() {
    let topic = Arc::new(InMemoryTopic::new("order-events"));
    let mut rx = topic.subscribe(EventFilter::only([OrderEventType::Created]));
    let publisher = EventPublisher::new(topic.clone());
    publisher.publish(OrderEventType::Deleted, &event("a@x.com", "o-1")).await.unwrap();
    publisher.publish(OrderEventType::Created, &event("a@x.com", "o-2")).await.unwrap();

    let mailer = Arc::new(RecordingMailer::default());
    let d = dispatcher(mailer.clone());
    let delivery = rx.recv().await.unwrap();
    assert_eq!(d.dispatch(&delivery).await.unwrap(), DispatchOutcome::Sent { to: "a@x.com".into(), order_id: "o-2".into() });
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn redelivered_created_event_is_mailed_again() {
    let mailer = Arc::new(RecordingMailer::default());
    let d = dispatcher(mailer.clone());
    let delivery = published(&[(OrderEventType::Created, event("a@x.com", "o-1"))]).await.remove(0);

    let outcomes = d.dispatch_batch(&[delivery.clone(), delivery]).await;
    assert!(outcomes.iter().all(|o| o.is_ok()));
    let sent = mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], sent[1]);
    assert!(sent[0].body.contains("o-1"));
}
