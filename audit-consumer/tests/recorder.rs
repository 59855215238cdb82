use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, TimeZone, Utc};
use common_events::{Clock, Delivery, EventBilling, EventPublisher, FixedClock, InMemoryTopic, OrderEvent, OrderEventType, SystemClock};
use common_money::Money;
use common_observability::ConsumerMetrics;
use audit_consumer::app::ops_router;
use audit_consumer::sweeper::sweep_once;
use audit_consumer::{AuditRecorder, AuditRepository, InMemoryAuditRepository, RecordError};
use tower::ServiceExt;

fn event(order_id: &str) -> OrderEvent {
    OrderEvent {
        email: "a@x.com".into(),
        order_id: order_id.into(),
        billing: EventBilling { payment: "PIX".into(), total_price: Money::from_cents(2300) },
        product_codes: vec!["P1".into(), "P2".into()],
        movie_id: "M1".into(),
        request_id: "req-1".into(),
    }
}

async fn delivery(event_type: OrderEventType, order_id: &str) -> Delivery {
    let topic = Arc::new(InMemoryTopic::new("order-events"));
    EventPublisher::new(topic.clone()).publish(event_type, &event(order_id)).await.unwrap();
    topic.published().remove(0)
}

struct Fixture {
    recorder: AuditRecorder,
    repo: Arc<InMemoryAuditRepository>,
    clock: Arc<FixedClock>,
    metrics: ConsumerMetrics,
}

fn fixture() -> Fixture {
    let repo = Arc::new(InMemoryAuditRepository::default());
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()));
    let metrics = ConsumerMetrics::new("audit").unwrap();
    let recorder = AuditRecorder::new(repo.clone(), clock.clone(), metrics.clone());
    Fixture { recorder, repo, clock, metrics }
}

#[tokio::test]
async fn record_keys_and_expiry() {
    let f = fixture();
    let d = delivery(OrderEventType::Created, "o-1").await;
    let record = f.recorder.record(&d).await.unwrap();

    let received = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    assert_eq!(record.subject_key, "order_o-1");
    assert!(record.sort_key.starts_with(&format!("ORDER_CREATED#{}#", received.timestamp_millis())));
    assert_eq!(record.expires_at, received + Duration::seconds(300));
    assert_eq!(record.created_at, received);
    assert_eq!(record.request_id, "req-1");
    assert_eq!(record.info.movie_id, "M1");
    assert_eq!(record.info.product_codes, vec!["P1".to_string(), "P2".to_string()]);
    assert_eq!(record.info.message_id, d.message_id);
    assert_eq!(f.repo.for_subject("order_o-1", f.clock.now()).await.unwrap(), vec![record]);
}

#[tokio::test]
async fn redelivery_is_not_deduplicated() {
    let f = fixture();
    let d = delivery(OrderEventType::Created, "o-1").await;
    f.recorder.record(&d).await.unwrap();
    f.recorder.record(&d).await.unwrap();
    assert_eq!(f.repo.all().await.len(), 2);

    f.clock.advance(Duration::milliseconds(5));
    f.recorder.record(&d).await.unwrap();
    assert_eq!(f.repo.all().await.len(), 3);
}

#[tokio::test]
async fn redelivery_within_one_batch_keeps_both_rows() {
    let repo = Arc::new(InMemoryAuditRepository::default());
    let recorder = AuditRecorder::new(repo.clone(), Arc::new(SystemClock), ConsumerMetrics::new("audit").unwrap());
    let d = delivery(OrderEventType::Created, "o-1").await;

    let outcomes = recorder.record_batch(&[d.clone(), d.clone()]).await;
    assert!(outcomes.iter().all(|o| o.is_ok()));
    let rows = repo.for_subject("order_o-1", Utc::now()).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_ne!(rows[0].sort_key, rows[1].sort_key);
    assert!(rows.iter().all(|r| r.sort_key.starts_with("ORDER_CREATED#") && r.info.message_id == d.message_id));
}

#[tokio::test]
async fn stored_rows_are_never_overwritten() {
    let f = fixture();
    let first = f.recorder.record(&delivery(OrderEventType::Created, "o-1").await).await.unwrap();
    let mut clash = first.clone();
    clash.email = "other@x.com".into();
    f.repo.put(&clash).await.unwrap();
    let rows = f.repo.all().await;
    assert_eq!(rows, vec![first]);
}

#[tokio::test]
async fn expired_rows_are_hidden_before_the_sweep() {
    let f = fixture();
    f.recorder.record(&delivery(OrderEventType::Created, "o-1").await).await.unwrap();
    let later = f.clock.now() + Duration::seconds(300);
    assert!(f.repo.for_subject("order_o-1", later).await.unwrap().is_empty());
    assert_eq!(f.repo.all().await.len(), 1);
}

#[tokio::test]
async fn batch_failures_are_isolated() {
    let f = fixture();
    let good = delivery(OrderEventType::Created, "o-1").await;
    let bad = Delivery { message_id: "order-events-0-99".into(), attributes: BTreeMap::new(), body: "{not json".into() };
    let deleted = delivery(OrderEventType::Deleted, "o-2").await;

    let outcomes = f.recorder.record_batch(&[good, bad, deleted]).await;
    assert!(outcomes[0].is_ok());
    assert!(matches!(outcomes[1], Err(RecordError::Decode { .. })));
    assert_eq!(outcomes[2].as_ref().unwrap().event_type, OrderEventType::Deleted);
    assert_eq!(f.repo.all().await.len(), 2);
}

#[tokio::test]
async fn expired_rows_are_swept() {
    let f = fixture();
    f.recorder.record(&delivery(OrderEventType::Created, "o-1").await).await.unwrap();
    assert_eq!(sweep_once(f.repo.as_ref(), f.clock.as_ref(), &f.metrics).await.unwrap(), 0);

    f.clock.advance(Duration::seconds(301));
    f.recorder.record(&delivery(OrderEventType::Deleted, "o-1").await).await.unwrap();
    assert_eq!(sweep_once(f.repo.as_ref(), f.clock.as_ref(), &f.metrics).await.unwrap(), 1);
    let left = f.repo.for_subject("order_o-1", f.clock.now()).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].event_type, OrderEventType::Deleted);
    assert_eq!(f.metrics.expired_rows.get(), 1);
}

#[tokio::test]
async fn ops_endpoints_respond() {
    let f = fixture();
    f.recorder.record(&delivery(OrderEventType::Created, "o-1").await).await.unwrap();
    let app = ops_router(f.metrics.clone());
    let resp = app.clone().oneshot(Request::get("/healthz").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = app.oneshot(Request::get("/metrics").body(Body::empty()).unwrap()).await.unwrap();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("outcome=\"recorded\""));
}
