#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use common_events::{EventPublisher, EventSink, FixedClock, InMemoryTopic, PublishError};
use common_money::Money;
use common_observability::SagaMetrics;
use common_store::{
    Chair, InMemoryMovieRepository, InMemoryProductRepository, MovieRepository, MovieSession, Product, ProductRepository,
    StoreError, StoreResult,
};
use order_service::models::{ChairSelection, OrderRequest, PaymentType};
use order_service::order_repo::InMemoryOrderRepository;
use order_service::{OrderSaga, SagaPorts};

pub fn product(id: &str, cents: i64) -> Product {
    Product { id: id.into(), code: id.into(), name: format!("{id} snack"), price: Money::from_cents(cents), model: None, url: None }
}

pub fn movie_m1() -> MovieSession {
    MovieSession {
        id: "M1".into(),
        title: "Arrival".into(),
        session: "2024-05-01T20:00".into(),
        price: Money::from_cents(800),
        category: Some("sci-fi".into()),
        poster: None,
        language: Some("en".into()),
        chairs: ["A1", "A2", "A3", "A4"].into_iter().map(Chair::available).collect(),
    }
}

pub fn scenario_request() -> OrderRequest {
    OrderRequest {
        email: "a@x.com".into(),
        cpf: None,
        client_name: Some("Ana".into()),
        products_ids: vec!["P1".into(), "P2".into()],
        movie_id: "M1".into(),
        movie_chairs: vec![ChairSelection { id: "A1".into() }],
        payment: PaymentType::Pix,
    }
}

/// Delegates reads; updates fail while `fail_updates` is set.
pub struct FlakyMovies {
    pub inner: Arc<InMemoryMovieRepository>,
    pub fail_updates: AtomicBool,
}

#[async_trait]
impl MovieRepository for FlakyMovies {
    async fn get(&self, id: &str) -> StoreResult<MovieSession> { self.inner.get(id).await }
    async fn list(&self) -> StoreResult<Vec<MovieSession>> { self.inner.list().await }
    async fn create(&self, movie: MovieSession) -> StoreResult<MovieSession> { self.inner.create(movie).await }
    async fn update(&self, movie: MovieSession) -> StoreResult<MovieSession> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("conditional write rejected".into()));
        }
        self.inner.update(movie).await
    }
    async fn delete(&self, id: &str) -> StoreResult<MovieSession> { self.inner.delete(id).await }
}

/// Counts catalog reads so tests can assert none happened.
pub struct CountingProducts {
    pub inner: InMemoryProductRepository,
    pub reads: AtomicUsize,
}

#[async_trait]
impl ProductRepository for CountingProducts {
    async fn get(&self, id: &str) -> StoreResult<Product> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(id).await
    }
    async fn get_many(&self, ids: &[String]) -> StoreResult<Vec<Product>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_many(ids).await
    }
    async fn list(&self) -> StoreResult<Vec<Product>> { self.inner.list().await }
    async fn create(&self, p: Product) -> StoreResult<Product> { self.inner.create(p).await }
    async fn update(&self, p: Product) -> StoreResult<Product> { self.inner.update(p).await }
    async fn delete(&self, id: &str) -> StoreResult<Product> { self.inner.delete(id).await }
}

pub struct BrokenSink;

#[async_trait]
impl EventSink for BrokenSink {
    async fn send(&self, _key: &str, _attributes: &BTreeMap<String, String>, _body: &str) -> Result<String, PublishError> {
        Err(PublishError::Transport("broker unreachable".into()))
    }
}

pub struct Harness {
    pub saga: OrderSaga,
    pub orders: Arc<InMemoryOrderRepository>,
    pub products: Arc<CountingProducts>,
    pub movies: Arc<InMemoryMovieRepository>,
    pub flaky: Arc<FlakyMovies>,
    pub topic: Arc<InMemoryTopic>,
}

impl Harness {
    pub async fn chair_reserved(&self, chair: &str) -> bool {
        self.movies.get("M1").await.unwrap().chair(chair).map(|c| c.reserved).unwrap_or(false)
    }
}

pub fn harness() -> Harness { build(None) }

pub fn harness_with_sink(sink: Arc<dyn EventSink>) -> Harness { build(Some(sink)) }

fn build(sink: Option<Arc<dyn EventSink>>) -> Harness {
    let orders = Arc::new(InMemoryOrderRepository::default());
    let products = Arc::new(CountingProducts {
        inner: InMemoryProductRepository::with_products([product("P1", 1000), product("P2", 500), product("P3", 250)]),
        reads: AtomicUsize::new(0),
    });
    let movies = Arc::new(InMemoryMovieRepository::with_movies([movie_m1()]));
    let flaky = Arc::new(FlakyMovies { inner: movies.clone(), fail_updates: AtomicBool::new(false) });
    let topic = Arc::new(InMemoryTopic::new("order-events"));
    let sink: Arc<dyn EventSink> = sink.unwrap_or_else(|| topic.clone() as Arc<dyn EventSink>);
    let ports = SagaPorts {
        orders: orders.clone(),
        products: products.clone(),
        movies: flaky.clone(),
        publisher: EventPublisher::new(sink),
        clock: Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 18, 30, 0).unwrap())),
    };
    let saga = OrderSaga::new(ports, SagaMetrics::new().unwrap());
    Harness { saga, orders, products, movies, flaky, topic }
}
