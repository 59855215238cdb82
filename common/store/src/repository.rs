use async_trait::async_trait;

use crate::{CinemaInfo, MovieSession, Product, StoreResult};

/// Product catalog access. `get_many` returns only the records that exist,
/// in the order their ids were requested; callers compare counts.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn get(&self, id: &str) -> StoreResult<Product>;
    async fn get_many(&self, ids: &[String]) -> StoreResult<Vec<Product>>;
    async fn list(&self) -> StoreResult<Vec<Product>>;
    async fn create(&self, product: Product) -> StoreResult<Product>;
    /// Conditional on the record existing; `NotFound` otherwise. Returns the whole
    /// stored record, not just the changed attributes.
    async fn update(&self, product: Product) -> StoreResult<Product>;
    /// Returns the deleted record; `NotFound` when absent.
    async fn delete(&self, id: &str) -> StoreResult<Product>;
}

#[async_trait]
pub trait MovieRepository: Send + Sync {
    async fn get(&self, id: &str) -> StoreResult<MovieSession>;
    async fn list(&self) -> StoreResult<Vec<MovieSession>>;
    async fn create(&self, movie: MovieSession) -> StoreResult<MovieSession>;
    /// Full-record write conditional on existence, returning the stored record.
    /// Used for seat-map changes.
    async fn update(&self, movie: MovieSession) -> StoreResult<MovieSession>;
    async fn delete(&self, id: &str) -> StoreResult<MovieSession>;
}

#[async_trait]
pub trait InfoRepository: Send + Sync {
    async fn get(&self, id: &str) -> StoreResult<CinemaInfo>;
    async fn list(&self) -> StoreResult<Vec<CinemaInfo>>;
    async fn create(&self, info: CinemaInfo) -> StoreResult<CinemaInfo>;
    /// Same contract as [`ProductRepository::update`].
    async fn update(&self, info: CinemaInfo) -> StoreResult<CinemaInfo>;
    async fn delete(&self, id: &str) -> StoreResult<CinemaInfo>;
}
