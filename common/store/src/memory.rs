use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{CinemaInfo, InfoRepository, MovieRepository, MovieSession, Product, ProductRepository, StoreError, StoreResult};

/// Process-local catalog used by tests and local runs without a database.
#[derive(Default)]
pub struct InMemoryProductRepository {
    rows: RwLock<HashMap<String, Product>>,
}

impl InMemoryProductRepository {
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self { rows: RwLock::new(products.into_iter().map(|p| (p.id.clone(), p)).collect()) }
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn get(&self, id: &str) -> StoreResult<Product> {
        self.rows.read().await.get(id).cloned().ok_or_else(|| StoreError::not_found("product", id))
    }

    async fn get_many(&self, ids: &[String]) -> StoreResult<Vec<Product>> {
        let rows = self.rows.read().await;
        Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
    }

    async fn list(&self) -> StoreResult<Vec<Product>> {
        let mut all: Vec<Product> = self.rows.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(all)
    }

    async fn create(&self, product: Product) -> StoreResult<Product> {
        self.rows.write().await.insert(product.id.clone(), product.clone());
        Ok(product)
    }

    async fn update(&self, product: Product) -> StoreResult<Product> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&product.id) {
            Some(slot) => {
                *slot = product.clone();
                Ok(product)
            }
            None => Err(StoreError::not_found("product", product.id)),
        }
    }

    async fn delete(&self, id: &str) -> StoreResult<Product> {
        self.rows.write().await.remove(id).ok_or_else(|| StoreError::not_found("product", id))
    }
}

#[derive(Default)]
pub struct InMemoryMovieRepository {
    rows: RwLock<HashMap<String, MovieSession>>,
}

impl InMemoryMovieRepository {
    pub fn with_movies(movies: impl IntoIterator<Item = MovieSession>) -> Self {
        Self { rows: RwLock::new(movies.into_iter().map(|m| (m.id.clone(), m)).collect()) }
    }
}

#[async_trait]
impl MovieRepository for InMemoryMovieRepository {
    async fn get(&self, id: &str) -> StoreResult<MovieSession> {
        self.rows.read().await.get(id).cloned().ok_or_else(|| StoreError::not_found("movie session", id))
    }

    async fn list(&self) -> StoreResult<Vec<MovieSession>> {
        let mut all: Vec<MovieSession> = self.rows.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.session.cmp(&b.session));
        Ok(all)
    }

    async fn create(&self, movie: MovieSession) -> StoreResult<MovieSession> {
        self.rows.write().await.insert(movie.id.clone(), movie.clone());
        Ok(movie)
    }

    async fn update(&self, movie: MovieSession) -> StoreResult<MovieSession> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&movie.id) {
            Some(slot) => {
                *slot = movie.clone();
                Ok(movie)
            }
            None => Err(StoreError::not_found("movie session", movie.id)),
        }
    }

    async fn delete(&self, id: &str) -> StoreResult<MovieSession> {
        self.rows.write().await.remove(id).ok_or_else(|| StoreError::not_found("movie session", id))
    }
}

#[derive(Default)]
pub struct InMemoryInfoRepository {
    rows: RwLock<HashMap<String, CinemaInfo>>,
}

impl InMemoryInfoRepository {
    pub fn with_infos(infos: impl IntoIterator<Item = CinemaInfo>) -> Self {
        Self { rows: RwLock::new(infos.into_iter().map(|i| (i.id.clone(), i)).collect()) }
    }
}

#[async_trait]
impl InfoRepository for InMemoryInfoRepository {
    async fn get(&self, id: &str) -> StoreResult<CinemaInfo> {
        self.rows.read().await.get(id).cloned().ok_or_else(|| StoreError::not_found("cinema info", id))
    }

    async fn list(&self) -> StoreResult<Vec<CinemaInfo>> {
        let mut all: Vec<CinemaInfo> = self.rows.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.cinema_name.cmp(&b.cinema_name));
        Ok(all)
    }

    async fn create(&self, info: CinemaInfo) -> StoreResult<CinemaInfo> {
        self.rows.write().await.insert(info.id.clone(), info.clone());
        Ok(info)
    }

    async fn update(&self, info: CinemaInfo) -> StoreResult<CinemaInfo> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&info.id) {
            Some(slot) => {
                *slot = info.clone();
                Ok(info)
            }
            None => Err(StoreError::not_found("cinema info", info.id)),
        }
    }

    async fn delete(&self, id: &str) -> StoreResult<CinemaInfo> {
        self.rows.write().await.remove(id).ok_or_else(|| StoreError::not_found("cinema info", id))
    }
}
