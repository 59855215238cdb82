use async_trait::async_trait;
use bigdecimal::BigDecimal;
use common_money::Money;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::{Chair, CinemaInfo, InfoRepository, MovieRepository, MovieSession, Product, ProductRepository, StoreError, StoreResult};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: String,
    code: String,
    name: String,
    price: BigDecimal,
    model: Option<String>,
    url: Option<String>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Product { id: r.id, code: r.code, name: r.name, price: Money::new(r.price), model: r.model, url: r.url }
    }
}

#[derive(sqlx::FromRow)]
struct MovieRow {
    id: String,
    title: String,
    session: String,
    price: BigDecimal,
    category: Option<String>,
    poster: Option<String>,
    language: Option<String>,
    chairs: Json<Vec<Chair>>,
}

impl From<MovieRow> for MovieSession {
    fn from(r: MovieRow) -> Self {
        MovieSession {
            id: r.id,
            title: r.title,
            session: r.session,
            price: Money::new(r.price),
            category: r.category,
            poster: r.poster,
            language: r.language,
            chairs: r.chairs.0,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, code, name, price, model, url";
const MOVIE_COLUMNS: &str = "id, title, session, price, category, poster, language, chairs";
const INFO_COLUMNS: &str = "id, cinema_name, address, phone";

#[derive(Clone)]
pub struct PgProductRepository {
    db: PgPool,
}

impl PgProductRepository {
    pub fn new(db: PgPool) -> Self { Self { db } }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn get(&self, id: &str) -> StoreResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        row.map(Product::from).ok_or_else(|| StoreError::not_found("product", id))
    }

    async fn get_many(&self, ids: &[String]) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.db)
            .await?;
        let mut found: Vec<Product> = rows.into_iter().map(Product::from).collect();
        found.sort_by_key(|p| ids.iter().position(|id| id == &p.id).unwrap_or(usize::MAX));
        Ok(found)
    }

    async fn list(&self) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY code"))
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn create(&self, product: Product) -> StoreResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(product.price.amount())
        .bind(&product.model)
        .bind(&product.url)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn update(&self, product: Product) -> StoreResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET code = $2, name = $3, price = $4, model = $5, url = $6 WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(product.price.amount())
        .bind(&product.model)
        .bind(&product.url)
        .fetch_optional(&self.db)
        .await?;
        row.map(Product::from).ok_or_else(|| StoreError::not_found("product", product.id))
    }

    async fn delete(&self, id: &str) -> StoreResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("DELETE FROM products WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        row.map(Product::from).ok_or_else(|| StoreError::not_found("product", id))
    }
}

#[derive(Clone)]
pub struct PgMovieRepository {
    db: PgPool,
}

impl PgMovieRepository {
    pub fn new(db: PgPool) -> Self { Self { db } }
}

#[async_trait]
impl MovieRepository for PgMovieRepository {
    async fn get(&self, id: &str) -> StoreResult<MovieSession> {
        let row = sqlx::query_as::<_, MovieRow>(&format!("SELECT {MOVIE_COLUMNS} FROM movie_sessions WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        row.map(MovieSession::from).ok_or_else(|| StoreError::not_found("movie session", id))
    }

    async fn list(&self) -> StoreResult<Vec<MovieSession>> {
        let rows = sqlx::query_as::<_, MovieRow>(&format!("SELECT {MOVIE_COLUMNS} FROM movie_sessions ORDER BY session"))
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(MovieSession::from).collect())
    }

    async fn create(&self, movie: MovieSession) -> StoreResult<MovieSession> {
        let row = sqlx::query_as::<_, MovieRow>(&format!(
            "INSERT INTO movie_sessions ({MOVIE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {MOVIE_COLUMNS}"
        ))
        .bind(&movie.id)
        .bind(&movie.title)
        .bind(&movie.session)
        .bind(movie.price.amount())
        .bind(&movie.category)
        .bind(&movie.poster)
        .bind(&movie.language)
        .bind(Json(&movie.chairs))
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn update(&self, movie: MovieSession) -> StoreResult<MovieSession> {
        let row = sqlx::query_as::<_, MovieRow>(&format!(
            "UPDATE movie_sessions SET title = $2, session = $3, price = $4, category = $5, poster = $6, language = $7, chairs = $8 \
             WHERE id = $1 RETURNING {MOVIE_COLUMNS}"
        ))
        .bind(&movie.id)
        .bind(&movie.title)
        .bind(&movie.session)
        .bind(movie.price.amount())
        .bind(&movie.category)
        .bind(&movie.poster)
        .bind(&movie.language)
        .bind(Json(&movie.chairs))
        .fetch_optional(&self.db)
        .await?;
        row.map(MovieSession::from).ok_or_else(|| StoreError::not_found("movie session", movie.id))
    }

    async fn delete(&self, id: &str) -> StoreResult<MovieSession> {
        let row = sqlx::query_as::<_, MovieRow>(&format!("DELETE FROM movie_sessions WHERE id = $1 RETURNING {MOVIE_COLUMNS}"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        row.map(MovieSession::from).ok_or_else(|| StoreError::not_found("movie session", id))
    }
}

#[derive(sqlx::FromRow)]
struct InfoRow {
    id: String,
    cinema_name: String,
    address: String,
    phone: String,
}

impl From<InfoRow> for CinemaInfo {
    fn from(r: InfoRow) -> Self {
        CinemaInfo { id: r.id, cinema_name: r.cinema_name, address: r.address, phone: r.phone }
    }
}

#[derive(Clone)]
pub struct PgInfoRepository {
    db: PgPool,
}

impl PgInfoRepository {
    pub fn new(db: PgPool) -> Self { Self { db } }
}

#[async_trait]
impl InfoRepository for PgInfoRepository {
    async fn get(&self, id: &str) -> StoreResult<CinemaInfo> {
        let row = sqlx::query_as::<_, InfoRow>(&format!("SELECT {INFO_COLUMNS} FROM cinema_infos WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        row.map(CinemaInfo::from).ok_or_else(|| StoreError::not_found("cinema info", id))
    }

    async fn list(&self) -> StoreResult<Vec<CinemaInfo>> {
        let rows = sqlx::query_as::<_, InfoRow>(&format!("SELECT {INFO_COLUMNS} FROM cinema_infos ORDER BY cinema_name"))
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(CinemaInfo::from).collect())
    }

    async fn create(&self, info: CinemaInfo) -> StoreResult<CinemaInfo> {
        let row = sqlx::query_as::<_, InfoRow>(&format!(
            "INSERT INTO cinema_infos ({INFO_COLUMNS}) VALUES ($1, $2, $3, $4) RETURNING {INFO_COLUMNS}"
        ))
        .bind(&info.id)
        .bind(&info.cinema_name)
        .bind(&info.address)
        .bind(&info.phone)
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn update(&self, info: CinemaInfo) -> StoreResult<CinemaInfo> {
        let row = sqlx::query_as::<_, InfoRow>(&format!(
            "UPDATE cinema_infos SET cinema_name = $2, address = $3, phone = $4 WHERE id = $1 RETURNING {INFO_COLUMNS}"
        ))
        .bind(&info.id)
        .bind(&info.cinema_name)
        .bind(&info.address)
        .bind(&info.phone)
        .fetch_optional(&self.db)
        .await?;
        row.map(CinemaInfo::from).ok_or_else(|| StoreError::not_found("cinema info", info.id))
    }

    async fn delete(&self, id: &str) -> StoreResult<CinemaInfo> {
        let row = sqlx::query_as::<_, InfoRow>(&format!("DELETE FROM cinema_infos WHERE id = $1 RETURNING {INFO_COLUMNS}"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        row.map(CinemaInfo::from).ok_or_else(|| StoreError::not_found("cinema info", id))
    }
}
