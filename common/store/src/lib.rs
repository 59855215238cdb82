pub mod error;
pub mod memory;
pub mod models;
pub mod pg;
pub mod repository;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryInfoRepository, InMemoryMovieRepository, InMemoryProductRepository};
pub use models::{Chair, CinemaInfo, MovieSession, Product};
pub use pg::{PgInfoRepository, PgMovieRepository, PgProductRepository};
pub use repository::{InfoRepository, MovieRepository, ProductRepository};
