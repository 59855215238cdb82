pub mod app;
pub mod config;
pub mod models;
pub mod order_handlers;
pub mod order_repo;
pub mod saga;
pub mod seats;

pub use app::{build_router, AppState};
pub use saga::{OrderSaga, SagaError, SagaPorts, SagaStep};
