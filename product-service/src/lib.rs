pub mod app;
pub mod catalog_handlers;
pub mod config;

pub use app::{build_router, AppState, SERVICE_NAME};
