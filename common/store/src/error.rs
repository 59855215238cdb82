use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound { entity, id: id.into() }
    }

    pub fn is_not_found(&self) -> bool { matches!(self, StoreError::NotFound { .. }) }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self { StoreError::Backend(e.to_string()) }
}

pub type StoreResult<T> = Result<T, StoreError>;
