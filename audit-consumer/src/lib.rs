pub mod app;
pub mod config;
pub mod recorder;
pub mod repo;
pub mod sweeper;

pub use recorder::{build_record, AuditInfo, AuditRecord, AuditRecorder, RecordError};
pub use repo::{AuditRepository, InMemoryAuditRepository, PgAuditRepository};
