use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common_events::OrderEventType;
use common_store::{StoreError, StoreResult};
use sqlx::types::Json;
use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::recorder::{AuditInfo, AuditRecord};

#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Insert-only: a stored row is never updated.
    async fn put(&self, record: &AuditRecord) -> StoreResult<()>;
    /// Rows for the subject that have not expired at `now`, ordered by sort key.
    async fn for_subject(&self, subject_key: &str, now: DateTime<Utc>) -> StoreResult<Vec<AuditRecord>>;
    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    subject_key: String,
    sort_key: String,
    expires_at: DateTime<Utc>,
    email: String,
    created_at: DateTime<Utc>,
    request_id: String,
    event_type: String,
    info: Json<AuditInfo>,
}

impl TryFrom<AuditRow> for AuditRecord {
    type Error = StoreError;

    fn try_from(r: AuditRow) -> Result<Self, Self::Error> {
        let event_type: OrderEventType = r.event_type.parse().map_err(|e| StoreError::Backend(format!("{e}")))?;
        Ok(AuditRecord {
            subject_key: r.subject_key,
            sort_key: r.sort_key,
            expires_at: r.expires_at,
            email: r.email,
            created_at: r.created_at,
            request_id: r.request_id,
            event_type,
            info: r.info.0,
        })
    }
}

#[derive(Clone)]
pub struct PgAuditRepository {
    db: PgPool,
}

impl PgAuditRepository {
    pub fn new(db: PgPool) -> Self { Self { db } }
}

#[async_trait]
impl AuditRepository for PgAuditRepository {
    async fn put(&self, record: &AuditRecord) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO audit_events (subject_key, sort_key, expires_at, email, created_at, request_id, event_type, info)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               ON CONFLICT (subject_key, sort_key) DO NOTHING"#,
        )
        .bind(&record.subject_key)
        .bind(&record.sort_key)
        .bind(record.expires_at)
        .bind(&record.email)
        .bind(record.created_at)
        .bind(&record.request_id)
        .bind(record.event_type.as_str())
        .bind(Json(&record.info))
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn for_subject(&self, subject_key: &str, now: DateTime<Utc>) -> StoreResult<Vec<AuditRecord>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"SELECT subject_key, sort_key, expires_at, email, created_at, request_id, event_type, info
               FROM audit_events WHERE subject_key = $1 AND expires_at > $2 ORDER BY sort_key"#,
        )
        .bind(subject_key)
        .bind(now)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(AuditRecord::try_from).collect()
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let done = sqlx::query("DELETE FROM audit_events WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected())
    }
}

#[derive(Default)]
pub struct InMemoryAuditRepository {
    rows: RwLock<BTreeMap<(String, String), AuditRecord>>,
}

impl InMemoryAuditRepository {
    pub async fn all(&self) -> Vec<AuditRecord> { self.rows.read().await.values().cloned().collect() }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn put(&self, record: &AuditRecord) -> StoreResult<()> {
        self.rows
            .write()
            .await
            .entry((record.subject_key.clone(), record.sort_key.clone()))
            .or_insert_with(|| record.clone());
        Ok(())
    }

    async fn for_subject(&self, subject_key: &str, now: DateTime<Utc>) -> StoreResult<Vec<AuditRecord>> {
        let rows = self.rows.read().await;
        Ok(rows.values().filter(|r| r.subject_key == subject_key && r.expires_at > now).cloned().collect())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, r| r.expires_at > now);
        Ok((before - rows.len()) as u64)
    }
}
