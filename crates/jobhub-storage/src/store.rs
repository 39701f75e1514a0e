use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobhub_core::{CanonicalJob, JobLevel, JobSource, NormalizedJob};
use thiserror::Error;
use uuid::Uuid;

pub const FINGERPRINT_CONSTRAINT: &str = "jobs_fingerprint_key";
pub const EXTERNAL_ID_CONSTRAINT: &str = "jobs_source_external_id_key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint {constraint} violated")]
    Conflict { constraint: String },
    #[error("job {0} not found")]
    NotFound(Uuid),
    #[error("stored row is not a valid job: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Database(sqlx::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StoreError::Conflict {
                    constraint: db.constraint().unwrap_or("unknown").to_string(),
                };
            }
        }
        StoreError::Database(err)
    }
}

/// Read filter for the canonical job list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobQuery {
    pub level: Option<JobLevel>,
    pub source: Option<JobSource>,
    pub remote: Option<bool>,
    /// Case-insensitive title/company match, or an exact stack token.
    pub text: Option<String>,
    pub limit: usize,
}

impl Default for JobQuery {
    fn default() -> Self {
        Self {
            level: None,
            source: None,
            remote: None,
            text: None,
            limit: 20,
        }
    }
}

/// Per-record lookups and writes against the canonical job table.
///
/// Implementations enforce two unique keys: `fingerprint`, and
/// `(source, external_id)` whenever `external_id` is present.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn find_id_by_external_id(
        &self,
        source: JobSource,
        external_id: &str,
    ) -> Result<Option<Uuid>, StoreError>;

    /// Overwrite mutable fields of an existing row and refresh `last_seen_at`.
    async fn update_by_id(
        &self,
        id: Uuid,
        job: &NormalizedJob,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Atomic create-or-refresh keyed on `fingerprint`.
    async fn upsert_by_fingerprint(
        &self,
        job: &NormalizedJob,
        seen_at: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Newest first: `published_at` descending (nulls last), then `created_at`.
    async fn list_jobs(&self, query: &JobQuery) -> Result<Vec<CanonicalJob>, StoreError>;
}
