use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobhub_core::{CanonicalJob, JobSource, NormalizedJob};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::store::{JobQuery, JobStore, StoreError, UpsertOutcome};

const JOB_COLUMNS: &str = "id, fingerprint, source, external_id, title, company_name, level, \
     stack, location, is_remote, published_at, source_url, last_seen_at, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    fingerprint: String,
    source: String,
    external_id: Option<String>,
    title: String,
    company_name: String,
    level: String,
    stack: Vec<String>,
    location: Option<String>,
    is_remote: bool,
    published_at: Option<DateTime<Utc>>,
    source_url: String,
    last_seen_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for CanonicalJob {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(CanonicalJob {
            id: row.id,
            fingerprint: row.fingerprint,
            source: row
                .source
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("job {}: {e}", row.id)))?,
            external_id: row.external_id,
            title: row.title,
            company_name: row.company_name,
            level: row
                .level
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("job {}: {e}", row.id)))?,
            stack: row.stack,
            location: row.location,
            is_remote: row.is_remote,
            published_at: row.published_at,
            source_url: row.source_url,
            last_seen_at: row.last_seen_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn find_id_by_external_id(
        &self,
        source: JobSource,
        external_id: &str,
    ) -> Result<Option<Uuid>, StoreError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM jobs WHERE source = $1 AND external_id = $2",
        )
        .bind(source.as_str())
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update_by_id(
        &self,
        id: Uuid,
        job: &NormalizedJob,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
               SET title = $2,
                   company_name = $3,
                   level = $4,
                   stack = $5,
                   location = $6,
                   is_remote = $7,
                   published_at = $8,
                   source_url = $9,
                   last_seen_at = $10,
                   updated_at = $10
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&job.title)
        .bind(&job.company_name)
        .bind(job.level.as_str())
        .bind(&job.stack)
        .bind(&job.location)
        .bind(job.is_remote)
        .bind(job.published_at)
        .bind(&job.source_url)
        .bind(seen_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn upsert_by_fingerprint(
        &self,
        job: &NormalizedJob,
        seen_at: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StoreError> {
        // xmax is zero only for a freshly inserted tuple.
        let inserted = sqlx::query_scalar::<_, bool>(
            r#"
            INSERT INTO jobs (
                id, fingerprint, source, external_id, title, company_name, level,
                stack, location, is_remote, published_at, source_url,
                last_seen_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13, $13)
            ON CONFLICT (fingerprint) DO UPDATE
               SET title = EXCLUDED.title,
                   company_name = EXCLUDED.company_name,
                   level = EXCLUDED.level,
                   stack = EXCLUDED.stack,
                   location = EXCLUDED.location,
                   is_remote = EXCLUDED.is_remote,
                   published_at = EXCLUDED.published_at,
                   source_url = EXCLUDED.source_url,
                   last_seen_at = EXCLUDED.last_seen_at,
                   updated_at = EXCLUDED.updated_at
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&job.fingerprint)
        .bind(job.source.as_str())
        .bind(&job.external_id)
        .bind(&job.title)
        .bind(&job.company_name)
        .bind(job.level.as_str())
        .bind(&job.stack)
        .bind(&job.location)
        .bind(job.is_remote)
        .bind(job.published_at)
        .bind(&job.source_url)
        .bind(seen_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }

    async fn list_jobs(&self, query: &JobQuery) -> Result<Vec<CanonicalJob>, StoreError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {JOB_COLUMNS} FROM jobs WHERE TRUE"));

        if let Some(level) = query.level {
            qb.push(" AND level = ").push_bind(level.as_str());
        }
        if let Some(source) = query.source {
            qb.push(" AND source = ").push_bind(source.as_str());
        }
        if let Some(remote) = query.remote {
            qb.push(" AND is_remote = ").push_bind(remote);
        }
        if let Some(text) = query.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = like_pattern(text);
            qb.push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR company_name ILIKE ")
                .push_bind(pattern)
                .push(" OR ")
                .push_bind(text.to_lowercase())
                .push(" = ANY(stack))");
        }
        qb.push(" ORDER BY published_at DESC NULLS LAST, created_at DESC LIMIT ")
            .push_bind(query.limit as i64);

        let rows = qb.build_query_as::<JobRow>().fetch_all(&self.pool).await?;
        rows.into_iter().map(CanonicalJob::try_from).collect()
    }
}
