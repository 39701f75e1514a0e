use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobhub_core::{CanonicalJob, JobSource, NormalizedJob};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::store::{
    JobQuery, JobStore, StoreError, UpsertOutcome, EXTERNAL_ID_CONSTRAINT,
};

/// Process-local store with the same unique-key rules as the Postgres table.
/// Backs dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: Mutex<Vec<CanonicalJob>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn jobs(&self) -> Vec<CanonicalJob> {
        self.jobs.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }
}

fn external_id_taken(jobs: &[CanonicalJob], source: JobSource, external_id: &str) -> bool {
    jobs.iter()
        .any(|j| j.source == source && j.external_id.as_deref() == Some(external_id))
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn find_id_by_external_id(
        &self,
        source: JobSource,
        external_id: &str,
    ) -> Result<Option<Uuid>, StoreError> {
        let jobs = self.jobs.lock().await;
        Ok(jobs
            .iter()
            .find(|j| j.source == source && j.external_id.as_deref() == Some(external_id))
            .map(|j| j.id))
    }

    async fn update_by_id(
        &self,
        id: Uuid,
        job: &NormalizedJob,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().await;
        let existing = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or(StoreError::NotFound(id))?;
        existing.refresh_from(job, seen_at);
        Ok(())
    }

    async fn upsert_by_fingerprint(
        &self,
        job: &NormalizedJob,
        seen_at: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut jobs = self.jobs.lock().await;
        if let Some(existing) = jobs.iter_mut().find(|j| j.fingerprint == job.fingerprint) {
            existing.refresh_from(job, seen_at);
            return Ok(UpsertOutcome::Updated);
        }

        if let Some(external_id) = job.external_id.as_deref() {
            if external_id_taken(&jobs, job.source, external_id) {
                return Err(StoreError::Conflict {
                    constraint: EXTERNAL_ID_CONSTRAINT.to_string(),
                });
            }
        }

        jobs.push(CanonicalJob::from_normalized(job, seen_at));
        Ok(UpsertOutcome::Inserted)
    }

    async fn list_jobs(&self, query: &JobQuery) -> Result<Vec<CanonicalJob>, StoreError> {
        let jobs = self.jobs.lock().await;
        let text = query
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);
        let mut out = jobs
            .iter()
            .filter(|j| query.level.map_or(true, |level| j.level == level))
            .filter(|j| query.source.map_or(true, |source| j.source == source))
            .filter(|j| query.remote.map_or(true, |remote| j.is_remote == remote))
            .filter(|j| match &text {
                Some(needle) => {
                    j.title.to_lowercase().contains(needle)
                        || j.company_name.to_lowercase().contains(needle)
                        || j.stack.iter().any(|s| s == needle)
                }
                None => true,
            })
            .cloned()
            .collect::<Vec<_>>();

        // `None < Some(_)`, so reversing puts undated rows last.
        out.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        out.truncate(query.limit);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use jobhub_core::{fingerprint, JobLevel};

    fn job(title: &str, url: &str, external_id: Option<&str>) -> NormalizedJob {
        NormalizedJob {
            title: title.to_string(),
            company_name: "Acme".into(),
            level: JobLevel::Junior,
            stack: vec!["react".into()],
            location: Some("Remoto".into()),
            is_remote: true,
            published_at: None,
            source: JobSource::Other,
            source_url: url.to_string(),
            external_id: external_id.map(ToString::to_string),
            fingerprint: fingerprint(title, "Acme", url),
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, hour, 0, 0).single().unwrap()
    }

    #[tokio::test]
    async fn upsert_inserts_once_then_refreshes() {
        let store = MemoryJobStore::new();
        let candidate = job("Dev React", "https://a.example/1", None);

        assert_eq!(
            store.upsert_by_fingerprint(&candidate, at(8)).await.unwrap(),
            UpsertOutcome::Inserted
        );
        assert_eq!(
            store.upsert_by_fingerprint(&candidate, at(9)).await.unwrap(),
            UpsertOutcome::Updated
        );

        let jobs = store.jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].created_at, at(8));
        assert_eq!(jobs[0].last_seen_at, at(9));
    }

    #[tokio::test]
    async fn duplicate_external_id_with_new_fingerprint_conflicts() {
        let store = MemoryJobStore::new();
        store
            .upsert_by_fingerprint(&job("Dev React", "https://a.example/1", Some("x-1")), at(8))
            .await
            .unwrap();

        let err = store
            .upsert_by_fingerprint(&job("Dev React II", "https://a.example/1", Some("x-1")), at(9))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn update_by_id_keeps_identity_keys() {
        let store = MemoryJobStore::new();
        let original = job("Dev React", "https://a.example/1", Some("x-1"));
        store.upsert_by_fingerprint(&original, at(8)).await.unwrap();
        let id = store
            .find_id_by_external_id(JobSource::Other, "x-1")
            .await
            .unwrap()
            .unwrap();

        let edited = job("Dev React (edited)", "https://a.example/1", Some("x-1"));
        store.update_by_id(id, &edited, at(10)).await.unwrap();

        let stored = &store.jobs().await[0];
        assert_eq!(stored.title, "Dev React (edited)");
        assert_eq!(stored.fingerprint, original.fingerprint);
        assert_eq!(stored.updated_at, at(10));

        let missing = store.update_by_id(Uuid::new_v4(), &edited, at(11)).await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_filters_and_orders_newest_first() {
        let store = MemoryJobStore::new();
        let mut old = job("Dev Python", "https://a.example/1", None);
        old.published_at = Some(at(1));
        let mut new = job("Dev React", "https://a.example/2", None);
        new.published_at = Some(at(5));
        let mut onsite = job("Dev Node", "https://a.example/3", None);
        onsite.is_remote = false;
        onsite.stack = vec!["node".into()];
        for j in [&old, &new, &onsite] {
            store.upsert_by_fingerprint(j, at(12)).await.unwrap();
        }

        let all = store.list_jobs(&JobQuery::default()).await.unwrap();
        let titles = all.iter().map(|j| j.title.as_str()).collect::<Vec<_>>();
        assert_eq!(titles, vec!["Dev React", "Dev Python", "Dev Node"]);

        let remote = store
            .list_jobs(&JobQuery {
                remote: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(remote.len(), 1);

        let by_stack = store
            .list_jobs(&JobQuery {
                text: Some("NODE".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_stack[0].title, "Dev Node");

        let padded = store
            .list_jobs(&JobQuery {
                text: Some("  node \t".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(padded.len(), 1);
        assert_eq!(padded[0].title, "Dev Node");

        let blank = store
            .list_jobs(&JobQuery {
                text: Some("   ".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(blank.len(), 3);

        let limited = store
            .list_jobs(&JobQuery {
                limit: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }
}
