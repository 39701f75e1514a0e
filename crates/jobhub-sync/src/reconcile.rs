use std::sync::Arc;

use chrono::{DateTime, Utc};
use jobhub_core::{normalize_job, NormalizedJob, RawSourceJob};
use jobhub_storage::{JobStore, StoreError, UpsertOutcome};
use serde::Serialize;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Inserted,
    Updated,
    Skipped,
}

/// Running totals over reconciled records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileCounts {
    pub inserted_count: usize,
    pub updated_count: usize,
    pub skipped_count: usize,
}

impl ReconcileCounts {
    pub fn record(&mut self, outcome: ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Inserted => self.inserted_count += 1,
            ReconcileOutcome::Updated => self.updated_count += 1,
            ReconcileOutcome::Skipped => self.skipped_count += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.inserted_count + self.updated_count + self.skipped_count
    }
}

/// Maps one incoming record onto the store: external id first, then the
/// fingerprint upsert.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn JobStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub async fn reconcile(&self, raw: &RawSourceJob) -> ReconcileOutcome {
        self.reconcile_at(raw, Utc::now()).await
    }

    /// Store failures are logged and counted as skipped; nothing propagates.
    pub async fn reconcile_at(&self, raw: &RawSourceJob, seen_at: DateTime<Utc>) -> ReconcileOutcome {
        let Some(job) = normalize_job(raw) else {
            debug!(source_url = %raw.source_url, title = %raw.title, "skipping record with unusable source url");
            return ReconcileOutcome::Skipped;
        };

        match self.write(&job, seen_at).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(
                    fingerprint = %job.fingerprint,
                    external_id = job.external_id.as_deref().unwrap_or("-"),
                    error = %err,
                    "store write failed"
                );
                ReconcileOutcome::Skipped
            }
        }
    }

    async fn write(
        &self,
        job: &NormalizedJob,
        seen_at: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, StoreError> {
        if let Some(outcome) = self.update_by_external_id(job, seen_at).await? {
            return Ok(outcome);
        }

        match self.store.upsert_by_fingerprint(job, seen_at).await {
            Ok(UpsertOutcome::Inserted) => Ok(ReconcileOutcome::Inserted),
            Ok(UpsertOutcome::Updated) => Ok(ReconcileOutcome::Updated),
            // Another writer claimed (source, external_id) between lookup and upsert.
            Err(err) if err.is_conflict() && job.external_id.is_some() => {
                warn!(error = %err, "fingerprint upsert conflicted, retrying by external id");
                self.update_by_external_id(job, seen_at).await?.ok_or(err)
            }
            Err(err) => Err(err),
        }
    }

    async fn update_by_external_id(
        &self,
        job: &NormalizedJob,
        seen_at: DateTime<Utc>,
    ) -> Result<Option<ReconcileOutcome>, StoreError> {
        let Some(external_id) = job.external_id.as_deref() else {
            return Ok(None);
        };
        let Some(id) = self
            .store
            .find_id_by_external_id(job.source, external_id)
            .await?
        else {
            return Ok(None);
        };
        self.store.update_by_id(id, job, seen_at).await?;
        Ok(Some(ReconcileOutcome::Updated))
    }
}
