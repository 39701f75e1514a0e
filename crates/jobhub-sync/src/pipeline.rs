use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures::future::join_all;
use jobhub_adapters::{connector_for, ConnectorId, SourceConnector};
use jobhub_core::RawSourceJob;
use jobhub_storage::{HttpClientConfig, HttpFetcher, JobStore};
use serde::Serialize;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, info_span, warn, Instrument};

use crate::config::IngestConfig;
use crate::reconcile::{ReconcileCounts, Reconciler};

/// Result of one orchestrated run over every enabled connector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub fetched_count: usize,
    #[serde(flatten)]
    pub counts: ReconcileCounts,
}

/// Result of reconciling an externally supplied batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub received_count: usize,
    #[serde(flatten)]
    pub counts: ReconcileCounts,
}

pub struct IngestPipeline {
    connectors: Vec<Box<dyn SourceConnector>>,
    http: HttpFetcher,
    reconciler: Reconciler,
}

impl IngestPipeline {
    pub fn new(
        connectors: Vec<Box<dyn SourceConnector>>,
        http: HttpFetcher,
        store: Arc<dyn JobStore>,
    ) -> Self {
        Self {
            connectors,
            http,
            reconciler: Reconciler::new(store),
        }
    }

    /// Enabled connectors from `config.toggles`, sharing one HTTP client.
    pub fn from_config(config: &IngestConfig, store: Arc<dyn JobStore>) -> Result<Self> {
        let http = HttpFetcher::new(HttpClientConfig {
            timeout: Duration::from_secs(config.http_timeout_secs),
            user_agent: Some(config.user_agent.clone()),
            ..Default::default()
        })
        .context("building http client")?;
        let settings = config.connector_settings();
        let connectors = config
            .toggles
            .enabled_ids()
            .into_iter()
            .map(|id| connector_for(id, &settings))
            .collect();
        Ok(Self::new(connectors, http, store))
    }

    pub fn connector_ids(&self) -> Vec<ConnectorId> {
        self.connectors.iter().map(|c| c.id()).collect()
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        self.reconciler.store()
    }

    /// Fan out to every connector and concatenate what came back. A failed
    /// connector contributes nothing.
    pub async fn collect(&self) -> Vec<RawSourceJob> {
        let fetches = self.connectors.iter().map(|connector| {
            let id = connector.id();
            async move {
                let started = Instant::now();
                match connector.fetch(&self.http).await {
                    Ok(jobs) => {
                        info!(
                            count = jobs.len(),
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "connector finished"
                        );
                        jobs
                    }
                    Err(err) => {
                        warn!(error = %err, "connector failed, contributing no jobs");
                        Vec::new()
                    }
                }
            }
            .instrument(info_span!("connector", connector = %id, kind = ?connector.kind()))
        });

        join_all(fetches).await.into_iter().flatten().collect()
    }

    /// Records are reconciled one at a time, in connector order.
    pub async fn run_once(&self) -> IngestSummary {
        let raw_jobs = self.collect().await;
        let mut summary = IngestSummary {
            fetched_count: raw_jobs.len(),
            ..Default::default()
        };
        for raw in &raw_jobs {
            summary.counts.record(self.reconciler.reconcile(raw).await);
        }

        info!(
            fetched = summary.fetched_count,
            reconciled = summary.counts.total(),
            inserted = summary.counts.inserted_count,
            updated = summary.counts.updated_count,
            skipped = summary.counts.skipped_count,
            "ingestion run complete"
        );
        summary
    }

    pub async fn ingest_batch(&self, jobs: &[RawSourceJob]) -> BatchSummary {
        let mut summary = BatchSummary {
            received_count: jobs.len(),
            ..Default::default()
        };
        for raw in jobs {
            summary.counts.record(self.reconciler.reconcile(raw).await);
        }
        info!(
            received = summary.received_count,
            inserted = summary.counts.inserted_count,
            updated = summary.counts.updated_count,
            skipped = summary.counts.skipped_count,
            "batch ingested"
        );
        summary
    }
}

/// Cron job that runs the pipeline. `None` when the scheduler is disabled.
pub async fn maybe_build_scheduler(
    config: &IngestConfig,
    pipeline: Arc<IngestPipeline>,
) -> Result<Option<JobScheduler>> {
    if !config.scheduler_enabled {
        return Ok(None);
    }

    let sched = JobScheduler::new().await.context("creating scheduler")?;
    let cron = config.sync_cron.as_str();
    let job = Job::new_async(cron, move |_uuid, _l| {
        let pipeline = pipeline.clone();
        Box::pin(async move {
            info!("scheduled ingestion triggered");
            pipeline.run_once().await;
        })
    })
    .with_context(|| format!("creating scheduler job for cron {cron}"))?;
    sched.add(job).await.context("adding scheduler job")?;
    Ok(Some(sched))
}
