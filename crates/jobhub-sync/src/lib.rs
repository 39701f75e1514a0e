//! Ingestion orchestration: configuration, reconciliation against the job
//! store, the multi-connector run and its cron schedule.

pub mod config;
pub mod pipeline;
pub mod reconcile;

pub use config::{ConnectorToggles, IngestConfig};
pub use pipeline::{maybe_build_scheduler, BatchSummary, IngestPipeline, IngestSummary};
pub use reconcile::{ReconcileCounts, ReconcileOutcome, Reconciler};

pub const CRATE_NAME: &str = "jobhub-sync";
