use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jobhub_storage::{JobStore, MemoryJobStore, PgJobStore};
use jobhub_sync::{maybe_build_scheduler, IngestConfig, IngestPipeline};
use jobhub_web::AppState;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "jobhub-cli")]
#[command(about = "Job board ingestion hub")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run every enabled connector once and reconcile into the store.
    Sync {
        /// Reconcile into an in-memory store instead of Postgres.
        #[arg(long)]
        dry_run: bool,
    },
    /// Apply pending database migrations.
    Migrate,
    /// Serve the HTTP API, with the cron scheduler when enabled.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,jobhub=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let cli = Cli::parse();
    let config = IngestConfig::from_env();

    match cli.command.unwrap_or(Commands::Sync { dry_run: false }) {
        Commands::Sync { dry_run } => {
            let store: Arc<dyn JobStore> = if dry_run {
                Arc::new(MemoryJobStore::new())
            } else {
                Arc::new(connect(&config).await?)
            };
            let pipeline = IngestPipeline::from_config(&config, store)?;
            let summary = pipeline.run_once().await;
            println!(
                "sync complete: fetched={} inserted={} updated={} skipped={}{}",
                summary.fetched_count,
                summary.counts.inserted_count,
                summary.counts.updated_count,
                summary.counts.skipped_count,
                if dry_run { " (dry run)" } else { "" }
            );
        }
        Commands::Migrate => {
            connect(&config).await?;
            println!("migrations applied");
        }
        Commands::Serve => {
            let store = connect(&config).await?;
            let pipeline = Arc::new(IngestPipeline::from_config(&config, Arc::new(store))?);
            info!(connectors = ?pipeline.connector_ids(), "pipeline ready");

            let scheduler = maybe_build_scheduler(&config, pipeline.clone()).await?;
            if let Some(sched) = &scheduler {
                sched.start().await.context("starting scheduler")?;
                info!(cron = %config.sync_cron, "scheduler started");
            }

            jobhub_web::serve(AppState::new(pipeline, &config), config.web_port).await?;
        }
    }

    Ok(())
}

async fn connect(config: &IngestConfig) -> Result<PgJobStore> {
    let store = PgJobStore::connect(&config.database_url)
        .await
        .context("connecting to database")?;
    store.migrate().await.context("running migrations")?;
    Ok(store)
}
