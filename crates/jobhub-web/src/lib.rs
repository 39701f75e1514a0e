//! Axum HTTP surface: bootstrap trigger, webhook ingestion, job listing, health.

pub mod webhook;

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use jobhub_core::{CanonicalJob, JobLevel, JobSource};
use jobhub_storage::JobQuery;
use jobhub_sync::{BatchSummary, IngestConfig, IngestPipeline, IngestSummary};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{info, warn};
use uuid::Uuid;

use crate::webhook::{ValidationIssue, WebhookPayload};

pub const CRATE_NAME: &str = "jobhub-web";

pub const DEFAULT_LIST_LIMIT: usize = 20;
pub const MAX_LIST_LIMIT: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestPipeline>,
    pub bootstrap_secret: Option<String>,
    pub webhook_secrets: Vec<String>,
}

impl AppState {
    pub fn new(pipeline: Arc<IngestPipeline>, config: &IngestConfig) -> Self {
        Self {
            pipeline,
            bootstrap_secret: config.bootstrap_secret.clone(),
            webhook_secrets: config.webhook_secrets(),
        }
    }
}

#[derive(Debug, Serialize)]
struct BootstrapResponse {
    message: &'static str,
    #[serde(flatten)]
    summary: IngestSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookResponse {
    message: &'static str,
    run_id: Option<String>,
    #[serde(flatten)]
    summary: BatchSummary,
}

#[derive(Debug, Serialize)]
struct InvalidPayload {
    error: &'static str,
    details: Vec<ValidationIssue>,
}

/// Public projection of a stored job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobItem {
    pub id: Uuid,
    pub title: String,
    pub company_name: String,
    pub level: JobLevel,
    pub stack: Vec<String>,
    pub location: Option<String>,
    pub is_remote: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub source: JobSource,
    pub source_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<CanonicalJob> for JobItem {
    fn from(job: CanonicalJob) -> Self {
        Self {
            id: job.id,
            title: job.title,
            company_name: job.company_name,
            level: job.level,
            stack: job.stack,
            location: job.location,
            is_remote: job.is_remote,
            published_at: job.published_at,
            source: job.source,
            source_url: job.source_url,
            created_at: job.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct JobList {
    items: Vec<JobItem>,
    count: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct JobListParams {
    pub level: Option<String>,
    pub source: Option<String>,
    pub remote: Option<String>,
    pub q: Option<String>,
    pub limit: Option<String>,
}

impl JobListParams {
    /// Unknown enum values and unrecognized `remote` values drop the filter.
    pub fn to_query(&self) -> JobQuery {
        JobQuery {
            level: self.level.as_deref().and_then(|v| v.parse().ok()),
            source: self.source.as_deref().and_then(|v| v.parse().ok()),
            remote: match self.remote.as_deref() {
                Some("true") => Some(true),
                Some("false") => Some(false),
                _ => None,
            },
            text: self
                .q
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string),
            limit: parse_limit(self.limit.as_deref()),
        }
    }
}

/// Missing or non-numeric falls back to the default; numbers clamp to 1..=100.
pub fn parse_limit(value: Option<&str>) -> usize {
    let Some(value) = value else {
        return DEFAULT_LIST_LIMIT;
    };
    let trimmed = value.trim();
    let raw = if trimmed.is_empty() {
        0.0
    } else {
        match trimmed.parse::<f64>() {
            Ok(n) if !n.is_nan() => n,
            _ => return DEFAULT_LIST_LIMIT,
        }
    };
    raw.clamp(1.0, MAX_LIST_LIMIT as f64) as usize
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/jobs", get(list_jobs_handler))
        .route("/api/jobs/bootstrap", post(bootstrap_handler))
        .route("/api/jobs/webhook", post(webhook_handler))
        .with_state(Arc::new(state))
}

pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "http server listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn health_handler() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

async fn list_jobs_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<JobListParams>,
) -> Response {
    let query = params.to_query();
    match state.pipeline.store().list_jobs(&query).await {
        Ok(jobs) => {
            let items: Vec<JobItem> = jobs.into_iter().map(JobItem::from).collect();
            Json(JobList {
                count: items.len(),
                items,
            })
            .into_response()
        }
        Err(err) => {
            warn!(error = %err, "listing jobs failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Falha ao consultar vagas.")
        }
    }
}

async fn bootstrap_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(secret) = state.bootstrap_secret.as_deref() else {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "JOBS_BOOTSTRAP_SECRET não está configurado.",
        );
    };
    if header_value(&headers, "x-bootstrap-secret") != Some(secret) {
        return error_response(StatusCode::UNAUTHORIZED, "Não autorizado.");
    }

    let summary = state.pipeline.run_once().await;
    Json(BootstrapResponse {
        message: "Bootstrap executado com sucesso.",
        summary,
    })
    .into_response()
}

async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if state.webhook_secrets.is_empty() {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Nenhum segredo para webhook está configurado (JOBS_WEBHOOK_SECRET/JOBS_BOOTSTRAP_SECRET).",
        );
    }
    let provided = header_value(&headers, "x-webhook-secret").or_else(|| {
        header_value(&headers, header::AUTHORIZATION.as_str())
            .map(|v| v.strip_prefix("Bearer ").unwrap_or(v))
    });
    if !provided.is_some_and(|p| state.webhook_secrets.iter().any(|s| s == p)) {
        return error_response(StatusCode::UNAUTHORIZED, "Não autorizado.");
    }

    let payload = match WebhookPayload::parse(&body) {
        Ok(payload) => payload,
        Err(details) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(InvalidPayload {
                    error: "Payload inválido para webhook de vagas.",
                    details,
                }),
            )
                .into_response()
        }
    };

    let connectors: Vec<&str> = payload
        .jobs
        .iter()
        .filter_map(|job| job.connector_name.as_deref())
        .collect();
    info!(
        run_id = payload.run_id.as_deref().unwrap_or("-"),
        sent_at = payload.sent_at.as_deref().unwrap_or("-"),
        jobs = payload.jobs.len(),
        ?connectors,
        "webhook batch received"
    );

    let run_id = payload.run_id.clone();
    let summary = state.pipeline.ingest_batch(&payload.into_raw_jobs()).await;
    Json(WebhookResponse {
        message: "Webhook processado com sucesso.",
        run_id,
        summary,
    })
    .into_response()
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
