//! Remotive public API: one request returns the whole remote-job feed.

use async_trait::async_trait;
use jobhub_core::{JobSource, RawSourceJob, StackInput};
use jobhub_storage::HttpFetcher;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::classify::REMOTE_BOARD;
use crate::{
    decode_items, non_blank, ConnectorError, ConnectorId, ConnectorKind, FlexibleId,
    SourceConnector, JSON_HEADERS,
};

const DEFAULT_URL: &str = "https://remotive.com/api/remote-jobs";
pub const DEFAULT_LIMIT: usize = 150;

#[derive(Debug, Deserialize)]
struct RemotiveFeed {
    #[serde(default)]
    jobs: Option<Vec<JsonValue>>,
}

#[derive(Debug, Deserialize)]
struct RemotiveJob {
    id: FlexibleId,
    url: String,
    title: String,
    company_name: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    job_type: Option<String>,
    #[serde(default)]
    publication_date: Option<String>,
    #[serde(default)]
    candidate_required_location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RemotiveConnector {
    url: String,
    limit: usize,
}

impl Default for RemotiveConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl RemotiveConnector {
    pub fn new() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

#[async_trait]
impl SourceConnector for RemotiveConnector {
    fn id(&self) -> ConnectorId {
        ConnectorId::Remotive
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Api
    }

    async fn fetch(&self, http: &HttpFetcher) -> Result<Vec<RawSourceJob>, ConnectorError> {
        let body = http
            .get_text(self.id().as_str(), &self.url, JSON_HEADERS)
            .await?;
        parse_listing(&body, self.limit)
    }
}

pub fn parse_listing(body: &str, limit: usize) -> Result<Vec<RawSourceJob>, ConnectorError> {
    let feed: RemotiveFeed =
        serde_json::from_str(body).map_err(|e| ConnectorError::Parse(e.to_string()))?;

    Ok(decode_items::<RemotiveJob>(feed.jobs.unwrap_or_default())
        .into_iter()
        .filter(|job| {
            let text = format!(
                "{} {} {}",
                job.title,
                job.category.as_deref().unwrap_or_default(),
                job.tags.as_deref().unwrap_or_default().join(" ")
            );
            REMOTE_BOARD.is_relevant(&text)
        })
        .take(limit)
        .map(|job| {
            let stack_text = format!(
                "{} {}",
                job.title,
                job.tags.as_deref().unwrap_or_default().join(" ")
            );
            RawSourceJob {
                level: non_blank(job.job_type.as_deref()),
                stack: Some(StackInput::List(REMOTE_BOARD.extract_stack(&stack_text))),
                location: non_blank(job.candidate_required_location.as_deref())
                    .or_else(|| Some("Remoto".to_string())),
                is_remote: Some(true),
                published_at: non_blank(job.publication_date.as_deref()),
                source: Some(JobSource::Other),
                external_id: Some(format!("remotive-{}", job.id)),
                title: job.title,
                company_name: job.company_name,
                source_url: job.url,
            }
        })
        .collect())
}
