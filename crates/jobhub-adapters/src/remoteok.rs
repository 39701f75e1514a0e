//! RemoteOK API. The feed is a JSON array whose first element is a legal
//! notice rather than a job.

use async_trait::async_trait;
use jobhub_core::{JobSource, RawSourceJob, StackInput};
use jobhub_storage::HttpFetcher;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::classify::REMOTE_BOARD;
use crate::{
    non_blank, ConnectorError, ConnectorId, ConnectorKind, FlexibleId, SourceConnector,
    JSON_HEADERS,
};

const DEFAULT_URL: &str = "https://remoteok.com/api";
pub const DEFAULT_LIMIT: usize = 120;

#[derive(Debug, Deserialize)]
struct RemoteOkJob {
    #[serde(default)]
    id: Option<FlexibleId>,
    #[serde(default)]
    position: Option<String>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RemoteOkConnector {
    url: String,
    limit: usize,
}

impl Default for RemoteOkConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteOkConnector {
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
impl SourceConnector for RemoteOkConnector {
    fn id(&self) -> ConnectorId {
        ConnectorId::RemoteOk
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
    let items: Vec<JsonValue> =
        serde_json::from_str(body).map_err(|e| ConnectorError::Parse(e.to_string()))?;

    Ok(items
        .into_iter()
        .filter(|item| item.get("position").is_some())
        .filter_map(|item| serde_json::from_value::<RemoteOkJob>(item).ok())
        .filter_map(|job| {
            let title = non_blank(job.position.as_deref())?;
            let company_name = non_blank(job.company.as_deref())?;
            let source_url = non_blank(job.url.as_deref())?;
            Some((title, company_name, source_url, job))
        })
        .filter(|(title, _, _, job)| {
            REMOTE_BOARD.is_relevant(&format!("{title} {}", job.tags.join(" ")))
        })
        .take(limit)
        .map(|(title, company_name, source_url, job)| RawSourceJob {
            level: None,
            stack: Some(StackInput::List(
                REMOTE_BOARD.extract_stack(&format!("{title} {}", job.tags.join(" "))),
            )),
            location: non_blank(job.location.as_deref()).or_else(|| Some("Remoto".to_string())),
            is_remote: Some(true),
            published_at: non_blank(job.date.as_deref()),
            source: Some(JobSource::Other),
            external_id: job.id.map(|id| format!("remoteok-{id}")),
            title,
            company_name,
            source_url,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"[
        {"last_updated": 1739260800, "legal": "API Terms of Service: please link back to Remote OK."},
        {"id": "1090001", "position": "Junior Full Stack Developer", "company": "Nimbus",
         "url": "https://remoteOK.com/remote-jobs/1090001", "tags": ["node", "react", "javascript"],
         "date": "2025-02-10T19:00:07+00:00", "location": ""},
        {"id": "1090002", "position": "Senior Backend Engineer", "company": "Nimbus",
         "url": "https://remoteOK.com/remote-jobs/1090002", "tags": ["python"]},
        {"id": "1090003", "position": "QA Tester", "company": "",
         "url": "https://remoteOK.com/remote-jobs/1090003", "tags": []}
    ]"#;

    #[test]
    fn skips_legal_notice_and_incomplete_rows() {
        let jobs = parse_listing(FEED, DEFAULT_LIMIT).unwrap();
        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.title, "Junior Full Stack Developer");
        assert_eq!(job.external_id.as_deref(), Some("remoteok-1090001"));
        assert_eq!(job.location.as_deref(), Some("Remoto"));
        assert_eq!(job.level, None);
        assert_eq!(
            job.stack,
            Some(StackInput::List(vec![
                "javascript".into(),
                "react".into(),
                "node".into(),
                "fullstack".into()
            ]))
        );
    }

    #[test]
    fn object_payload_is_a_parse_error() {
        assert!(matches!(
            parse_listing(r#"{"error": "rate limited"}"#, DEFAULT_LIMIT),
            Err(ConnectorError::Parse(_))
        ));
    }
}
