//! Adzuna search API: paginated JSON behind an app id/key pair.

use std::time::Duration;

use async_trait::async_trait;
use jobhub_core::{JobSource, RawSourceJob, StackInput};
use jobhub_storage::HttpFetcher;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::classify::BROAD_AGGREGATOR;
use crate::{
    infer_level_label, non_blank, ConnectorError, ConnectorId, ConnectorKind, FlexibleId,
    SourceConnector, JSON_HEADERS,
};

const DEFAULT_BASE_URL: &str = "https://api.adzuna.com/v1/api/jobs";
const RESULTS_PER_PAGE: usize = 50;
pub const DEFAULT_LIMIT: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdzunaSettings {
    pub app_id: Option<String>,
    pub app_key: Option<String>,
    pub country: String,
    pub what: String,
    pub where_filter: Option<String>,
    pub what_exclude: Option<String>,
}

impl Default for AdzunaSettings {
    fn default() -> Self {
        Self {
            app_id: None,
            app_key: None,
            country: "br".to_string(),
            what: "software developer".to_string(),
            where_filter: None,
            what_exclude: None,
        }
    }
}

impl AdzunaSettings {
    fn credentials(&self) -> Option<(&str, &str)> {
        let id = self.app_id.as_deref().filter(|s| !s.trim().is_empty())?;
        let key = self.app_key.as_deref().filter(|s| !s.trim().is_empty())?;
        Some((id, key))
    }
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<AdzunaJob>,
}

#[derive(Debug, Deserialize)]
struct AdzunaJob {
    #[serde(default)]
    id: Option<FlexibleId>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    redirect_url: Option<String>,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    location: Option<DisplayName>,
    #[serde(default)]
    company: Option<DisplayName>,
    #[serde(default)]
    category: Option<CategoryLabel>,
}

#[derive(Debug, Deserialize)]
struct DisplayName {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CategoryLabel {
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AdzunaConnector {
    settings: AdzunaSettings,
    base_url: String,
    limit: usize,
    page_pause: Duration,
}

impl AdzunaConnector {
    pub fn new(settings: AdzunaSettings) -> Self {
        Self {
            settings,
            base_url: DEFAULT_BASE_URL.to_string(),
            limit: DEFAULT_LIMIT,
            page_pause: Duration::from_millis(500),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_page_pause(mut self, page_pause: Duration) -> Self {
        self.page_pause = page_pause;
        self
    }

    fn page_count(&self) -> usize {
        self.limit.div_ceil(RESULTS_PER_PAGE).max(1)
    }

    fn page_url(&self, app_id: &str, app_key: &str, page: usize) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&format!(
            "{}/{}/search/{page}",
            self.base_url.trim_end_matches('/'),
            self.settings.country
        ))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("app_id", app_id)
                .append_pair("app_key", app_key)
                .append_pair("results_per_page", &RESULTS_PER_PAGE.to_string())
                .append_pair("what", &self.settings.what)
                .append_pair("content-type", "application/json");
            if let Some(where_filter) = non_blank(self.settings.where_filter.as_deref()) {
                query.append_pair("where", &where_filter);
            }
            if let Some(exclude) = non_blank(self.settings.what_exclude.as_deref()) {
                query.append_pair("what_exclude", &exclude);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl SourceConnector for AdzunaConnector {
    fn id(&self) -> ConnectorId {
        ConnectorId::Adzuna
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Api
    }

    async fn fetch(&self, http: &HttpFetcher) -> Result<Vec<RawSourceJob>, ConnectorError> {
        let Some((app_id, app_key)) = self.settings.credentials() else {
            return Err(ConnectorError::NotConfigured("ADZUNA_APP_ID/ADZUNA_APP_KEY"));
        };

        let mut collected = Vec::new();
        let mut any_success = false;
        let mut last_error = None;

        let pages = self.page_count();
        for page in 1..=pages {
            if page > 1 {
                tokio::time::sleep(self.page_pause).await;
            }
            let url = self.page_url(app_id, app_key, page)?;
            match http
                .get_json::<SearchPage>(self.id().as_str(), url.as_str(), JSON_HEADERS)
                .await
            {
                Ok(body) => {
                    any_success = true;
                    debug!(page, results = body.results.len(), "adzuna page fetched");
                    collected.extend(body.results);
                }
                Err(err) => {
                    warn!(
                        page,
                        status = ?status_of(&err),
                        timeout = err.is_timeout(),
                        "adzuna page skipped"
                    );
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) if !any_success => Err(err.into()),
            _ => Ok(select_jobs(collected, self.limit)),
        }
    }
}

fn status_of(err: &jobhub_storage::FetchError) -> Option<u16> {
    match err {
        jobhub_storage::FetchError::HttpStatus { status, .. } => Some(*status),
        _ => None,
    }
}

/// Parse a single search page.
pub fn parse_listing(body: &str, limit: usize) -> Result<Vec<RawSourceJob>, ConnectorError> {
    let page: SearchPage =
        serde_json::from_str(body).map_err(|e| ConnectorError::Parse(e.to_string()))?;
    Ok(select_jobs(page.results, limit))
}

fn select_jobs(results: Vec<AdzunaJob>, limit: usize) -> Vec<RawSourceJob> {
    results
        .into_iter()
        .filter_map(|job| {
            let title = non_blank(job.title.as_deref())?;
            let source_url = non_blank(job.redirect_url.as_deref())?;
            let text = format!(
                "{title} {} {}",
                job.category
                    .as_ref()
                    .and_then(|c| c.label.as_deref())
                    .unwrap_or_default(),
                job.description.as_deref().unwrap_or_default()
            );
            BROAD_AGGREGATOR
                .is_relevant(&text)
                .then_some((title, source_url, text, job))
        })
        .take(limit)
        .map(|(title, source_url, text, job)| RawSourceJob {
            level: infer_level_label(&text),
            stack: Some(StackInput::List(BROAD_AGGREGATOR.extract_stack(&text))),
            location: job
                .location
                .as_ref()
                .and_then(|l| non_blank(l.display_name.as_deref())),
            is_remote: None,
            published_at: non_blank(job.created.as_deref()),
            source: Some(JobSource::Other),
            external_id: job.id.as_ref().map(|id| format!("adzuna-{id}")),
            company_name: job
                .company
                .as_ref()
                .and_then(|c| non_blank(c.display_name.as_deref()))
                .unwrap_or_else(|| "Empresa não informada".to_string()),
            title,
            source_url,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AdzunaSettings {
        AdzunaSettings {
            app_id: Some("id-1".into()),
            app_key: Some("key-1".into()),
            where_filter: Some("São Paulo".into()),
            ..Default::default()
        }
    }

    #[test]
    fn page_count_rounds_up() {
        let connector = AdzunaConnector::new(settings());
        assert_eq!(connector.page_count(), 3);
        assert_eq!(connector.clone().with_limit(50).page_count(), 1);
        assert_eq!(connector.with_limit(0).page_count(), 1);
    }

    #[test]
    fn page_url_includes_optional_filters() {
        let connector = AdzunaConnector::new(settings());
        let url = connector.page_url("id-1", "key-1", 2).unwrap();
        assert_eq!(url.path(), "/v1/api/jobs/br/search/2");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("what".into(), "software developer".into())));
        assert!(pairs.contains(&("where".into(), "São Paulo".into())));
        assert!(!pairs.iter().any(|(k, _)| k == "what_exclude"));
    }

    #[tokio::test]
    async fn missing_credentials_disable_the_connector() {
        let http = HttpFetcher::new(Default::default()).unwrap();
        let connector = AdzunaConnector::new(AdzunaSettings {
            app_key: Some("key-only".into()),
            ..Default::default()
        });
        assert!(matches!(
            connector.fetch(&http).await,
            Err(ConnectorError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn failed_pages_keep_the_app_key_out_of_the_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let http = HttpFetcher::new(Default::default()).unwrap();
        let connector = AdzunaConnector::new(AdzunaSettings {
            app_id: Some("id-1".into()),
            app_key: Some("SECRETKEY42".into()),
            ..Default::default()
        })
        .with_base_url(format!("http://{addr}/v1/api/jobs"))
        .with_page_pause(Duration::ZERO);

        let err = connector.fetch(&http).await.unwrap_err();
        assert!(matches!(err, ConnectorError::Fetch(_)));
        let text = err.to_string();
        assert!(!text.contains("SECRETKEY42"), "{text}");
        assert!(!text.contains("app_id"), "{text}");
        assert!(text.contains("/v1/api/jobs/br/search/"), "{text}");
    }

    #[test]
    fn maps_results_with_inferred_level() {
        let body = r#"{"count": 3, "results": [
            {"id": "4950001", "title": "Desenvolvedor Java Júnior", "description": "Spring Boot e APIs REST",
             "redirect_url": "https://www.adzuna.com.br/land/ad/4950001", "created": "2025-02-09T10:00:00Z",
             "location": {"display_name": "Campinas, São Paulo"}, "company": {"display_name": "Delta"},
             "category": {"label": "Vagas de TI"}},
            {"id": 4950002, "title": "Consultor de Vendas", "redirect_url": "https://www.adzuna.com.br/land/ad/4950002",
             "category": {"label": "Vendas"}},
            {"id": 4950003, "title": "Software Developer", "category": {"label": "Vagas de TI"}}
        ]}"#;
        let jobs = parse_listing(body, DEFAULT_LIMIT).unwrap();
        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.level.as_deref(), Some("Júnior"));
        assert_eq!(job.company_name, "Delta");
        assert_eq!(job.location.as_deref(), Some("Campinas, São Paulo"));
        assert_eq!(job.external_id.as_deref(), Some("adzuna-4950001"));
        assert_eq!(
            job.stack,
            Some(StackInput::List(vec!["java".into(), "spring".into()]))
        );
    }
}
