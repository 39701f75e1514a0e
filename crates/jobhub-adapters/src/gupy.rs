//! Gupy employability portal: a JSON search API queried once per search
//! term, a couple of pages each.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use jobhub_core::{JobSource, RawSourceJob, StackInput};
use jobhub_storage::HttpFetcher;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};
use url::Url;

use crate::classify::BRAZILIAN_PORTAL;
use crate::{
    decode_items, infer_level_label, non_blank, ConnectorError, ConnectorId, ConnectorKind,
    FlexibleId, SourceConnector, JSON_HEADERS,
};

const DEFAULT_BASE_URL: &str = "https://employability-portal.gupy.io/api/v1/jobs";

/// Entry and mid-level searches.
pub const SEARCH_TERMS: [&str; 11] = [
    "desenvolvedor junior",
    "desenvolvedor pleno",
    "estagiario desenvolvedor",
    "estágio desenvolvimento",
    "frontend junior",
    "backend junior",
    "fullstack junior",
    "programador junior",
    "software engineer junior",
    "dev junior",
    "engenheiro de software pleno",
];

#[derive(Debug, Deserialize)]
struct GupyPage {
    #[serde(default)]
    data: Option<Vec<JsonValue>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GupyJob {
    id: FlexibleId,
    name: String,
    #[serde(default)]
    published_date: Option<String>,
    #[serde(default)]
    is_remote_work: Option<bool>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    city: Option<String>,
    career_page_name: String,
    job_url: String,
    #[serde(default, rename = "type")]
    job_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GupyConnector {
    base_url: String,
    terms: Vec<String>,
    page_size: usize,
    max_pages: usize,
    page_pause: Duration,
    term_pause: Duration,
}

impl Default for GupyConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl GupyConnector {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            terms: SEARCH_TERMS.iter().map(ToString::to_string).collect(),
            page_size: 20,
            max_pages: 2,
            page_pause: Duration::from_millis(500),
            term_pause: Duration::from_secs(1),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_terms(mut self, terms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.terms = terms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_pauses(mut self, page_pause: Duration, term_pause: Duration) -> Self {
        self.page_pause = page_pause;
        self.term_pause = term_pause;
        self
    }

    fn page_url(&self, term: &str, page: usize) -> Result<Url, url::ParseError> {
        let limit = self.page_size.to_string();
        let offset = (page * self.page_size).to_string();
        Url::parse_with_params(
            &self.base_url,
            &[
                ("jobName", term),
                ("limit", limit.as_str()),
                ("offset", offset.as_str()),
                ("sortBy", "publishedDate"),
            ],
        )
    }
}

#[async_trait]
impl SourceConnector for GupyConnector {
    fn id(&self) -> ConnectorId {
        ConnectorId::Gupy
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Api
    }

    async fn fetch(&self, http: &HttpFetcher) -> Result<Vec<RawSourceJob>, ConnectorError> {
        let mut jobs = Vec::new();
        let mut seen_urls = HashSet::new();
        let mut any_success = false;
        let mut last_error = None;

        for term in &self.terms {
            for page in 0..self.max_pages {
                let url = self.page_url(term, page)?;
                let body: GupyPage = match http
                    .get_json(self.id().as_str(), url.as_str(), JSON_HEADERS)
                    .await
                {
                    Ok(body) => body,
                    Err(err) => {
                        warn!(
                            term = %term,
                            page,
                            timeout = err.is_timeout(),
                            error = %err,
                            "gupy request failed, moving to next term"
                        );
                        last_error = Some(err);
                        break;
                    }
                };
                any_success = true;

                let items = body.data.unwrap_or_default();
                if items.is_empty() {
                    break;
                }
                jobs.extend(collect_page(items, &mut seen_urls));
                if page + 1 < self.max_pages {
                    tokio::time::sleep(self.page_pause).await;
                }
            }
            debug!(term = %term, collected = jobs.len(), "gupy term done");
            tokio::time::sleep(self.term_pause).await;
        }

        match last_error {
            Some(err) if !any_success => Err(err.into()),
            _ => Ok(jobs),
        }
    }
}

/// Parse one search page. Postings repeated within the page are dropped.
pub fn parse_listing(body: &str) -> Result<Vec<RawSourceJob>, ConnectorError> {
    let page: GupyPage =
        serde_json::from_str(body).map_err(|e| ConnectorError::Parse(e.to_string()))?;
    Ok(collect_page(page.data.unwrap_or_default(), &mut HashSet::new()))
}

fn collect_page(items: Vec<JsonValue>, seen_urls: &mut HashSet<String>) -> Vec<RawSourceJob> {
    decode_items::<GupyJob>(items)
        .into_iter()
        .filter(|job| seen_urls.insert(job.job_url.clone()))
        .filter(|job| BRAZILIAN_PORTAL.is_relevant(&job.name))
        .map(into_raw_job)
        .collect()
}

fn into_raw_job(job: GupyJob) -> RawSourceJob {
    let is_remote = job.is_remote_work.unwrap_or(false);
    let location = if is_remote {
        Some("Remoto".to_string())
    } else {
        let city_state = [job.city.as_deref(), job.state.as_deref()]
            .into_iter()
            .filter_map(non_blank)
            .collect::<Vec<_>>()
            .join(", ");
        non_blank(Some(city_state.as_str())).or_else(|| non_blank(job.country.as_deref()))
    };

    RawSourceJob {
        level: non_blank(job.job_type.as_deref()).or_else(|| infer_level_label(&job.name)),
        stack: Some(StackInput::List(BRAZILIAN_PORTAL.extract_stack(&job.name))),
        location,
        is_remote: Some(is_remote),
        published_at: non_blank(job.published_date.as_deref()),
        source: Some(JobSource::Gupy),
        external_id: Some(format!("gupy-{}", job.id)),
        title: job.name,
        company_name: job.career_page_name,
        source_url: job.job_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "data": [
            {"id": 101, "name": "Desenvolvedor Front-end React Júnior", "publishedDate": "2025-02-10T12:00:00.000Z",
             "isRemoteWork": true, "country": "Brasil", "careerPageName": "Acme Tech",
             "jobUrl": "https://acme.gupy.io/jobs/101", "type": "vacancy_type_effective"},
            {"id": 102, "name": "Analista de Vendas", "isRemoteWork": false, "country": "Brasil",
             "careerPageName": "Acme Tech", "jobUrl": "https://acme.gupy.io/jobs/102"},
            {"id": 103, "name": "Estágio Desenvolvimento Python", "isRemoteWork": false, "city": "Recife",
             "state": "Pernambuco", "country": "Brasil", "careerPageName": "Beta", "jobUrl": "https://beta.gupy.io/jobs/103"},
            {"id": 101, "name": "Desenvolvedor Front-end React Júnior", "isRemoteWork": true,
             "careerPageName": "Acme Tech", "jobUrl": "https://acme.gupy.io/jobs/101"}
        ],
        "pagination": {"total": 4, "page": 0, "pageSize": 20}
    }"#;

    #[test]
    fn filters_dedupes_and_maps_a_page() {
        let jobs = parse_listing(PAGE).unwrap();
        assert_eq!(jobs.len(), 2);

        let remote = &jobs[0];
        assert_eq!(remote.external_id.as_deref(), Some("gupy-101"));
        assert_eq!(remote.source, Some(JobSource::Gupy));
        assert_eq!(remote.location.as_deref(), Some("Remoto"));
        assert_eq!(remote.is_remote, Some(true));
        assert_eq!(remote.level.as_deref(), Some("vacancy_type_effective"));
        assert_eq!(
            remote.stack,
            Some(StackInput::List(vec!["react".into(), "frontend".into()]))
        );

        let intern = &jobs[1];
        assert_eq!(intern.location.as_deref(), Some("Recife, Pernambuco"));
        assert_eq!(intern.level.as_deref(), Some("Estágio"));
        assert_eq!(intern.published_at, None);
    }

    #[test]
    fn malformed_page_is_a_parse_error() {
        assert!(matches!(
            parse_listing("<html>maintenance</html>"),
            Err(ConnectorError::Parse(_))
        ));
        assert!(parse_listing(r#"{"pagination": {}}"#).unwrap().is_empty());
    }

    #[test]
    fn one_broken_posting_keeps_the_rest_of_the_page() {
        let page = r#"{"data": [
            {"id": 201, "name": "Desenvolvedor Backend Júnior", "isRemoteWork": null,
             "city": "Natal", "state": "RN", "careerPageName": "Gama", "jobUrl": "https://gama.gupy.io/jobs/201"},
            {"id": 202, "name": "Desenvolvedor Frontend Júnior", "careerPageName": null,
             "jobUrl": "https://gama.gupy.io/jobs/202"},
            {"id": 203, "name": "Programador Junior", "isRemoteWork": true,
             "careerPageName": "Delta", "jobUrl": "https://delta.gupy.io/jobs/203"}
        ]}"#;
        let jobs = parse_listing(page).unwrap();
        let ids: Vec<_> = jobs.iter().filter_map(|j| j.external_id.as_deref()).collect();
        assert_eq!(ids, vec!["gupy-201", "gupy-203"]);
        assert_eq!(jobs[0].is_remote, Some(false));
        assert_eq!(jobs[0].location.as_deref(), Some("Natal, RN"));
    }

    #[test]
    fn page_urls_carry_term_and_offset() {
        let connector = GupyConnector::new();
        let url = connector.page_url("dev junior", 1).unwrap();
        assert_eq!(
            url.as_str(),
            "https://employability-portal.gupy.io/api/v1/jobs?jobName=dev+junior&limit=20&offset=20&sortBy=publishedDate"
        );
    }

    #[tokio::test]
    async fn unreachable_portal_reports_the_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let http = HttpFetcher::new(Default::default()).unwrap();
        let connector = GupyConnector::new()
            .with_base_url(format!("http://{addr}/api/v1/jobs"))
            .with_terms(["dev junior"])
            .with_pauses(Duration::ZERO, Duration::ZERO);

        assert!(matches!(
            connector.fetch(&http).await,
            Err(ConnectorError::Fetch(_))
        ));
    }
}
