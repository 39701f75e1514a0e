//! Trampos opportunities page. Anchors point at
//! `https://www.trampos.co/oportunidades/<id>`; the card's text blocks hold
//! title, company and location in that order.

use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use jobhub_core::{JobSource, RawSourceJob, StackInput};
use jobhub_storage::HttpFetcher;
use regex::Regex;
use scraper::Html;

use crate::classify::HTML_PORTAL;
use crate::{
    element_text, infer_level_label, parse_selector, ConnectorError, ConnectorId,
    ConnectorKind, SourceConnector, HTML_HEADERS,
};

const DEFAULT_LISTING_URL: &str = "https://www.trampos.co/oportunidades";
const JOB_URL_PREFIX: &str = "https://www.trampos.co/oportunidades/";
pub const DEFAULT_LIMIT: usize = 80;

static JOB_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://www\.trampos\.co/oportunidades/(\d+)/?$").expect("valid href pattern")
});
static PART_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}|\s+-\s+").expect("valid separator pattern"));
static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:home office)|\p{L}+(?: \p{L}+)* - ?[A-Z]{2}\b(?: ?\(H[íi]brido\))?")
        .expect("valid location pattern")
});

#[derive(Debug, Clone)]
pub struct TramposConnector {
    listing_url: String,
    limit: usize,
}

impl Default for TramposConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl TramposConnector {
    pub fn new() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_listing_url(mut self, url: impl Into<String>) -> Self {
        self.listing_url = url.into();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

#[async_trait]
impl SourceConnector for TramposConnector {
    fn id(&self) -> ConnectorId {
        ConnectorId::Trampos
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::PublicHtml
    }

    async fn fetch(&self, http: &HttpFetcher) -> Result<Vec<RawSourceJob>, ConnectorError> {
        let html = http
            .get_text(self.id().as_str(), &self.listing_url, HTML_HEADERS)
            .await?;
        parse_listing(&html, self.limit)
    }
}

pub fn parse_listing(html: &str, limit: usize) -> Result<Vec<RawSourceJob>, ConnectorError> {
    let document = Html::parse_document(html);
    let anchors = parse_selector(&format!(r#"a[href^="{JOB_URL_PREFIX}"]"#))?;
    let mut seen = HashSet::new();
    let mut jobs = Vec::new();

    for anchor in document.select(&anchors) {
        let Some(id) = anchor
            .value()
            .attr("href")
            .and_then(|href| JOB_HREF.captures(href))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
        else {
            continue;
        };
        if !seen.insert(id.clone()) {
            continue;
        }

        // Element boundaries become double spaces so they survive as separators.
        let content = element_text(anchor, "  ");
        if content.chars().count() < 8 {
            continue;
        }
        if let Some(job) = parse_card(&content, &id) {
            jobs.push(job);
            if jobs.len() >= limit {
                break;
            }
        }
    }

    Ok(jobs)
}

fn parse_card(content: &str, id: &str) -> Option<RawSourceJob> {
    let parts: Vec<&str> = PART_SEPARATOR
        .split(content)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    let title = parts.first().map_or(content, |p| *p).to_string();
    let company_name = if content.contains("CONFIDENCIAL") {
        "Confidencial".to_string()
    } else {
        parts
            .get(1)
            .map_or("Empresa não informada", |p| *p)
            .to_string()
    };

    let location = LOCATION
        .find(content)
        .map(|m| m.as_str().trim().to_string());
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");

    if !HTML_PORTAL.is_relevant(&format!("{title} {company_name} {flat}")) {
        return None;
    }

    Some(RawSourceJob {
        level: infer_level_label(&flat),
        stack: Some(StackInput::List(HTML_PORTAL.extract_stack(&flat))),
        location,
        is_remote: None,
        published_at: None,
        source_url: format!("{JOB_URL_PREFIX}{id}"),
        source: Some(JobSource::Other),
        external_id: Some(format!("trampos-{id}")),
        title,
        company_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_give_title_company_and_location() {
        let job = parse_card(
            "Desenvolvedor Front-end Júnior  Acme Digital  São Paulo - SP (Híbrido)",
            "612345",
        )
        .unwrap();
        assert_eq!(job.title, "Desenvolvedor Front-end Júnior");
        assert_eq!(job.company_name, "Acme Digital");
        assert_eq!(job.location.as_deref(), Some("São Paulo - SP (Híbrido)"));
        assert_eq!(job.level.as_deref(), Some("Júnior"));
        assert_eq!(job.source_url, "https://www.trampos.co/oportunidades/612345");
        assert_eq!(job.external_id.as_deref(), Some("trampos-612345"));
    }

    #[test]
    fn confidential_company_and_home_office() {
        let job = parse_card("Desenvolvedor Node.js  CONFIDENCIAL  Home office", "7").unwrap();
        assert_eq!(job.company_name, "Confidencial");
        assert_eq!(job.location.as_deref(), Some("Home office"));
        assert_eq!(
            job.stack,
            Some(StackInput::List(vec!["node".into()]))
        );
    }

    #[test]
    fn sales_cards_are_excluded() {
        assert!(parse_card("Executivo de Vendas  Acme  Rio de Janeiro - RJ", "8").is_none());
    }

    #[test]
    fn listing_reads_block_boundaries() {
        let html = r#"<ul>
            <li><a href="https://www.trampos.co/oportunidades/500"><h2>Desenvolvedora Python</h2><span>Zeta Labs</span><span>Belo Horizonte - MG</span></a></li>
            <li><a href="https://www.trampos.co/oportunidades/500">duplicate</a></li>
            <li><a href="https://www.trampos.co/oportunidades/abc">Not a job id</a></li>
            <li><a href="https://www.trampos.co/oportunidades/501">Curto</a></li>
        </ul>"#;
        let jobs = parse_listing(html, DEFAULT_LIMIT).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Desenvolvedora Python");
        assert_eq!(jobs[0].company_name, "Zeta Labs");
        assert_eq!(jobs[0].location.as_deref(), Some("Belo Horizonte - MG"));
    }
}
