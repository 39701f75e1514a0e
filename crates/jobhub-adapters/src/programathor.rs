//! Programathor job listing page. Each posting is an anchor to
//! `/jobs/<id>-<slug>` whose text interleaves the fields with icon-font
//! glyphs: U+F0B1 before the company, U+F3C5 before the location and
//! U+F080 before the level.

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

const DEFAULT_ORIGIN: &str = "https://programathor.com.br";
pub const DEFAULT_LIMIT: usize = 80;

static JOB_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/jobs/(\d+-[^/?#]+)$").expect("valid href pattern"));
static TITLE_COMPANY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?)\s*\x{F0B1}\s*(.*?)\s*\x{F3C5}").expect("valid title pattern")
});
static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x{F3C5}\s*([^\x{F186}\x{F080}\x{F15C}\x{F072}]+)").expect("valid location pattern")
});
static LEVEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x{F080}\s*([^\x{F15C}\x{F072}\x{F186}]+)").expect("valid level pattern")
});
static ICON_GLYPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x{E000}-\x{F8FF}]").expect("valid glyph pattern"));

#[derive(Debug, Clone)]
pub struct ProgramathorConnector {
    origin: String,
    limit: usize,
}

impl Default for ProgramathorConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramathorConnector {
    pub fn new() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            limit: DEFAULT_LIMIT,
        }
    }

    /// Point at another host; the listing is read from `<origin>/jobs`.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

#[async_trait]
impl SourceConnector for ProgramathorConnector {
    fn id(&self) -> ConnectorId {
        ConnectorId::Programathor
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::PublicHtml
    }

    async fn fetch(&self, http: &HttpFetcher) -> Result<Vec<RawSourceJob>, ConnectorError> {
        let listing_url = format!("{}/jobs", self.origin);
        let html = http
            .get_text(self.id().as_str(), &listing_url, HTML_HEADERS)
            .await?;
        parse_listing(&html, &self.origin, self.limit)
    }
}

/// Cards from a listing page; job URLs are resolved against `origin`.
pub fn parse_listing(
    html: &str,
    origin: &str,
    limit: usize,
) -> Result<Vec<RawSourceJob>, ConnectorError> {
    let document = Html::parse_document(html);
    let anchors = parse_selector(r#"a[href^="/jobs/"]"#)?;
    let mut seen = HashSet::new();
    let mut jobs = Vec::new();

    for anchor in document.select(&anchors) {
        let Some(slug) = anchor
            .value()
            .attr("href")
            .and_then(|href| JOB_HREF.captures(href))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
        else {
            continue;
        };
        if !seen.insert(slug.clone()) {
            continue;
        }

        let block = element_text(anchor, " ");
        if block.chars().count() < 8 {
            continue;
        }
        let Some(job) = parse_card(&block, &slug, origin) else {
            continue;
        };
        jobs.push(job);
        if jobs.len() >= limit {
            break;
        }
    }

    Ok(jobs)
}

fn parse_card(block: &str, slug: &str, origin: &str) -> Option<RawSourceJob> {
    let (title, company_name) = match TITLE_COMPANY.captures(block) {
        Some(caps) => (
            caps.get(1).map(|m| m.as_str().trim().to_string()),
            caps.get(2).map(|m| m.as_str().trim().to_string()),
        ),
        None => (
            ICON_GLYPH
                .split(block)
                .next()
                .map(|s| s.trim().to_string()),
            None,
        ),
    };
    let title = title.filter(|t| !t.is_empty())?;
    let company_name = company_name
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "Empresa não informada".to_string());

    let capture = |re: &Regex| {
        re.captures(block)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    };
    let location = capture(&LOCATION);
    let level_text = capture(&LEVEL);

    let plain = ICON_GLYPH.replace_all(block, " ");
    let searchable = format!("{title} {company_name} {plain}");
    if !HTML_PORTAL.is_relevant(&searchable) {
        return None;
    }

    Some(RawSourceJob {
        level: infer_level_label(level_text.as_deref().unwrap_or(&*plain)),
        stack: Some(StackInput::List(HTML_PORTAL.extract_stack(&searchable))),
        location,
        is_remote: None,
        published_at: None,
        source_url: format!("{origin}/jobs/{slug}"),
        source: Some(JobSource::Other),
        external_id: Some(format!("programathor-{slug}")),
        title,
        company_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_card_text_on_icon_glyphs() {
        let block = "Desenvolvedor Front-end React \u{F0B1} Acme Digital \u{F3C5} Remoto \u{F080} Júnior \u{F15C} CLT";
        let job = parse_card(block, "31001-desenvolvedor-front-end-react", DEFAULT_ORIGIN).unwrap();
        assert_eq!(job.title, "Desenvolvedor Front-end React");
        assert_eq!(job.company_name, "Acme Digital");
        assert_eq!(job.location.as_deref(), Some("Remoto"));
        assert_eq!(job.level.as_deref(), Some("Júnior"));
        assert_eq!(
            job.source_url,
            "https://programathor.com.br/jobs/31001-desenvolvedor-front-end-react"
        );
        assert_eq!(
            job.external_id.as_deref(),
            Some("programathor-31001-desenvolvedor-front-end-react")
        );
    }

    #[test]
    fn card_without_company_glyph_falls_back() {
        let job = parse_card("Desenvolvedor Python \u{F3C5} Curitiba", "9-dev", DEFAULT_ORIGIN).unwrap();
        assert_eq!(job.title, "Desenvolvedor Python");
        assert_eq!(job.company_name, "Empresa não informada");
        assert_eq!(job.location.as_deref(), Some("Curitiba"));
        assert_eq!(job.level, None);
    }

    #[test]
    fn non_target_stack_cards_are_dropped() {
        let block = "Desenvolvedor PHP Laravel \u{F0B1} Loja X \u{F3C5} São Paulo \u{F080} Pleno";
        assert!(parse_card(block, "1-php", DEFAULT_ORIGIN).is_none());
    }

    #[test]
    fn listing_dedupes_anchors_and_honours_limit() {
        let html = r#"<html><body>
            <a href="/jobs/1-dev-react">Desenvolvedor React &#xF0B1; Alfa &#xF3C5; Remoto &#xF080; Pleno</a>
            <a href="/jobs/1-dev-react">Desenvolvedor React &#xF0B1; Alfa &#xF3C5; Remoto &#xF080; Pleno</a>
            <a href="/jobs/2-dev-node">Desenvolvedor Node &#xF0B1; Beta &#xF3C5; Recife &#xF080; Júnior</a>
            <a href="/jobs/new">Anuncie</a>
        </body></html>"#;
        let all = parse_listing(html, DEFAULT_ORIGIN, DEFAULT_LIMIT).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].company_name, "Beta");
        assert_eq!(all[1].level.as_deref(), Some("Júnior"));

        let capped = parse_listing(html, DEFAULT_ORIGIN, 1).unwrap();
        assert_eq!(capped.len(), 1);
    }
}
