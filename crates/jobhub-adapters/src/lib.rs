//! Source connectors: one fetcher per external job board, each emitting
//! [`RawSourceJob`]s that already passed the shared keyword classifier.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use jobhub_core::{normalize_level, JobLevel, RawSourceJob, UnknownVariant};
use jobhub_storage::{FetchError, HttpFetcher};
use scraper::{ElementRef, Selector};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

pub mod adzuna;
pub mod classify;
pub mod gupy;
pub mod programathor;
pub mod remoteok;
pub mod remotive;
pub mod trampos;

pub use adzuna::{AdzunaConnector, AdzunaSettings};
pub use classify::{KeywordProfile, Verdict};
pub use gupy::GupyConnector;
pub use programathor::ProgramathorConnector;
pub use remoteok::RemoteOkConnector;
pub use remotive::RemotiveConnector;
pub use trampos::TramposConnector;

pub const CRATE_NAME: &str = "jobhub-adapters";

pub(crate) const JSON_HEADERS: &[(&str, &str)] = &[("accept", "application/json")];
pub(crate) const HTML_HEADERS: &[(&str, &str)] = &[
    ("accept", "text/html,application/xhtml+xml"),
    ("accept-language", "pt-BR,pt;q=0.9,en;q=0.8"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectorKind {
    Api,
    PublicHtml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorId {
    Gupy,
    Remotive,
    RemoteOk,
    Programathor,
    Trampos,
    Adzuna,
}

impl ConnectorId {
    pub const ALL: [ConnectorId; 6] = [
        ConnectorId::Gupy,
        ConnectorId::Remotive,
        ConnectorId::RemoteOk,
        ConnectorId::Programathor,
        ConnectorId::Trampos,
        ConnectorId::Adzuna,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectorId::Gupy => "gupy",
            ConnectorId::Remotive => "remotive",
            ConnectorId::RemoteOk => "remoteok",
            ConnectorId::Programathor => "programathor",
            ConnectorId::Trampos => "trampos",
            ConnectorId::Adzuna => "adzuna",
        }
    }

    /// Environment variable holding the on/off toggle.
    pub fn env_key(self) -> &'static str {
        match self {
            ConnectorId::Gupy => "JOBS_CONNECTOR_GUPY",
            ConnectorId::Remotive => "JOBS_CONNECTOR_REMOTIVE",
            ConnectorId::RemoteOk => "JOBS_CONNECTOR_REMOTEOK",
            ConnectorId::Programathor => "JOBS_CONNECTOR_PROGRAMATHOR",
            ConnectorId::Trampos => "JOBS_CONNECTOR_TRAMPOS",
            ConnectorId::Adzuna => "JOBS_CONNECTOR_ADZUNA",
        }
    }

    /// Gupy runs unless switched off; every other board is opt-in.
    pub fn default_enabled(self) -> bool {
        matches!(self, ConnectorId::Gupy)
    }
}

impl fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectorId {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        ConnectorId::ALL
            .into_iter()
            .find(|id| id.as_str() == needle)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),
    #[error("unparseable payload: {0}")]
    Parse(String),
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

/// One external job board.
///
/// `fetch` makes one or more GET requests and returns the postings that
/// passed the source's keyword profile. Multi-request connectors return
/// what they collected when a later request fails; an `Err` means nothing
/// usable came back.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    fn id(&self) -> ConnectorId;
    fn kind(&self) -> ConnectorKind;

    async fn fetch(&self, http: &HttpFetcher) -> Result<Vec<RawSourceJob>, ConnectorError>;
}

#[derive(Debug, Clone, Default)]
pub struct ConnectorSettings {
    pub adzuna: AdzunaSettings,
}

pub fn connector_for(id: ConnectorId, settings: &ConnectorSettings) -> Box<dyn SourceConnector> {
    match id {
        ConnectorId::Gupy => Box::new(GupyConnector::new()),
        ConnectorId::Remotive => Box::new(RemotiveConnector::new()),
        ConnectorId::RemoteOk => Box::new(RemoteOkConnector::new()),
        ConnectorId::Programathor => Box::new(ProgramathorConnector::new()),
        ConnectorId::Trampos => Box::new(TramposConnector::new()),
        ConnectorId::Adzuna => Box::new(AdzunaConnector::new(settings.adzuna.clone())),
    }
}

/// Provider ids arrive as JSON numbers from some boards and strings from others.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub(crate) enum FlexibleId {
    Number(i64),
    Text(String),
}

impl fmt::Display for FlexibleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlexibleId::Number(n) => write!(f, "{n}"),
            FlexibleId::Text(s) => f.write_str(s.trim()),
        }
    }
}

/// Seniority label inferred from free text, `None` when no band matches.
pub(crate) fn infer_level_label(text: &str) -> Option<String> {
    match normalize_level(Some(text)) {
        JobLevel::Outro => None,
        level => Some(level.label().to_string()),
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Decode feed items one at a time, dropping the ones that do not fit `T`.
pub(crate) fn decode_items<T: DeserializeOwned>(items: Vec<JsonValue>) -> Vec<T> {
    let total = items.len();
    let decoded: Vec<T> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if decoded.len() < total {
        debug!(skipped = total - decoded.len(), "dropped malformed feed items");
    }
    decoded
}

pub(crate) fn parse_selector(css: &str) -> Result<Selector, ConnectorError> {
    Selector::parse(css).map_err(|e| ConnectorError::Parse(e.to_string()))
}

/// Text nodes of `element`, trimmed, joined by `separator`.
pub(crate) fn element_text(element: ElementRef<'_>, separator: &str) -> String {
    element
        .text()
        .map(|chunk| chunk.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connector_ids_round_trip_and_default_toggles() {
        for id in ConnectorId::ALL {
            assert_eq!(id.as_str().parse::<ConnectorId>().unwrap(), id);
            assert!(id.env_key().starts_with("JOBS_CONNECTOR_"));
        }
        assert_eq!("RemoteOK".parse::<ConnectorId>().unwrap(), ConnectorId::RemoteOk);
        assert!("linkedin".parse::<ConnectorId>().is_err());

        let enabled: Vec<_> = ConnectorId::ALL
            .into_iter()
            .filter(|id| id.default_enabled())
            .collect();
        assert_eq!(enabled, vec![ConnectorId::Gupy]);
    }

    #[test]
    fn registry_builds_every_connector() {
        let settings = ConnectorSettings::default();
        for id in ConnectorId::ALL {
            assert_eq!(connector_for(id, &settings).id(), id);
        }
        assert_eq!(
            connector_for(ConnectorId::Trampos, &settings).kind(),
            ConnectorKind::PublicHtml
        );
        assert_eq!(
            connector_for(ConnectorId::Remotive, &settings).kind(),
            ConnectorKind::Api
        );
    }

    #[test]
    fn flexible_ids_accept_numbers_and_strings() {
        let ids: Vec<FlexibleId> = serde_json::from_str(r#"[42, " abc-1 "]"#).unwrap();
        assert_eq!(ids[0].to_string(), "42");
        assert_eq!(ids[1].to_string(), "abc-1");
    }

    #[test]
    fn level_inference_returns_labels() {
        assert_eq!(infer_level_label("Estágio em Desenvolvimento").as_deref(), Some("Estágio"));
        assert_eq!(infer_level_label("Dev Jr").as_deref(), Some("Júnior"));
        assert_eq!(infer_level_label("Full time"), None);
    }
}
