//! Field normalization: free-text levels, stack lists, locations, URLs and
//! publication timestamps into canonical values.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use url::Url;

use crate::{fingerprint, JobLevel, NormalizedJob, RawSourceJob, StackInput};

// Order matters: first match wins, so "Júnior/Sênior" lands on JUNIOR.
static LEVEL_PATTERNS: LazyLock<Vec<(Regex, JobLevel)>> = LazyLock::new(|| {
    [
        (r"(?i)est[aá]g|intern", JobLevel::Estagio),
        (r"(?i)junior|júnior|jr\b", JobLevel::Junior),
        (r"(?i)pleno|mid|middle", JobLevel::Pleno),
        (r"(?i)senior|sênior|sr\b", JobLevel::Senior),
    ]
    .into_iter()
    .map(|(pattern, level)| (Regex::new(pattern).expect("valid level pattern"), level))
    .collect()
});

static REMOTE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)remote|remoto|home\s?office|anywhere").expect("valid remote pattern")
});

pub fn normalize_level(input: Option<&str>) -> JobLevel {
    let Some(text) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return JobLevel::Outro;
    };
    LEVEL_PATTERNS
        .iter()
        .find(|(regex, _)| regex.is_match(text))
        .map(|(_, level)| *level)
        .unwrap_or(JobLevel::Outro)
}

/// Lowercased, trimmed, non-empty and unique, in first-seen order.
pub fn normalize_stack(input: Option<&StackInput>) -> Vec<String> {
    let values: Vec<&str> = match input {
        Some(StackInput::List(items)) => items.iter().map(String::as_str).collect(),
        Some(StackInput::Text(text)) => text.split(',').collect(),
        None => Vec::new(),
    };

    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let token = value.trim().to_lowercase();
        if !token.is_empty() && !out.contains(&token) {
            out.push(token);
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationInfo {
    pub location: Option<String>,
    pub is_remote: bool,
}

pub fn normalize_location(input: Option<&str>, remote_flag: Option<bool>) -> LocationInfo {
    let location = input
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);
    let is_remote = remote_flag.unwrap_or(false)
        || location
            .as_deref()
            .is_some_and(|value| REMOTE_PATTERN.is_match(value));
    LocationInfo {
        location,
        is_remote,
    }
}

/// Canonical serialization of an http(s) URL, `None` when it does not parse.
pub fn normalize_source_url(input: &str) -> Option<String> {
    let parsed = Url::parse(input.trim()).ok()?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Some(parsed.to_string()),
        _ => None,
    }
}

pub fn parse_published_at(input: &str) -> Option<DateTime<Utc>> {
    let value = input.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Full per-record normalization. `None` means the record must be skipped
/// (its source URL is unusable).
pub fn normalize_job(raw: &RawSourceJob) -> Option<NormalizedJob> {
    let source_url = normalize_source_url(&raw.source_url)?;
    let title = raw.title.trim().to_string();
    let company_name = raw.company_name.trim().to_string();
    let LocationInfo {
        location,
        is_remote,
    } = normalize_location(raw.location.as_deref(), raw.is_remote);
    let fingerprint = fingerprint(&title, &company_name, &source_url);

    Some(NormalizedJob {
        level: normalize_level(raw.level.as_deref()),
        stack: normalize_stack(raw.stack.as_ref()),
        location,
        is_remote,
        published_at: raw.published_at.as_deref().and_then(parse_published_at),
        source: raw.source.unwrap_or_default(),
        source_url,
        external_id: raw
            .external_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string),
        fingerprint,
        title,
        company_name,
    })
}
