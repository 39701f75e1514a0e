//! Core domain model for jobhub: raw connector output, normalized candidates
//! and the canonical persisted job.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod fingerprint;
pub mod normalize;

pub use fingerprint::fingerprint;
pub use normalize::{
    normalize_job, normalize_level, normalize_location, normalize_source_url, normalize_stack,
    parse_published_at, LocationInfo,
};

pub const CRATE_NAME: &str = "jobhub-core";

/// Seniority band. Free-text levels always collapse into one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobLevel {
    Estagio,
    Junior,
    Pleno,
    Senior,
    Outro,
}

impl JobLevel {
    pub const ALL: [JobLevel; 5] = [
        JobLevel::Estagio,
        JobLevel::Junior,
        JobLevel::Pleno,
        JobLevel::Senior,
        JobLevel::Outro,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobLevel::Estagio => "ESTAGIO",
            JobLevel::Junior => "JUNIOR",
            JobLevel::Pleno => "PLENO",
            JobLevel::Senior => "SENIOR",
            JobLevel::Outro => "OUTRO",
        }
    }

    /// Human label as the Brazilian boards print it.
    pub fn label(self) -> &'static str {
        match self {
            JobLevel::Estagio => "Estágio",
            JobLevel::Junior => "Júnior",
            JobLevel::Pleno => "Pleno",
            JobLevel::Senior => "Sênior",
            JobLevel::Outro => "Outro",
        }
    }
}

impl fmt::Display for JobLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobLevel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// Where a canonical job was first sighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobSource {
    Linkedin,
    Gupy,
    CompanySite,
    #[default]
    Other,
}

impl JobSource {
    pub const ALL: [JobSource; 4] = [
        JobSource::Linkedin,
        JobSource::Gupy,
        JobSource::CompanySite,
        JobSource::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobSource::Linkedin => "LINKEDIN",
            JobSource::Gupy => "GUPY",
            JobSource::CompanySite => "COMPANY_SITE",
            JobSource::Other => "OTHER",
        }
    }
}

impl fmt::Display for JobSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobSource {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobSource::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant `{}`", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

/// Stack as sources ship it: a list of tokens or a comma separated string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StackInput {
    List(Vec<String>),
    Text(String),
}

impl From<Vec<String>> for StackInput {
    fn from(value: Vec<String>) -> Self {
        StackInput::List(value)
    }
}

/// Unvalidated posting emitted by a connector (or received by the webhook).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawSourceJob {
    pub title: String,
    pub company_name: String,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub stack: Option<StackInput>,
    #[serde(default)]
    pub location: Option<String>,
    /// Explicit remote flag when the source exposes one.
    #[serde(default)]
    pub is_remote: Option<bool>,
    #[serde(default)]
    pub published_at: Option<String>,
    pub source_url: String,
    #[serde(default)]
    pub source: Option<JobSource>,
    #[serde(default)]
    pub external_id: Option<String>,
}

/// Candidate record after field normalization, ready for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedJob {
    pub title: String,
    pub company_name: String,
    pub level: JobLevel,
    pub stack: Vec<String>,
    pub location: Option<String>,
    pub is_remote: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub source: JobSource,
    pub source_url: String,
    pub external_id: Option<String>,
    pub fingerprint: String,
}

/// Persisted, deduplicated job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalJob {
    pub id: Uuid,
    pub fingerprint: String,
    pub source: JobSource,
    pub external_id: Option<String>,
    pub title: String,
    pub company_name: String,
    pub level: JobLevel,
    pub stack: Vec<String>,
    pub location: Option<String>,
    pub is_remote: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub source_url: String,
    pub last_seen_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CanonicalJob {
    /// First sighting of a normalized candidate.
    pub fn from_normalized(job: &NormalizedJob, seen_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            fingerprint: job.fingerprint.clone(),
            source: job.source,
            external_id: job.external_id.clone(),
            title: job.title.clone(),
            company_name: job.company_name.clone(),
            level: job.level,
            stack: job.stack.clone(),
            location: job.location.clone(),
            is_remote: job.is_remote,
            published_at: job.published_at,
            source_url: job.source_url.clone(),
            last_seen_at: seen_at,
            created_at: seen_at,
            updated_at: seen_at,
        }
    }

    /// Overwrite the mutable descriptive fields from a later sighting.
    /// Identity keys (`fingerprint`, `source`, `external_id`) are left alone.
    pub fn refresh_from(&mut self, job: &NormalizedJob, seen_at: DateTime<Utc>) {
        self.title = job.title.clone();
        self.company_name = job.company_name.clone();
        self.level = job.level;
        self.stack = job.stack.clone();
        self.location = job.location.clone();
        self.is_remote = job.is_remote;
        self.published_at = job.published_at;
        self.source_url = job.source_url.clone();
        self.last_seen_at = seen_at;
        self.updated_at = seen_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_round_trip_through_wire_names() {
        for level in JobLevel::ALL {
            assert_eq!(level.as_str().parse::<JobLevel>().unwrap(), level);
        }
        for source in JobSource::ALL {
            assert_eq!(source.as_str().parse::<JobSource>().unwrap(), source);
        }
        assert!("MANAGER".parse::<JobLevel>().is_err());
        assert_eq!(
            serde_json::to_string(&JobSource::CompanySite).unwrap(),
            "\"COMPANY_SITE\""
        );
    }

    #[test]
    fn raw_job_accepts_stack_as_string_or_array() {
        let as_array: RawSourceJob = serde_json::from_str(
            r#"{"title":"Dev","companyName":"Acme","sourceUrl":"https://a.b/1","stack":["react","node"]}"#,
        )
        .unwrap();
        assert_eq!(
            as_array.stack,
            Some(StackInput::List(vec!["react".into(), "node".into()]))
        );

        let as_text: RawSourceJob = serde_json::from_str(
            r#"{"title":"Dev","companyName":"Acme","sourceUrl":"https://a.b/1","stack":"react, node","source":"GUPY"}"#,
        )
        .unwrap();
        assert_eq!(as_text.stack, Some(StackInput::Text("react, node".into())));
        assert_eq!(as_text.source, Some(JobSource::Gupy));
        assert_eq!(as_text.external_id, None);
    }
}
