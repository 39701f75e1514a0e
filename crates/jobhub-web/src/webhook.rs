//! Payload accepted by `POST /api/jobs/webhook` and its validation.

use jobhub_core::{JobSource, RawSourceJob, StackInput};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const MIN_TEXT_CHARS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default)]
    jobs: Option<Vec<Value>>,
    #[serde(default)]
    run_id: Option<String>,
    #[serde(default)]
    sent_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookJob {
    pub title: String,
    pub company_name: String,
    pub source_url: String,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub stack: Option<StackInput>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub source: Option<JobSource>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub connector_name: Option<String>,
}

impl WebhookJob {
    pub fn into_raw(self) -> RawSourceJob {
        RawSourceJob {
            title: self.title,
            company_name: self.company_name,
            level: self.level,
            stack: self.stack,
            location: self.location,
            is_remote: None,
            published_at: self.published_at,
            source_url: self.source_url,
            source: Some(self.source.unwrap_or_default()),
            external_id: self.external_id,
        }
    }

    fn check(&self, index: usize, issues: &mut Vec<ValidationIssue>) {
        for (field, value) in [("title", &self.title), ("companyName", &self.company_name)] {
            if value.chars().count() < MIN_TEXT_CHARS {
                issues.push(ValidationIssue::new(
                    format!("jobs.{index}.{field}"),
                    format!("must have at least {MIN_TEXT_CHARS} characters"),
                ));
            }
        }
        if url::Url::parse(&self.source_url).is_err() {
            issues.push(ValidationIssue::new(
                format!("jobs.{index}.sourceUrl"),
                "must be a valid URL",
            ));
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebhookPayload {
    pub jobs: Vec<WebhookJob>,
    pub run_id: Option<String>,
    pub sent_at: Option<String>,
}

impl WebhookPayload {
    /// Every problem in the body is reported, not just the first.
    pub fn parse(body: &[u8]) -> Result<Self, Vec<ValidationIssue>> {
        let envelope: Envelope = serde_json::from_slice(body)
            .map_err(|err| vec![ValidationIssue::new("", err.to_string())])?;

        let values = envelope.jobs.unwrap_or_default();
        let mut issues = Vec::new();
        if values.is_empty() {
            issues.push(ValidationIssue::new("jobs", "at least one job is required"));
        }

        let mut jobs = Vec::with_capacity(values.len());
        for (index, value) in values.into_iter().enumerate() {
            match serde_json::from_value::<WebhookJob>(value) {
                Ok(job) => {
                    job.check(index, &mut issues);
                    jobs.push(job);
                }
                Err(err) => issues.push(ValidationIssue::new(format!("jobs.{index}"), err.to_string())),
            }
        }

        if !issues.is_empty() {
            return Err(issues);
        }
        Ok(Self {
            jobs,
            run_id: envelope.run_id,
            sent_at: envelope.sent_at,
        })
    }

    pub fn into_raw_jobs(self) -> Vec<RawSourceJob> {
        self.jobs.into_iter().map(WebhookJob::into_raw).collect()
    }
}
