//! HTTP fetch utilities and the persistent job store for jobhub.

pub mod http;
pub mod memory;
pub mod pg;
pub mod store;

pub use http::{redact_url, FetchError, FetchedResponse, HttpClientConfig, HttpFetcher};
pub use memory::MemoryJobStore;
pub use pg::PgJobStore;
pub use store::{JobQuery, JobStore, StoreError, UpsertOutcome};

pub const CRATE_NAME: &str = "jobhub-storage";
