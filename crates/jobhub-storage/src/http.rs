use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info_span, Instrument};

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub global_concurrency: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: None,
            global_concurrency: 8,
        }
    }
}

/// Shared client for every connector. One attempt per request: a failure is
/// reported to the caller and the next scheduled run fetches again.
#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    global_limit: Arc<Semaphore>,
}

#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: StatusCode,
    pub final_url: String,
    pub body: Vec<u8>,
}

/// URLs carried here never include the query string.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed for {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    fn request(url: &str, err: reqwest::Error) -> Self {
        FetchError::Request {
            url: redact_url(url),
            source: err.without_url(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Request { source, .. } if source.is_timeout())
    }
}

/// Scheme, host and path of `url`; query and fragment are dropped.
pub fn redact_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => "<invalid url>".to_string(),
    }
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;

        Ok(Self {
            client,
            global_limit: Arc::new(Semaphore::new(config.global_concurrency.max(1))),
        })
    }

    pub async fn fetch_bytes(
        &self,
        source_id: &str,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<FetchedResponse, FetchError> {
        let span = info_span!("http_fetch", source_id, url = %redact_url(url));
        async {
            let _permit = self
                .global_limit
                .acquire()
                .await
                .expect("semaphore not closed");

            let mut request = self.client.get(url);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }

            let resp = request
                .send()
                .await
                .map_err(|err| FetchError::request(url, err))?;
            let status = resp.status();
            let final_url = resp.url().to_string();

            if !status.is_success() {
                return Err(FetchError::HttpStatus {
                    status: status.as_u16(),
                    url: redact_url(&final_url),
                });
            }

            let body = resp
                .bytes()
                .await
                .map_err(|err| FetchError::request(&final_url, err))?
                .to_vec();
            debug!(status = status.as_u16(), bytes = body.len(), "fetched");
            Ok(FetchedResponse {
                status,
                final_url,
                body,
            })
        }
        .instrument(span)
        .await
    }

    pub async fn get_text(
        &self,
        source_id: &str,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<String, FetchError> {
        let resp = self.fetch_bytes(source_id, url, headers).await?;
        Ok(String::from_utf8_lossy(&resp.body).into_owned())
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        source_id: &str,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let resp = self.fetch_bytes(source_id, url, headers).await?;
        serde_json::from_slice(&resp.body).map_err(|source| FetchError::Decode {
            url: redact_url(&resp.final_url),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(HttpClientConfig {
            timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .expect("client")
    }

    async fn closed_port() -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        addr
    }

    /// Answers one connection with `503 Service Unavailable`.
    async fn unavailable_server() -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 4096];
                let mut request = Vec::new();
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let response: &[u8] = b"HTTP/1.1 503 Service Unavailable\r\n\
                    content-length: 0\r\nconnection: close\r\n\r\n";
                let _ = socket.write_all(response).await;
                let _ = socket.shutdown().await;
            }
        });
        addr
    }

    #[tokio::test]
    async fn query_credentials_never_reach_error_text() {
        let addr = closed_port().await;
        let url = format!("http://{addr}/v1/search/1?app_id=id-1&app_key=SECRETKEY42");
        let err = fetcher().get_text("adzuna", &url, &[]).await.unwrap_err();
        assert!(!err.to_string().contains("SECRETKEY42"), "{err}");
        assert!(!format!("{err:?}").contains("SECRETKEY42"));
        assert!(err.to_string().contains(&format!("http://{addr}/v1/search/1")));

        let addr = unavailable_server().await;
        let url = format!("http://{addr}/v1/search/2?app_key=SECRETKEY42");
        let err = fetcher().get_text("adzuna", &url, &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus { status: 503, .. }));
        assert!(!err.to_string().contains("SECRETKEY42"), "{err}");
    }

    #[test]
    fn redaction_keeps_origin_and_path() {
        assert_eq!(
            redact_url("https://api.example.com/v1/jobs/br/search/1?app_key=k#top"),
            "https://api.example.com/v1/jobs/br/search/1"
        );
        assert_eq!(redact_url("not a url"), "<invalid url>");
    }

    #[tokio::test]
    async fn connection_failures_surface_as_request_errors() {
        let fetcher = HttpFetcher::new(HttpClientConfig {
            timeout: Duration::from_secs(2),
            user_agent: Some("jobhub-test/0.1".into()),
            ..Default::default()
        })
        .expect("client");

        let addr = closed_port().await;

        let err = fetcher
            .get_text("test", &format!("http://{addr}/jobs"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Request { .. }));
        assert!(!err.is_timeout());
    }

    #[test]
    fn default_config_bounds_requests() {
        let config = HttpClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(20));
        assert!(config.global_concurrency >= 1);
    }
}
