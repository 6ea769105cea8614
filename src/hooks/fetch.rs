use std::time::Duration;

use reqwest::header::HeaderMap;

/// Default network timeout for hook fetches.
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;

/// Raw result of a successful (2xx) hook fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("failed to read response body from {url}")]
    Read {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Upstream status code when the remote answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Issues the outbound GET for a hook.  One attempt, no retry.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, headers: &HeaderMap) -> Result<Fetched, FetchError>;
}

/// `reqwest` backed fetcher.  The client is built once and shared, so
/// connections are pooled across requests.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout_ms: u64) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, headers: &HeaderMap) -> Result<Fetched, FetchError> {
        // `headers` appends, so multi-value entries go out as repeated lines.
        let resp = self
            .client
            .get(url)
            .headers(headers.clone())
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.to_string(),
                source,
            })?;
        let status = resp.status();
        let body = resp.text().await.map_err(|source| FetchError::Read {
            url: url.to_string(),
            source,
        })?;
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        tracing::trace!(%url, status = status.as_u16(), bytes = body.len(), "hook fetched");
        Ok(Fetched {
            status: status.as_u16(),
            body,
        })
    }
}
