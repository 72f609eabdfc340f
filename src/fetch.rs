//! HTTP GET for pages and images.

use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("could not get {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("could not get {url}: status {status}")]
    Status { url: String, status: u16 },
    #[error("{url} is larger than {limit} bytes")]
    TooLarge { url: String, limit: usize },
    #[error("{url} returned an empty body")]
    Empty { url: String },
}

/// Shared HTTP client. Redirects are followed by the client's default policy.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Fetch `url` into memory. Fails on transport errors, non-success
    /// statuses, empty bodies and bodies longer than `max_bytes`.
    pub async fn get(&self, url: &str, timeout: Duration, max_bytes: usize) -> Result<Vec<u8>, FetchError> {
        let request_err = |source| FetchError::Request {
            url: url.to_string(),
            source,
        };

        let mut response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(request_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if response.content_length().is_some_and(|len| len > max_bytes as u64) {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                limit: max_bytes,
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(request_err)? {
            if body.len() + chunk.len() > max_bytes {
                return Err(FetchError::TooLarge {
                    url: url.to_string(),
                    limit: max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        if body.is_empty() {
            return Err(FetchError::Empty {
                url: url.to_string(),
            });
        }
        debug!(url, bytes = body.len(), "fetched");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warp::Filter;

    async fn spawn_server() -> String {
        let routes = warp::path("small")
            .map(|| "hello")
            .or(warp::path("big").map(|| "x".repeat(4096)))
            .or(warp::path("empty").map(|| ""))
            .or(warp::path("gone").map(|| {
                warp::reply::with_status("", warp::http::StatusCode::NOT_FOUND)
            }));
        let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn enforces_status_size_and_emptiness() {
        let base = spawn_server().await;
        let fetcher = Fetcher::new();
        let timeout = Duration::from_secs(5);

        let body = fetcher.get(&format!("{base}/small"), timeout, 1024).await.unwrap();
        assert_eq!(body, b"hello");

        assert!(matches!(
            fetcher.get(&format!("{base}/big"), timeout, 1024).await,
            Err(FetchError::TooLarge { limit: 1024, .. })
        ));
        assert!(matches!(
            fetcher.get(&format!("{base}/empty"), timeout, 1024).await,
            Err(FetchError::Empty { .. })
        ));
        assert!(matches!(
            fetcher.get(&format!("{base}/gone"), timeout, 1024).await,
            Err(FetchError::Status { status: 404, .. })
        ));
    }
}
