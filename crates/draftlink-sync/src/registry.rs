//! HTTP client for the UN Digital Library search endpoint.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use draftlink_core::{RegistryRecord, RegistrySource};
use draftlink_store::{CacheStats, RegistryCache};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::marc::{MarcError, parse_marc_xml};
use crate::retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://digitallibrary.un.org";
pub const DEFAULT_CACHE_DIR: &str = "data/cache/undl";

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("registry returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error(transparent)]
    Marc(#[from] MarcError),
}

/// Registry client settings.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Like `https://digitallibrary.un.org` (no trailing slash needed).
    pub base_url: String,
    pub cache_dir: PathBuf,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Pause after every completed network round-trip.
    pub politeness_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            timeout: Duration::from_secs(30),
            politeness_delay: Duration::from_secs(1),
            retry: RetryPolicy::default(),
        }
    }
}

/// Cache-first client for registry cross-references.
///
/// A lookup either returns a cached record or performs one logical request
/// (with retries per [`RetryPolicy`]) and caches a parsed record. Every
/// failure is logged and reported as `None`.
pub struct RegistryClient {
    client: reqwest::Client,
    base_url: String,
    cache: RegistryCache,
    politeness_delay: Duration,
    retry: RetryPolicy,
}

impl RegistryClient {
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("draftlink/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache: RegistryCache::new(config.cache_dir),
            politeness_delay: config.politeness_delay,
            retry: config.retry,
        })
    }

    pub fn cache(&self) -> &RegistryCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Cross-references for `symbol`, or `None` if unavailable.
    pub async fn fetch(&self, symbol: &str) -> Option<RegistryRecord> {
        if let Some(hit) = self.cache.get(symbol) {
            return Some(hit);
        }

        let body = match self.get_with_retry(symbol).await {
            Ok(body) => body,
            Err(e) => {
                warn!(symbol, error = %e, "registry lookup failed");
                return None;
            }
        };

        let record = match parse_marc_xml(&body, symbol) {
            Ok(Some(record)) => {
                if let Err(e) = self.cache.put(&record) {
                    warn!(symbol, error = %e, "failed to cache registry record");
                }
                info!(symbol, drafts = record.draft_symbols.len(), "fetched registry record");
                Some(record)
            }
            Ok(None) => {
                debug!(symbol, "symbol not found in registry response");
                None
            }
            Err(e) => {
                warn!(symbol, error = %e, "unparseable registry response");
                None
            }
        };

        if !self.politeness_delay.is_zero() {
            tokio::time::sleep(self.politeness_delay).await;
        }
        record
    }

    async fn get_with_retry(&self, symbol: &str) -> Result<String, RegistryError> {
        let url = format!("{}/search", self.base_url);
        let mut attempt = 1;

        loop {
            let reason = match self
                .client
                .get(&url)
                .query(&[("ln", "en"), ("of", "xm"), ("p", symbol), ("rg", "5")])
                .send()
                .await
            {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp.text().await?);
                    }
                    let code = status.as_u16();
                    if !self.retry.is_retryable_status(code) || !self.retry.should_retry(attempt) {
                        let body = resp.text().await.unwrap_or_default();
                        return Err(RegistryError::Server { status: code, body });
                    }
                    format!("status {code}")
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && self.retry.should_retry(attempt) => {
                    e.to_string()
                }
                Err(e) => return Err(e.into()),
            };

            let delay = self.retry.backoff(attempt);
            debug!(
                symbol,
                attempt,
                reason = %reason,
                delay_ms = delay.as_millis() as u64,
                "retrying registry request"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl RegistrySource for RegistryClient {
    async fn lookup(&self, symbol: &str) -> Option<RegistryRecord> {
        self.fetch(symbol).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marc::tests::WITH_DRAFT;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned response per connection, recording request lines.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut req = Vec::new();
                let mut buf = [0u8; 4096];
                while !req.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => req.extend_from_slice(&buf[..n]),
                    }
                }
                let text = String::from_utf8_lossy(&req);
                seen.lock()
                    .unwrap()
                    .push(text.lines().next().unwrap_or_default().to_string());

                let resp = format!(
                    "HTTP/1.1 {status} Canned\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(resp.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}"), requests)
    }

    fn config(base_url: String, dir: &TempDir) -> RegistryConfig {
        RegistryConfig {
            base_url,
            cache_dir: dir.path().join("undl"),
            timeout: Duration::from_secs(5),
            politeness_delay: Duration::ZERO,
            retry: RetryPolicy::default().with_base_delay(Duration::ZERO),
        }
    }

    #[tokio::test]
    async fn fetch_parses_caches_and_reuses() {
        let dir = TempDir::new().unwrap();
        let (url, requests) = serve(vec![(200, WITH_DRAFT)]).await;
        let client = RegistryClient::new(config(url, &dir)).unwrap();

        let rec = client.fetch("A/RES/80/142").await.unwrap();
        assert_eq!(rec.base_proposal.as_deref(), Some("A/C.2/80/L.35/Rev.1"));
        assert!(client.cache().path_for("A/RES/80/142").exists());

        // Second lookup is served from the cache.
        let again = client.fetch("A/RES/80/142").await.unwrap();
        assert_eq!(again, rec);

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let line = &requests[0];
        assert!(line.starts_with("GET /search?"), "{line}");
        assert!(line.contains("of=xm"), "{line}");
        assert!(line.contains("ln=en"), "{line}");
        assert!(line.contains("rg=5"), "{line}");
        assert!(line.contains("p=A%2FRES%2F80%2F142"), "{line}");
        assert_eq!(client.cache_stats().entries, 1);
    }

    #[tokio::test]
    async fn retries_transient_statuses() {
        let dir = TempDir::new().unwrap();
        let (url, requests) = serve(vec![(503, ""), (429, ""), (200, WITH_DRAFT)]).await;
        let client = RegistryClient::new(config(url, &dir)).unwrap();

        assert!(client.fetch("A/RES/80/142").await.is_some());
        assert_eq!(requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_attempt_budget() {
        let dir = TempDir::new().unwrap();
        let (url, requests) = serve(vec![(502, ""), (502, ""), (502, ""), (200, WITH_DRAFT)]).await;
        let mut cfg = config(url, &dir);
        cfg.retry = cfg.retry.with_max_attempts(3);
        let client = RegistryClient::new(cfg).unwrap();

        assert!(client.fetch("A/RES/80/142").await.is_none());
        assert_eq!(requests.lock().unwrap().len(), 3);
        assert_eq!(client.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let dir = TempDir::new().unwrap();
        let (url, requests) = serve(vec![(404, "not found"), (200, WITH_DRAFT)]).await;
        let client = RegistryClient::new(config(url, &dir)).unwrap();

        assert!(client.fetch("A/RES/80/142").await.is_none());
        assert_eq!(requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_response_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let (url, _) = serve(vec![(200, "<collection><record></collection>")]).await;
        let client = RegistryClient::new(config(url, &dir)).unwrap();

        assert!(client.fetch("A/RES/80/142").await.is_none());
        assert_eq!(client.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn unknown_symbol_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let (url, _) = serve(vec![(200, WITH_DRAFT)]).await;
        let client = RegistryClient::new(config(url, &dir)).unwrap();

        assert!(client.fetch("A/RES/99/999").await.is_none());
        assert_eq!(client.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn unreachable_registry_degrades_to_none() {
        let dir = TempDir::new().unwrap();
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let mut cfg = config(format!("http://{addr}"), &dir);
        cfg.retry = cfg.retry.with_max_attempts(2);
        let client = RegistryClient::new(cfg).unwrap();

        assert!(client.fetch("A/RES/80/142").await.is_none());
    }

    #[tokio::test]
    async fn request_timeout_degrades_to_none() {
        let dir = TempDir::new().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and never answer.
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let mut cfg = config(format!("http://{addr}"), &dir);
        cfg.timeout = Duration::from_millis(100);
        cfg.retry = RetryPolicy::none();
        let client = RegistryClient::new(cfg).unwrap();

        assert!(client.fetch("A/RES/80/142").await.is_none());
    }

    #[tokio::test]
    async fn politeness_delay_only_after_network_calls() {
        let dir = TempDir::new().unwrap();
        let (url, _) = serve(vec![(200, WITH_DRAFT)]).await;
        let mut cfg = config(url, &dir);
        cfg.politeness_delay = Duration::from_millis(300);
        let client = RegistryClient::new(cfg).unwrap();

        let start = Instant::now();
        client.fetch("A/RES/80/142").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(300));

        let start = Instant::now();
        client.fetch("A/RES/80/142").await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(300));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let client = RegistryClient::new(RegistryConfig {
            base_url: "http://localhost:4000/".into(),
            ..RegistryConfig::default()
        })
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:4000");
    }
}
