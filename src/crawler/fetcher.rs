//! HTTP fetcher implementation
//!
//! This module performs the network fetches for cache misses:
//! - Building the HTTP client (user agent, timeout, scraping proxy)
//! - GET requests returning raw header and body bytes
//! - Detecting the response encoding from `Content-Type`

use crate::config::Config;
use crate::record::{RawHeaders, Request, Response};
use crate::CrawlError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Proxy};
use std::time::Duration;

/// Encoding assumed when the server does not name one
pub const DEFAULT_ENCODING: &str = "utf-8";

/// Anything that can turn a request into a network response
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, CrawlError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawl configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(CrawlError)` - The proxy URL is unusable or the client failed to build
pub fn build_http_client(config: &Config) -> Result<Client, CrawlError> {
    let mut builder = Client::builder()
        .user_agent(config.crawler.user_agent.clone())
        .timeout(Duration::from_secs(config.crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy_url) = config.proxy.resolve() {
        tracing::info!(
            "Fetching through proxy (rendering {})",
            if config.proxy.renders() { "on" } else { "off" }
        );
        builder = builder.proxy(Proxy::all(proxy_url.as_str())?);
    } else {
        // Only the resolved proxy may be used, never reqwest's system lookup
        builder = builder.no_proxy();
    }

    if config.proxy.accept_invalid_certs {
        tracing::warn!("Accepting invalid TLS certificates");
        builder = builder.danger_accept_invalid_certs(true);
    }

    Ok(builder.build()?)
}

/// Fetcher backed by a `reqwest::Client`
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &Config) -> Result<Self, CrawlError> {
        Ok(Self::new(build_http_client(config)?))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, CrawlError> {
        let http_error = |source| CrawlError::Http {
            url: request.url.clone(),
            source,
        };

        let response = self
            .client
            .get(request.url.as_str())
            .send()
            .await
            .map_err(http_error)?;

        let status = response.status().as_u16();
        if response.url().as_str() != request.url {
            tracing::debug!("URL '{}' redirected to '{}'", request.url, response.url());
        }

        let mut headers = RawHeaders::new();
        for (name, value) in response.headers() {
            headers.append(name.as_str().as_bytes(), value.as_bytes());
        }

        let encoding = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(charset_from_content_type)
            .unwrap_or_else(|| DEFAULT_ENCODING.to_string());

        let body = response.bytes().await.map_err(http_error)?.to_vec();

        tracing::info!(
            "Fetched URL '{}': status {}, {} bytes, encoding {}",
            request.url,
            status,
            body.len(),
            encoding
        );

        Ok(Response {
            url: request.url.clone(),
            status,
            encoding,
            headers,
            body,
            request: request.clone(),
            replayed: false,
        })
    }
}

/// Extracts the `charset` parameter of a `Content-Type` value
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches('"').trim();
        (!value.is_empty()).then(|| value.to_ascii_lowercase())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlerConfig, DatabaseConfig, ProxyConfig};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> Config {
        Config {
            crawler: CrawlerConfig {
                concurrent_requests: 1,
                credits_used: 0,
                credits_threshold: 10,
                user_agent: "cached-crawl-test/1.0".to_string(),
                request_timeout_secs: 5,
            },
            database: DatabaseConfig {
                path: "unused.db".to_string(),
                busy_timeout_ms: 1000,
            },
            proxy: ProxyConfig {
                url: Some(String::new()),
                accept_invalid_certs: false,
            },
        }
    }

    #[test]
    fn test_charset_from_content_type() {
        assert_eq!(
            charset_from_content_type("text/html; charset=ISO-8859-1").as_deref(),
            Some("iso-8859-1")
        );
        assert_eq!(
            charset_from_content_type("text/html;charset=\"utf-8\"").as_deref(),
            Some("utf-8")
        );
        assert_eq!(charset_from_content_type("text/html"), None);
        assert_eq!(charset_from_content_type("text/html; charset="), None);
    }

    #[tokio::test]
    async fn test_fetch_collects_raw_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=windows-1252")
                    .insert_header("x-cache", "MISS")
                    .set_body_bytes(b"caf\xe9".to_vec()),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::from_config(&config()).unwrap();
        let url = format!("{}/page", server.uri());
        let response = fetcher.fetch(&Request::new(url.clone())).await.unwrap();

        assert_eq!(response.url, url);
        assert_eq!(response.status, 200);
        assert_eq!(response.encoding, "windows-1252");
        assert_eq!(response.body, b"caf\xe9");
        assert!(!response.replayed);
        assert_eq!(response.text().unwrap(), "café");

        assert_eq!(response.headers.get("X-Cache"), Some(&b"MISS"[..]));
    }

    #[tokio::test]
    async fn test_missing_charset_defaults_to_utf8() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::from_config(&config()).unwrap();
        let response = fetcher
            .fetch(&Request::new(format!("{}/missing", server.uri())))
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.encoding, DEFAULT_ENCODING);
    }

    #[tokio::test]
    async fn test_connection_failure_is_http_error() {
        let fetcher = HttpFetcher::from_config(&config()).unwrap();
        let err = fetcher
            .fetch(&Request::new("http://127.0.0.1:1/unreachable"))
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::Http { .. }));
    }
}
