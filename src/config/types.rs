use serde::Deserialize;

/// Marker the scraping proxy expects in its connection string to enable
/// JavaScript rendering.
pub const RENDER_MARKER: &str = "render=True";

/// Main configuration structure for cached-crawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of requests in flight, also the connection pool size
    #[serde(rename = "concurrent-requests")]
    pub concurrent_requests: u32,

    /// Credits already spent before this run starts
    #[serde(rename = "credits-used", default)]
    pub credits_used: u64,

    /// Credits this run may spend in total (including `credits_used`)
    #[serde(rename = "credits-threshold")]
    pub credits_threshold: u64,

    /// User-Agent header sent with every fetch
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Whole-request timeout in seconds. Rendering through the proxy is slow.
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Response store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,

    /// How long a pooled connection waits on a locked database (milliseconds)
    #[serde(rename = "busy-timeout-ms", default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

/// Scraping proxy configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyConfig {
    /// Proxy URL. Falls back to the `HTTPS_PROXY` environment variable when
    /// absent; an empty string disables the proxy entirely.
    pub url: Option<String>,

    /// Accept certificates re-signed by the proxy
    #[serde(rename = "accept-invalid-certs", default)]
    pub accept_invalid_certs: bool,
}

impl ProxyConfig {
    /// Returns the proxy connection string in effect, if any
    pub fn resolve(&self) -> Option<String> {
        self.url
            .clone()
            .or_else(|| std::env::var("HTTPS_PROXY").ok())
            .filter(|url| !url.is_empty())
    }

    /// Whether fetches go through the proxy with rendering enabled
    pub fn renders(&self) -> bool {
        self.resolve()
            .map(|url| url.contains(RENDER_MARKER))
            .unwrap_or(false)
    }
}

fn default_user_agent() -> String {
    format!("cached-crawl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> u64 {
    70
}

fn default_busy_timeout() -> u64 {
    5000
}
