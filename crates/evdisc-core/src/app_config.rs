use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub catalog_path: PathBuf,
    pub places_api_key: Option<String>,
    pub places_base_url: String,
    pub geo_request_timeout_secs: u64,
    pub geo_max_retries: u32,
    pub geo_retry_backoff_base_ms: u64,
    pub autocomplete_cache_capacity: usize,
    pub autocomplete_cache_ttl_secs: u64,
    pub default_page_size: usize,
    pub discovery_rate_limit_per_min: usize,
    pub autocomplete_rate_limit_per_min: usize,
    pub details_rate_limit_per_min: usize,
    pub geocode_rate_limit_per_min: usize,
    /// Key rate limits on `x-forwarded-for`/`x-real-ip` instead of the socket
    /// peer. Only safe behind a proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("catalog_path", &self.catalog_path)
            .field(
                "places_api_key",
                &self.places_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("places_base_url", &self.places_base_url)
            .field("geo_request_timeout_secs", &self.geo_request_timeout_secs)
            .field("geo_max_retries", &self.geo_max_retries)
            .field("geo_retry_backoff_base_ms", &self.geo_retry_backoff_base_ms)
            .field(
                "autocomplete_cache_capacity",
                &self.autocomplete_cache_capacity,
            )
            .field(
                "autocomplete_cache_ttl_secs",
                &self.autocomplete_cache_ttl_secs,
            )
            .field("default_page_size", &self.default_page_size)
            .field(
                "discovery_rate_limit_per_min",
                &self.discovery_rate_limit_per_min,
            )
            .field(
                "autocomplete_rate_limit_per_min",
                &self.autocomplete_rate_limit_per_min,
            )
            .field(
                "details_rate_limit_per_min",
                &self.details_rate_limit_per_min,
            )
            .field(
                "geocode_rate_limit_per_min",
                &self.geocode_rate_limit_per_min,
            )
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .finish()
    }
}
