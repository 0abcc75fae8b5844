use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation are decoupled from the real environment so tests can
/// drive them with a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected true or false, got '{other}'"))),
        }
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    // Zero is never a sensible capacity, page size or quota.
    let parse_positive = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be greater than zero".to_string()));
        }
        Ok(value)
    };

    let env = parse_environment(&or_default("EVDISC_ENV", "development"));

    // Without a key the place and geocode endpoints answer "service unavailable".
    let places_api_key = lookup("EVDISC_PLACES_API_KEY")
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty());

    let bind_addr = parse_addr("EVDISC_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("EVDISC_LOG_LEVEL", "info");
    let catalog_path = PathBuf::from(or_default("EVDISC_CATALOG_PATH", "./config/events.yaml"));
    let places_base_url = or_default("EVDISC_PLACES_BASE_URL", "https://maps.googleapis.com/");

    let geo_request_timeout_secs = parse_u64("EVDISC_GEO_REQUEST_TIMEOUT_SECS", "5")?;
    if geo_request_timeout_secs == 0 {
        return Err(invalid(
            "EVDISC_GEO_REQUEST_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }
    let geo_max_retries = parse_u32("EVDISC_GEO_MAX_RETRIES", "2")?;
    let geo_retry_backoff_base_ms = parse_u64("EVDISC_GEO_RETRY_BACKOFF_BASE_MS", "200")?;

    let autocomplete_cache_capacity = parse_positive("EVDISC_AUTOCOMPLETE_CACHE_CAPACITY", "500")?;
    let autocomplete_cache_ttl_secs = parse_u64("EVDISC_AUTOCOMPLETE_CACHE_TTL_SECS", "300")?;
    let default_page_size = parse_positive("EVDISC_DEFAULT_PAGE_SIZE", "12")?;

    let discovery_rate_limit_per_min = parse_positive("EVDISC_DISCOVERY_RATE_LIMIT_PER_MIN", "120")?;
    let autocomplete_rate_limit_per_min =
        parse_positive("EVDISC_AUTOCOMPLETE_RATE_LIMIT_PER_MIN", "60")?;
    let details_rate_limit_per_min = parse_positive("EVDISC_DETAILS_RATE_LIMIT_PER_MIN", "20")?;
    let geocode_rate_limit_per_min = parse_positive("EVDISC_GEOCODE_RATE_LIMIT_PER_MIN", "30")?;
    let trust_proxy_headers = parse_bool("EVDISC_TRUST_PROXY_HEADERS", "false")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        catalog_path,
        places_api_key,
        places_base_url,
        geo_request_timeout_secs,
        geo_max_retries,
        geo_retry_backoff_base_ms,
        autocomplete_cache_capacity,
        autocomplete_cache_ttl_secs,
        default_page_size,
        discovery_rate_limit_per_min,
        autocomplete_rate_limit_per_min,
        details_rate_limit_per_min,
        geocode_rate_limit_per_min,
        trust_proxy_headers,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
