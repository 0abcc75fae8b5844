use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn parse_environment_variants() {
    assert_eq!(parse_environment("development"), Environment::Development);
    assert_eq!(parse_environment("test"), Environment::Test);
    assert_eq!(parse_environment("production"), Environment::Production);
}

#[test]
fn parse_environment_unknown_defaults_to_development() {
    assert_eq!(parse_environment("staging"), Environment::Development);
}

#[test]
fn build_app_config_uses_defaults_for_empty_env() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).expect("defaults should be valid");

    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:3000");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.catalog_path.to_string_lossy(), "./config/events.yaml");
    assert!(cfg.places_api_key.is_none());
    assert_eq!(cfg.places_base_url, "https://maps.googleapis.com/");
    assert_eq!(cfg.geo_request_timeout_secs, 5);
    assert_eq!(cfg.geo_max_retries, 2);
    assert_eq!(cfg.geo_retry_backoff_base_ms, 200);
    assert_eq!(cfg.autocomplete_cache_capacity, 500);
    assert_eq!(cfg.autocomplete_cache_ttl_secs, 300);
    assert_eq!(cfg.default_page_size, 12);
    assert_eq!(cfg.discovery_rate_limit_per_min, 120);
    assert_eq!(cfg.autocomplete_rate_limit_per_min, 60);
    assert_eq!(cfg.details_rate_limit_per_min, 20);
    assert_eq!(cfg.geocode_rate_limit_per_min, 30);
    assert!(!cfg.trust_proxy_headers);
}

#[test]
fn build_app_config_allows_production_without_places_key() {
    let mut map = HashMap::new();
    map.insert("EVDISC_ENV", "production");
    let cfg = build_app_config(lookup_from_map(&map)).expect("places key is optional");
    assert_eq!(cfg.env, Environment::Production);
    assert!(cfg.places_api_key.is_none());
}

#[test]
fn build_app_config_treats_blank_places_key_as_missing() {
    let mut map = HashMap::new();
    map.insert("EVDISC_PLACES_API_KEY", "   ");
    let cfg = build_app_config(lookup_from_map(&map)).expect("dev allows missing key");
    assert!(cfg.places_api_key.is_none());
}

#[test]
fn build_app_config_accepts_production_with_key() {
    let mut map = HashMap::new();
    map.insert("EVDISC_ENV", "production");
    map.insert("EVDISC_PLACES_API_KEY", "secret");
    let cfg = build_app_config(lookup_from_map(&map)).expect("valid production config");
    assert_eq!(cfg.env, Environment::Production);
    assert_eq!(cfg.places_api_key.as_deref(), Some("secret"));
}

#[test]
fn build_app_config_fails_with_invalid_bind_addr() {
    let mut map = HashMap::new();
    map.insert("EVDISC_BIND_ADDR", "not-a-socket-addr");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "EVDISC_BIND_ADDR"),
        "expected InvalidEnvVar(EVDISC_BIND_ADDR), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_zero_cache_capacity() {
    let mut map = HashMap::new();
    map.insert("EVDISC_AUTOCOMPLETE_CACHE_CAPACITY", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "EVDISC_AUTOCOMPLETE_CACHE_CAPACITY"),
        "expected InvalidEnvVar(EVDISC_AUTOCOMPLETE_CACHE_CAPACITY), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_non_numeric_timeout() {
    let mut map = HashMap::new();
    map.insert("EVDISC_GEO_REQUEST_TIMEOUT_SECS", "soon");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "EVDISC_GEO_REQUEST_TIMEOUT_SECS"),
        "expected InvalidEnvVar(EVDISC_GEO_REQUEST_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_zero_timeout() {
    let mut map = HashMap::new();
    map.insert("EVDISC_GEO_REQUEST_TIMEOUT_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "EVDISC_GEO_REQUEST_TIMEOUT_SECS"),
        "expected InvalidEnvVar(EVDISC_GEO_REQUEST_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn build_app_config_parses_trust_proxy_headers() {
    let mut map = HashMap::new();
    map.insert("EVDISC_TRUST_PROXY_HEADERS", "true");
    let cfg = build_app_config(lookup_from_map(&map)).expect("valid flag");
    assert!(cfg.trust_proxy_headers);

    map.insert("EVDISC_TRUST_PROXY_HEADERS", "sometimes");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "EVDISC_TRUST_PROXY_HEADERS"),
        "expected InvalidEnvVar(EVDISC_TRUST_PROXY_HEADERS), got: {result:?}"
    );
}

#[test]
fn build_app_config_applies_rate_limit_overrides() {
    let mut map = HashMap::new();
    map.insert("EVDISC_DETAILS_RATE_LIMIT_PER_MIN", "5");
    map.insert("EVDISC_AUTOCOMPLETE_RATE_LIMIT_PER_MIN", "90");
    let cfg = build_app_config(lookup_from_map(&map)).expect("valid overrides");
    assert_eq!(cfg.details_rate_limit_per_min, 5);
    assert_eq!(cfg.autocomplete_rate_limit_per_min, 90);
}

#[test]
fn debug_output_redacts_places_key() {
    let mut map = HashMap::new();
    map.insert("EVDISC_PLACES_API_KEY", "super-secret-key");
    let cfg = build_app_config(lookup_from_map(&map)).expect("valid config");
    let debug = format!("{cfg:?}");
    assert!(!debug.contains("super-secret-key"));
    assert!(debug.contains("[redacted]"));
}
