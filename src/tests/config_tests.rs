use super::*;

use std::collections::HashMap;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn applies_defaults_when_only_base_url_is_set() {
    let config = Config::from_lookup(lookup_from(&[("API_BASE_URL", "http://localhost:8080/")]))
        .expect("config");

    assert_eq!(config.api_base_url, "http://localhost:8080");
    assert_eq!(config.api_prefix, "/api");
    assert_eq!(config.api_root(), "http://localhost:8080/api");
    assert_eq!(config.access_token, None);
    assert_eq!(config.request_timeout, Duration::from_secs(30));
    assert_eq!(config.page_size, 100);
    assert_eq!(config.recent_payroll_days, 30);
    assert_eq!(config.log_dir, "logs");
    assert_eq!(config.log_level, tracing::Level::DEBUG);
}

#[test]
fn requires_base_url() {
    let err = Config::from_lookup(lookup_from(&[])).expect_err("missing base url");
    assert!(err.to_string().contains("API_BASE_URL"));
}

#[test]
fn normalises_prefix_and_reads_overrides() {
    let config = Config::from_lookup(lookup_from(&[
        ("API_BASE_URL", "https://hr.example.com"),
        ("API_PREFIX", "api/v1/"),
        ("ACCESS_TOKEN", "abc"),
        ("REQUEST_TIMEOUT_SECS", "5"),
        ("PAGE_SIZE", "25"),
        ("RECENT_PAYROLL_DAYS", "7"),
        ("LOG_LEVEL", "warn"),
    ]))
    .expect("config");

    assert_eq!(config.api_root(), "https://hr.example.com/api/v1");
    assert_eq!(config.access_token.as_deref(), Some("abc"));
    assert_eq!(config.request_timeout, Duration::from_secs(5));
    assert_eq!(config.page_size, 25);
    assert_eq!(config.recent_payroll_days, 7);
    assert_eq!(config.log_level, tracing::Level::WARN);
}

#[test]
fn blank_token_counts_as_missing() {
    let config = Config::from_lookup(lookup_from(&[
        ("API_BASE_URL", "http://localhost"),
        ("ACCESS_TOKEN", "   "),
    ]))
    .expect("config");
    assert_eq!(config.access_token, None);
}

#[test]
fn reports_which_key_failed_to_parse() {
    let err = Config::from_lookup(lookup_from(&[
        ("API_BASE_URL", "http://localhost"),
        ("REQUEST_TIMEOUT_SECS", "soon"),
    ]))
    .expect_err("bad timeout");
    assert!(format!("{err:#}").contains("REQUEST_TIMEOUT_SECS"));
}

#[test]
fn rejects_zero_page_size() {
    let err = Config::from_lookup(lookup_from(&[
        ("API_BASE_URL", "http://localhost"),
        ("PAGE_SIZE", "0"),
    ]))
    .expect_err("zero page size");
    assert!(err.to_string().contains("PAGE_SIZE"));
}

#[test]
fn rejects_recent_window_outside_range() {
    for raw in ["0", "-7", "200000000"] {
        let err = Config::from_lookup(lookup_from(&[
            ("API_BASE_URL", "http://localhost"),
            ("RECENT_PAYROLL_DAYS", raw),
        ]))
        .expect_err("out of range");
        assert!(err.to_string().contains("RECENT_PAYROLL_DAYS"), "{raw}: {err}");
    }
}
