use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;

/// Accepted dashboard windows, in days.
const RECENT_DAYS_RANGE: std::ops::RangeInclusive<i64> = 1..=36_500;

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub api_prefix: String,
    pub access_token: Option<String>,
    pub request_timeout: Duration,

    /// Page size requested from paginated list endpoints.
    pub page_size: u32,

    /// Window for the dashboards' "recent payrolls" figure.
    pub recent_payroll_days: i64,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_base_url = lookup("API_BASE_URL")
            .ok_or_else(|| anyhow!("API_BASE_URL must be set"))?
            .trim_end_matches('/')
            .to_string();

        let mut api_prefix = lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string());
        if !api_prefix.is_empty() && !api_prefix.starts_with('/') {
            api_prefix.insert(0, '/');
        }

        let page_size: u32 = parse_or(&lookup, "PAGE_SIZE", 100)?;
        if page_size == 0 {
            return Err(anyhow!("PAGE_SIZE must be greater than zero"));
        }

        let recent_payroll_days: i64 = parse_or(&lookup, "RECENT_PAYROLL_DAYS", 30)?;
        if !RECENT_DAYS_RANGE.contains(&recent_payroll_days) {
            return Err(anyhow!(
                "RECENT_PAYROLL_DAYS must be between {} and {}",
                RECENT_DAYS_RANGE.start(),
                RECENT_DAYS_RANGE.end()
            ));
        }

        Ok(Self {
            api_base_url,
            api_prefix: api_prefix.trim_end_matches('/').to_string(),
            access_token: lookup("ACCESS_TOKEN").filter(|t| !t.trim().is_empty()),
            request_timeout: Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?),
            page_size,
            recent_payroll_days,
            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            log_level: parse_or(&lookup, "LOG_LEVEL", tracing::Level::DEBUG)?,
        })
    }

    /// Base for every protected route, e.g. `http://host:8080/api`.
    pub fn api_root(&self) -> String {
        format!("{}{}", self.api_base_url, self.api_prefix)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
