use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::services::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL_DAYS, MAX_TTL_DAYS};
use crate::services::pvgis::{PVGIS_DEFAULT_BASE_URL, PVGIS_DEFAULT_TIMEOUT};
use crate::services::yield_calculator::CoveragePolicy;

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub pvgis_base_url: String,
    pub pvgis_timeout: Duration,
    pub cache_max_entries: usize,
    pub cache_ttl_days: i64,
    /// JSON file the response cache is restored from and saved to, if set.
    pub cache_snapshot_path: Option<PathBuf>,
    pub coverage_policy: CoveragePolicy,
}

/// Parse an env var, warning and falling back to `default` when it is malformed.
fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            tracing::warn!("Invalid {}='{}' ({}), using default {:?}", name, raw, e, default);
            default
        }),
        Err(_) => default,
    }
}

/// Clamp a configured cache TTL into `0..=MAX_TTL_DAYS`.
fn bounded_ttl_days(days: i64) -> i64 {
    if days > MAX_TTL_DAYS {
        tracing::warn!(
            "CACHE_TTL_DAYS={} exceeds the maximum, using {}",
            days,
            MAX_TTL_DAYS
        );
        return MAX_TTL_DAYS;
    }
    days.max(0)
}

impl AppConfig {
    pub fn from_env() -> Self {
        let timeout_secs = env_or("PVGIS_TIMEOUT_SECS", PVGIS_DEFAULT_TIMEOUT.as_secs());
        Self {
            port: env_or("PORT", 8080),
            pvgis_base_url: std::env::var("PVGIS_BASE_URL")
                .unwrap_or_else(|_| PVGIS_DEFAULT_BASE_URL.to_string()),
            pvgis_timeout: Duration::from_secs(timeout_secs.max(1)),
            cache_max_entries: env_or("CACHE_MAX_ENTRIES", DEFAULT_MAX_ENTRIES).max(1),
            cache_ttl_days: bounded_ttl_days(env_or("CACHE_TTL_DAYS", DEFAULT_TTL_DAYS)),
            cache_snapshot_path: std::env::var("CACHE_SNAPSHOT_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            coverage_policy: env_or("COVERAGE_POLICY", CoveragePolicy::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        // NOTE: set_var/remove_var in tests is unsafe in multi-threaded contexts.
        // Only this test touches these variables, so there is no concurrent reader.
        unsafe {
            std::env::remove_var("PORT");
            std::env::remove_var("PVGIS_BASE_URL");
            std::env::remove_var("PVGIS_TIMEOUT_SECS");
            std::env::remove_var("CACHE_MAX_ENTRIES");
            std::env::remove_var("CACHE_TTL_DAYS");
            std::env::remove_var("CACHE_SNAPSHOT_PATH");
            std::env::set_var("COVERAGE_POLICY", "not-a-policy");
        }

        let config = AppConfig::from_env();

        assert_eq!(config.port, 8080);
        assert_eq!(config.pvgis_base_url, PVGIS_DEFAULT_BASE_URL);
        assert_eq!(config.pvgis_timeout, Duration::from_secs(30));
        assert_eq!(config.cache_max_entries, 100);
        assert_eq!(config.cache_ttl_days, 30);
        assert_eq!(config.cache_snapshot_path, None);
        assert_eq!(config.coverage_policy, CoveragePolicy::Advisory);

        unsafe {
            std::env::remove_var("COVERAGE_POLICY");
        }
    }

    #[test]
    fn test_cache_ttl_days_is_bounded() {
        assert_eq!(bounded_ttl_days(30), 30);
        assert_eq!(bounded_ttl_days(-5), 0);
        assert_eq!(bounded_ttl_days(100_000_000), MAX_TTL_DAYS);
        assert_eq!(bounded_ttl_days(i64::MAX), MAX_TTL_DAYS);
    }
}
