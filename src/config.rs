use log::info;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub upstream_api: String,
    pub port: u16,
    pub host: String,
    pub database_url: String,
    pub upstream_timeout_secs: u64,
    pub upstream_retries: u32,
    pub upstream_retry_delay_ms: u64,
    pub entity_ttl_secs: u64,
    pub stats_ttl_secs: u64,
    pub calculating_ttl_secs: u64,
    pub stats_refresh_secs: u64,
    pub recompute_attempts: u32,
    pub recompute_backoff_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            upstream_api: "https://www.swapi.tech/api".to_string(),
            port: 8000,
            host: "127.0.0.1".to_string(),
            database_url: "./data/holonet.db".to_string(),
            upstream_timeout_secs: 10,
            upstream_retries: 3,
            upstream_retry_delay_ms: 100,
            entity_ttl_secs: 3600,        // 1 hour
            stats_ttl_secs: 600,          // 10 minutes
            calculating_ttl_secs: 300,    // 5 minutes
            stats_refresh_secs: 300,      // every 5 minutes
            recompute_attempts: 3,
            recompute_backoff_secs: 60,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let upstream_api = env::var("HOLONET_UPSTREAM_API").unwrap_or(defaults.upstream_api);
        let port = env_or("HOLONET_PORT", defaults.port);
        let host = env::var("HOLONET_HOST").unwrap_or(defaults.host);
        let database_url = env::var("HOLONET_DATABASE_URL").unwrap_or(defaults.database_url);

        let upstream_timeout_secs =
            env_or("HOLONET_UPSTREAM_TIMEOUT_SECS", defaults.upstream_timeout_secs);
        let upstream_retries = env_or("HOLONET_UPSTREAM_RETRIES", defaults.upstream_retries);
        let upstream_retry_delay_ms =
            env_or("HOLONET_UPSTREAM_RETRY_DELAY_MS", defaults.upstream_retry_delay_ms);

        let entity_ttl_secs = env_or("HOLONET_ENTITY_TTL_SECS", defaults.entity_ttl_secs);
        let stats_ttl_secs = env_or("HOLONET_STATS_TTL_SECS", defaults.stats_ttl_secs);
        let calculating_ttl_secs =
            env_or("HOLONET_CALCULATING_TTL_SECS", defaults.calculating_ttl_secs);
        let stats_refresh_secs = env_or("HOLONET_STATS_REFRESH_SECS", defaults.stats_refresh_secs);
        let recompute_attempts = env_or("HOLONET_RECOMPUTE_ATTEMPTS", defaults.recompute_attempts);
        let recompute_backoff_secs =
            env_or("HOLONET_RECOMPUTE_BACKOFF_SECS", defaults.recompute_backoff_secs);

        info!("Configuration loaded:");
        info!("  Upstream API: {upstream_api}");
        info!("  Host: {host}");
        info!("  Port: {port}");
        info!("  Database URL: {database_url}");
        info!(
            "  Upstream: timeout {upstream_timeout_secs}s, {upstream_retries} attempts, {upstream_retry_delay_ms}ms backoff"
        );
        info!("  Entity cache TTL: {entity_ttl_secs}s");
        info!("  Stats TTL: {stats_ttl_secs}s (calculating guard {calculating_ttl_secs}s)");
        info!("  Stats refresh interval: {stats_refresh_secs}s");
        info!(
            "  Stats recompute: {recompute_attempts} attempts, {recompute_backoff_secs}s backoff"
        );

        Self {
            upstream_api,
            port,
            host,
            database_url,
            upstream_timeout_secs,
            upstream_retries,
            upstream_retry_delay_ms,
            entity_ttl_secs,
            stats_ttl_secs,
            calculating_ttl_secs,
            stats_refresh_secs,
            recompute_attempts,
            recompute_backoff_secs,
        }
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn upstream_retry_delay(&self) -> Duration {
        Duration::from_millis(self.upstream_retry_delay_ms)
    }

    pub fn entity_ttl(&self) -> Duration {
        Duration::from_secs(self.entity_ttl_secs)
    }

    pub fn stats_ttl(&self) -> Duration {
        Duration::from_secs(self.stats_ttl_secs)
    }

    pub fn calculating_ttl(&self) -> Duration {
        Duration::from_secs(self.calculating_ttl_secs)
    }

    /// Never shorter than one second.
    pub fn stats_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.stats_refresh_secs.max(1))
    }

    pub fn recompute_backoff(&self) -> Duration {
        Duration::from_secs(self.recompute_backoff_secs)
    }
}
