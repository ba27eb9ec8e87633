//! Configuration loading from .env, config.toml and environment overrides.

use std::path::Path;

use common::config::ServiceConfig;
use common::Error;

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn validate_config(config: &ServiceConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.access_token.trim().is_empty() {
        issues.push("access_token is required (STATHAT_ACCESS_TOKEN or config.toml)".into());
    }
    if config.listen_addr.trim().is_empty() {
        issues.push("listen_addr must not be empty".into());
    }
    if config.cache.ttl_secs == 0 {
        issues.push("cache.ttl_secs must be > 0".into());
    }
    if config.cache.sweep_interval_secs == 0 {
        issues.push("cache.sweep_interval_secs must be > 0".into());
    }
    if config.upstream.request_timeout_secs == 0 {
        issues.push("upstream.request_timeout_secs must be > 0".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load service configuration from environment and optional config file.
pub fn load_config(path: &Path, listen_override: Option<&str>) -> Result<ServiceConfig, Error> {
    // 1. Load .env file if present.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults, then layer the config file on top.
    let mut config = ServiceConfig::default();
    if path.exists() {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    }

    // 3. Override with environment variables.
    if let Ok(token) = std::env::var("STATHAT_ACCESS_TOKEN") {
        config.access_token = token;
    }
    if let Ok(addr) = std::env::var("LISTEN_ADDR") {
        config.listen_addr = addr;
    }
    if let Ok(raw) = std::env::var("CACHE_TTL_SECS") {
        config.cache.ttl_secs = parse_positive_u64(&raw, "CACHE_TTL_SECS")?;
    }
    if let Ok(raw) = std::env::var("CACHE_SWEEP_INTERVAL_SECS") {
        config.cache.sweep_interval_secs = parse_positive_u64(&raw, "CACHE_SWEEP_INTERVAL_SECS")?;
    }
    if let Ok(raw) = std::env::var("UPSTREAM_TIMEOUT_SECS") {
        config.upstream.request_timeout_secs = parse_positive_u64(&raw, "UPSTREAM_TIMEOUT_SECS")?;
    }

    // 4. The CLI flag wins over everything.
    if let Some(addr) = listen_override {
        config.listen_addr = addr.to_string();
    }

    validate_config(&config)?;

    Ok(config)
}
