//! Service configuration types.

use serde::{Deserialize, Serialize};

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// StatHat export access token.
    #[serde(default)]
    pub access_token: String,

    /// Bind address for the HTTP server.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Cache parameters.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Upstream client parameters.
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

/// Cache retention parameters (seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a cached dataset stays valid.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// How often the background sweep evicts expired entries.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

/// Upstream request parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Per-request timeout for upstream calls. The service imposes no
    /// further deadline of its own.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_listen_addr() -> String {
    "127.0.0.1:6070".into()
}

fn default_ttl_secs() -> u64 {
    600
}

fn default_sweep_interval_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    15
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            access_token: String::new(),
            listen_addr: default_listen_addr(),
            cache: CacheConfig::default(),
            upstream: UpstreamConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}
