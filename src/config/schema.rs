//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind addresses, TLS, admin API).
    pub server: ServerConfig,

    /// Logging settings.
    pub logging: LoggingConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Response compression settings.
    pub compression: CompressionConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Reload automatically when the main config file changes.
    pub reload_on_change: bool,

    /// Virtual hosts, evaluated in order.
    pub domains: Vec<DomainConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Plaintext bind address (e.g., "0.0.0.0:80").
    pub http_address: String,

    /// TLS bind address (e.g., "0.0.0.0:443").
    pub https_address: String,

    /// Path to certificate file (PEM).
    pub tls_cert: Option<String>,

    /// Path to private key file (PEM).
    pub tls_key: Option<String>,

    /// Serve full routing on the plaintext listener.
    pub plaintext_routing: bool,

    /// Maximum accepted request body size in bytes.
    pub max_request_body_bytes: usize,

    /// Admin API bind address; the admin API is disabled when unset.
    pub admin_address: Option<String>,

    /// Bearer token required by the admin API.
    pub admin_api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_address: "0.0.0.0:80".to_string(),
            https_address: "0.0.0.0:443".to_string(),
            tls_cert: None,
            tls_key: None,
            plaintext_routing: false,
            max_request_body_bytes: 16 * 1024 * 1024,
            admin_address: None,
            admin_api_key: None,
        }
    }
}

impl ServerConfig {
    /// Returns the certificate and key paths when both are configured.
    pub fn tls_paths(&self) -> Option<(&str, &str)> {
        match (&self.tls_cert, &self.tls_key) {
            (Some(cert), Some(key)) => Some((cert.as_str(), key.as_str())),
            _ => None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable response caching for static and proxy routes.
    pub enabled: bool,

    /// Entry lifetime in seconds.
    pub ttl_secs: u64,

    /// Interval between expired-entry sweeps in seconds.
    pub sweep_interval_secs: u64,

    /// Responses with larger bodies are relayed but not cached.
    pub max_entry_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 300,
            sweep_interval_secs: 600,
            max_entry_bytes: 1024 * 1024,
        }
    }
}

/// Response compression configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Enable on-the-fly gzip/deflate compression.
    pub enabled: bool,

    /// Compression level (0-9).
    pub level: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: 6,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total time allowed for a backend to produce response headers.
    pub backend_secs: u64,

    /// Grace period for in-flight requests on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            backend_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

/// A virtual host.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DomainConfig {
    /// Host name, or a regex when `domain_regex` is set.
    pub domain: String,

    /// Treat `domain` as a full-match regex.
    pub domain_regex: bool,

    /// Directory served when no proxy route matches.
    pub static_dir: Option<String>,

    /// Proxy routes, evaluated in order.
    pub proxy_routes: Vec<RouteConfig>,

    /// Certificates for this domain are managed externally via ACME.
    pub autocert: bool,

    /// Contact address for ACME registration.
    pub acme_email: Option<String>,

    /// Redirect plaintext requests to HTTPS.
    pub redirect_to_https: bool,

    /// Send Strict-Transport-Security.
    pub hsts: bool,

    /// Content-Security-Policy value, sent verbatim.
    pub csp: Option<String>,

    /// When non-empty, only these client IPs are served.
    pub allow_ips: Vec<String>,

    /// Client IPs that are always rejected.
    pub deny_ips: Vec<String>,
}

/// A proxy route within a virtual host.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Path prefix, or a regex when `regex` is set.
    pub path: String,

    /// Backend base URL (e.g., "http://127.0.0.1:3000").
    pub backend: String,

    /// Treat `path` as a full-match regex.
    pub regex: bool,

    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,

    /// Token bucket capacity.
    pub burst: u32,

    /// Headers set on the outbound request.
    pub headers: BTreeMap<String, String>,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            backend: String::new(),
            regex: false,
            rate_limit: 0,
            burst: 5,
            headers: BTreeMap::new(),
        }
    }
}
