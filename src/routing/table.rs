//! Compiled routing table.
//!
//! # Responsibilities
//! - Turn validated `GatewayConfig` domains into immutable, ready-to-match rules
//! - Compile every regex exactly once
//! - Pre-parse backend URLs, header overrides and IP lists
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Rules keep configured order; the matcher relies on it for first-match-wins
//! - Building can fail even after validation (e.g. a static dir vanished is
//!   fine, a regex is not), so `from_config` returns a `Result`

use std::collections::HashSet;
use std::net::IpAddr;
use std::path::PathBuf;

use axum::http::{HeaderName, HeaderValue};
use regex::Regex;
use url::Url;

use crate::config::schema::{DomainConfig, GatewayConfig, RouteConfig};

/// Error building a routing table.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("invalid regex '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid backend URL '{backend}': {source}")]
    Backend {
        backend: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid header override '{name}'")]
    Header { name: String },

    #[error("invalid IP address '{value}'")]
    Ip { value: String },
}

/// Compile a pattern so it only matches the whole input.
pub fn compile_full_match(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", pattern))
}

/// Parse an IP address into its canonical form (IPv4-mapped IPv6 becomes IPv4).
pub fn parse_ip(value: &str) -> Option<IpAddr> {
    value.trim().parse::<IpAddr>().ok().map(|ip| ip.to_canonical())
}

/// How a domain rule matches the Host header.
#[derive(Debug, Clone)]
pub enum HostPattern {
    /// Lowercased host name, compared ASCII case-insensitively.
    Literal(String),
    Regex(Regex),
}

/// How a route rule matches the request path.
#[derive(Debug, Clone)]
pub enum PathPattern {
    /// Segment-aware prefix.
    Prefix(String),
    Regex(Regex),
}

/// Per-domain security settings.
#[derive(Debug, Clone, Default)]
pub struct SecurityPolicy {
    pub hsts: bool,
    pub csp: Option<HeaderValue>,
    pub allow: HashSet<IpAddr>,
    pub deny: HashSet<IpAddr>,
}

/// A compiled proxy route.
#[derive(Debug, Clone)]
pub struct RouteRule {
    /// Stable identity used to key the rate limiter ("domain path").
    pub id: String,
    /// Path pattern exactly as configured.
    pub source: String,
    pub path: PathPattern,
    pub backend: Url,
    pub rate_limit: u32,
    pub burst: u32,
    pub headers: Vec<(HeaderName, HeaderValue)>,
}

impl RouteRule {
    /// Returns the configured path pattern as written.
    pub fn pattern(&self) -> &str {
        &self.source
    }
}

/// A compiled virtual host.
#[derive(Debug, Clone)]
pub struct DomainRule {
    /// The domain as configured; used in logs and limiter keys.
    pub name: String,
    pub host: HostPattern,
    pub static_root: Option<PathBuf>,
    pub routes: Vec<RouteRule>,
    pub security: SecurityPolicy,
    pub autocert: bool,
    pub redirect_to_https: bool,
}

/// Immutable snapshot of all virtual hosts.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    pub domains: Vec<DomainRule>,
}

impl RoutingTable {
    /// Build the table from a validated configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, RoutingError> {
        let domains = config
            .domains
            .iter()
            .map(build_domain)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { domains })
    }

    /// True when no virtual hosts are configured.
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Number of virtual hosts.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Iterate over every route together with its domain.
    pub fn routes(&self) -> impl Iterator<Item = (&DomainRule, &RouteRule)> {
        self.domains
            .iter()
            .flat_map(|d| d.routes.iter().map(move |r| (d, r)))
    }
}

fn build_domain(cfg: &DomainConfig) -> Result<DomainRule, RoutingError> {
    let host = if cfg.domain_regex {
        HostPattern::Regex(compile(&cfg.domain)?)
    } else {
        HostPattern::Literal(cfg.domain.trim().to_ascii_lowercase())
    };

    let routes = cfg
        .proxy_routes
        .iter()
        .map(|r| build_route(&cfg.domain, r))
        .collect::<Result<Vec<_>, _>>()?;

    let csp = cfg
        .csp
        .as_deref()
        .map(|v| {
            HeaderValue::from_str(v).map_err(|_| RoutingError::Header {
                name: "Content-Security-Policy".to_string(),
            })
        })
        .transpose()?;

    Ok(DomainRule {
        name: cfg.domain.clone(),
        host,
        static_root: cfg.static_dir.as_ref().map(PathBuf::from),
        routes,
        security: SecurityPolicy {
            hsts: cfg.hsts,
            csp,
            allow: ip_set(&cfg.allow_ips)?,
            deny: ip_set(&cfg.deny_ips)?,
        },
        autocert: cfg.autocert,
        redirect_to_https: cfg.redirect_to_https,
    })
}

fn build_route(domain: &str, cfg: &RouteConfig) -> Result<RouteRule, RoutingError> {
    let path = if cfg.regex {
        PathPattern::Regex(compile(&cfg.path)?)
    } else {
        PathPattern::Prefix(cfg.path.clone())
    };

    let backend = Url::parse(&cfg.backend).map_err(|source| RoutingError::Backend {
        backend: cfg.backend.clone(),
        source,
    })?;

    let headers = cfg
        .headers
        .iter()
        .map(|(name, value)| {
            let parsed_name = HeaderName::from_bytes(name.as_bytes());
            let parsed_value = HeaderValue::from_str(value);
            match (parsed_name, parsed_value) {
                (Ok(n), Ok(v)) => Ok((n, v)),
                _ => Err(RoutingError::Header { name: name.clone() }),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RouteRule {
        id: format!("{} {}", domain, cfg.path),
        source: cfg.path.clone(),
        path,
        backend,
        rate_limit: cfg.rate_limit,
        burst: cfg.burst.max(1),
        headers,
    })
}

fn compile(pattern: &str) -> Result<Regex, RoutingError> {
    compile_full_match(pattern).map_err(|source| RoutingError::Regex {
        pattern: pattern.to_string(),
        source,
    })
}

fn ip_set(values: &[String]) -> Result<HashSet<IpAddr>, RoutingError> {
    values
        .iter()
        .map(|v| parse_ip(v).ok_or_else(|| RoutingError::Ip { value: v.clone() }))
        .collect()
}
