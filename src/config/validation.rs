//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Compile every regex once to reject bad patterns before they go live
//! - Validate backend URLs, header overrides, IP lists and listen addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::path::Path;

use axum::http::{HeaderName, HeaderValue};
use url::Url;

use crate::config::schema::{DomainConfig, GatewayConfig, RouteConfig};
use crate::routing::table::{compile_full_match, parse_ip};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("domains[{index}]: domain pattern is empty")]
    EmptyDomain { index: usize },

    #[error("domain '{domain}': invalid regex: {reason}")]
    DomainRegex { domain: String, reason: String },

    #[error("domain '{domain}' route '{path}': invalid path regex: {reason}")]
    PathRegex { domain: String, path: String, reason: String },

    #[error("domain '{domain}' route '{path}': literal path must start with '/'")]
    RelativePath { domain: String, path: String },

    #[error("domain '{domain}' route '{path}': invalid backend URL '{backend}': {reason}")]
    Backend { domain: String, path: String, backend: String, reason: String },

    #[error("domain '{domain}' route '{path}': invalid header override '{name}'")]
    Header { domain: String, path: String, name: String },

    #[error("domain '{domain}': rate limit burst must be at least 1 for route '{path}'")]
    Burst { domain: String, path: String },

    #[error("domain '{domain}': invalid IP address '{ip}'")]
    IpAddress { domain: String, ip: String },

    #[error("domain '{domain}': static directory '{dir}' does not exist")]
    StaticDir { domain: String, dir: String },

    #[error("server.{field}: invalid socket address '{value}'")]
    ListenAddress { field: &'static str, value: String },

    #[error("server: tls_cert and tls_key must be configured together")]
    TlsPair,

    #[error("cache.ttl_secs must be greater than zero")]
    CacheTtl,

    #[error("compression.level must be between 0 and 9")]
    CompressionLevel,
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "http_address", &config.server.http_address);
    check_address(&mut errors, "https_address", &config.server.https_address);
    if let Some(admin) = &config.server.admin_address {
        check_address(&mut errors, "admin_address", admin);
    }
    if config.server.tls_cert.is_some() != config.server.tls_key.is_some() {
        errors.push(ValidationError::TlsPair);
    }
    if config.cache.ttl_secs == 0 {
        errors.push(ValidationError::CacheTtl);
    }
    if config.compression.level > 9 {
        errors.push(ValidationError::CompressionLevel);
    }

    for (index, domain) in config.domains.iter().enumerate() {
        validate_domain(&mut errors, index, domain);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::ListenAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn validate_domain(errors: &mut Vec<ValidationError>, index: usize, domain: &DomainConfig) {
    if domain.domain.trim().is_empty() {
        errors.push(ValidationError::EmptyDomain { index });
    }

    if domain.domain_regex {
        if let Err(e) = compile_full_match(&domain.domain) {
            errors.push(ValidationError::DomainRegex {
                domain: domain.domain.clone(),
                reason: e.to_string(),
            });
        }
    }

    if let Some(dir) = &domain.static_dir {
        if !Path::new(dir).is_dir() {
            errors.push(ValidationError::StaticDir {
                domain: domain.domain.clone(),
                dir: dir.clone(),
            });
        }
    }

    for ip in domain.allow_ips.iter().chain(domain.deny_ips.iter()) {
        if parse_ip(ip).is_none() {
            errors.push(ValidationError::IpAddress {
                domain: domain.domain.clone(),
                ip: ip.clone(),
            });
        }
    }

    for route in &domain.proxy_routes {
        validate_route(errors, &domain.domain, route);
    }
}

fn validate_route(errors: &mut Vec<ValidationError>, domain: &str, route: &RouteConfig) {
    if route.regex {
        if let Err(e) = compile_full_match(&route.path) {
            errors.push(ValidationError::PathRegex {
                domain: domain.to_string(),
                path: route.path.clone(),
                reason: e.to_string(),
            });
        }
    } else if !route.path.starts_with('/') {
        errors.push(ValidationError::RelativePath {
            domain: domain.to_string(),
            path: route.path.clone(),
        });
    }

    if let Err(reason) = check_backend(&route.backend) {
        errors.push(ValidationError::Backend {
            domain: domain.to_string(),
            path: route.path.clone(),
            backend: route.backend.clone(),
            reason,
        });
    }

    for (name, value) in &route.headers {
        let valid = HeaderName::from_bytes(name.as_bytes()).is_ok()
            && HeaderValue::from_str(value).is_ok();
        if !valid {
            errors.push(ValidationError::Header {
                domain: domain.to_string(),
                path: route.path.clone(),
                name: name.clone(),
            });
        }
    }

    if route.rate_limit > 0 && route.burst == 0 {
        errors.push(ValidationError::Burst {
            domain: domain.to_string(),
            path: route.path.clone(),
        });
    }
}

fn check_backend(backend: &str) -> Result<(), String> {
    let url = Url::parse(backend).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(path: &str, backend: &str) -> RouteConfig {
        RouteConfig {
            path: path.to_string(),
            backend: backend.to_string(),
            ..RouteConfig::default()
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.server.tls_cert = Some("cert.pem".into());
        config.domains.push(DomainConfig {
            domain: "([".into(),
            domain_regex: true,
            allow_ips: vec!["not-an-ip".into()],
            proxy_routes: vec![
                route("api", "http://127.0.0.1:3000"),
                route("/x", "ftp://example.com"),
            ],
            ..DomainConfig::default()
        });

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::TlsPair));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::DomainRegex { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::IpAddress { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::RelativePath { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::Backend { .. })));
    }

    #[test]
    fn rejects_bad_path_regex_and_header() {
        let mut bad = route("/v[0-9", "http://127.0.0.1:3000");
        bad.regex = true;
        bad.headers.insert("Bad Header".into(), "x".into());

        let mut config = GatewayConfig::default();
        config.domains.push(DomainConfig {
            domain: "example.com".into(),
            proxy_routes: vec![bad],
            ..DomainConfig::default()
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn rejects_missing_static_dir() {
        let mut config = GatewayConfig::default();
        config.domains.push(DomainConfig {
            domain: "example.com".into(),
            static_dir: Some("/definitely/not/here".into()),
            ..DomainConfig::default()
        });

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::StaticDir { .. }));
    }
}
