//! Route matching logic.
//!
//! # Responsibilities
//! - Match the Host header against domain rules (literal or full-match regex)
//! - Match the request path against route rules (segment-aware prefix or regex)
//! - Fall back to static serving, then to an explicit NotFound
//!
//! # Design Decisions
//! - Host matching is case-insensitive and ignores the port
//! - Path matching is case-sensitive
//! - First match wins for domains and for routes
//! - Matching cannot fail: bad patterns never make it into a `RoutingTable`

use crate::routing::table::{DomainRule, HostPattern, PathPattern, RouteRule, RoutingTable};

/// What a matched domain will do with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Index into `DomainRule::routes`.
    Route(usize),
    Static,
    NotFound,
}

/// Outcome of matching a request against the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Unmatched,
    Matched { domain: usize, target: Target },
}

impl Resolution {
    /// Borrow the matched domain and route from the table this came from.
    pub fn lookup<'t>(&self, table: &'t RoutingTable) -> Option<(&'t DomainRule, Option<&'t RouteRule>)> {
        match *self {
            Resolution::Unmatched => None,
            Resolution::Matched { domain, target } => {
                let rule = table.domains.get(domain)?;
                let route = match target {
                    Target::Route(i) => rule.routes.get(i),
                    _ => None,
                };
                Some((rule, route))
            }
        }
    }
}

/// Resolve a (host, path) pair against the table.
pub fn resolve(table: &RoutingTable, host: &str, path: &str) -> Resolution {
    let host = strip_port(host).to_ascii_lowercase();

    let Some(domain) = table.domains.iter().position(|d| d.host.matches(&host)) else {
        return Resolution::Unmatched;
    };
    let rule = &table.domains[domain];

    let target = match rule.routes.iter().position(|r| r.path.matches(path)) {
        Some(i) => Target::Route(i),
        None if rule.static_root.is_some() => Target::Static,
        None => Target::NotFound,
    };

    Resolution::Matched { domain, target }
}

/// Remove a trailing `:port` from a Host header value.
pub fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal: keep everything up to the closing bracket.
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

impl HostPattern {
    /// Returns true if the (port-less, lowercased) host matches.
    pub fn matches(&self, host: &str) -> bool {
        match self {
            HostPattern::Literal(expected) => expected.eq_ignore_ascii_case(host),
            HostPattern::Regex(re) => re.is_match(host),
        }
    }
}

impl PathPattern {
    /// Returns true if the request path matches.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Prefix(prefix) => prefix_matches(prefix, path),
            PathPattern::Regex(re) => re.is_match(path),
        }
    }
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix.ends_with('/') {
        return path.starts_with(prefix);
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
