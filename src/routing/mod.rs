//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (startup and every reload):
//!     GatewayConfig.domains
//!     → table.rs (compile regexes, parse backends/headers/IPs)
//!     → Freeze as immutable RoutingTable
//!
//! Incoming Request (host, path)
//!     → matcher.rs resolve()
//!     → Unmatched | Matched { domain, Route | Static | NotFound }
//! ```
//!
//! # Design Decisions
//! - Routes compiled ahead of time, immutable at runtime
//! - Regexes are full-match and compiled once
//! - Deterministic: same input always matches same rule
//! - First match wins, in configured order

pub mod matcher;
pub mod table;

pub use matcher::{resolve, Resolution, Target};
pub use table::{DomainRule, RouteRule, RoutingError, RoutingTable};
