//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (inside the policy chain):
//!     → access_control.rs (client IP vs domain allow/deny lists)
//!     → headers.rs (HSTS/CSP on the way out, X-Forwarded-* towards backends)
//!     → rate_limit.rs (per-route token bucket)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in client input: X-Forwarded-For is overwritten, not appended
//! - Plain functions here; `policy` wraps them into chain stages

pub mod access_control;
pub mod headers;
pub mod rate_limit;

pub use rate_limit::{Decision, RateLimiterRegistry, TokenBucket};
