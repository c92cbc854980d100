//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection (axum-server)
//!     → tls.rs (rustls handshake on the HTTPS listener)
//!     → http::server (axum router → Dispatcher)
//! ```
//!
//! # Design Decisions
//! - Accepting and connection tracking are left to axum-server
//! - TLS material can be swapped on a running listener during reload

pub mod tls;

pub use tls::{load_tls_config, reload_tls_config};
