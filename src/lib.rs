//! HTTP edge gateway library: virtual-host routing, static files, reverse
//! proxying and per-route admission policies.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;

// Request pipeline
pub mod cache;
pub mod handlers;
pub mod policy;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::GatewayConfig;
pub use http::{Dispatcher, GatewayServer, GatewayState};
pub use lifecycle::Shutdown;
