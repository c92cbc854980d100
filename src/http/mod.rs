//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum router, trace/limit/catch-panic layers)
//!     → dispatch.rs (snapshot load, builtin endpoints, host matching)
//!     → policy chain → terminal handler
//!     → response.rs (fixed error pages)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod request;
pub mod response;
pub mod server;
pub mod state;

pub use dispatch::Dispatcher;
pub use request::X_REQUEST_ID;
pub use server::{build_router, GatewayServer};
pub use state::{GatewaySettings, GatewayState, Snapshot};
