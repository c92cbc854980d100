//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! gateway.toml + conf.d/*.toml
//!     → loader.rs (parse, merge domains in file-name order)
//!     → validation.rs (semantic checks, all errors at once)
//!     → GatewayConfig (validated, immutable)
//!     → routing::RoutingTable::from_config
//!
//! On reload trigger (SIGHUP, watcher.rs, POST /admin/reload):
//!     lifecycle::reload loads + validates again
//!     → new snapshot built
//!     → atomic swap; the old snapshot stays if anything fails
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - A broken drop-in file is skipped, a broken main file is fatal

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError, ConfigSource};
pub use schema::{DomainConfig, GatewayConfig, RouteConfig};
pub use validation::{validate_config, ValidationError};
