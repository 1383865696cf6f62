//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared to subsystems at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a process restart
//!   (SIGHUP re-executes the binary, which re-reads the file)
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    FailurePolicy, FilterConfig, GatewayConfig, LifecycleConfig, ListenerConfig,
    ObservabilityConfig, RateLimitConfig, RateLimitMode, RouteConfig, TimeoutConfig,
    UpstreamConfig, UpstreamScheme,
};
