//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → route.rs (compile regex, drop broken routes)
//!     → Freeze as immutable RouteTable
//!
//! Incoming Request (path, method, headers)
//!     → director.rs (first matching route)
//!     → pick upstream, rewrite destination, stamp filter chain
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - First match wins, in configured order
//! - A broken route disables itself, never the gateway

pub mod director;
pub mod route;

pub use director::{Director, GrpcMethod, FILTERS_HEADER};
pub use route::{Route, RouteError, RouteTable, Upstream};
