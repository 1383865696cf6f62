//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request:
//!     → timeouts.rs (wall-clock deadline around the whole handler)
//!     → on expiry: handler future dropped, fixed status/body returned
//! ```
//!
//! # Design Decisions
//! - Every request has a deadline
//! - Upstream connect timeouts live in the transports

pub mod timeouts;

pub use timeouts::{timeout_middleware, TimeoutSettings};
