//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Fresh start:   bind configured address        ┐
//! Replacement:   adopt inherited descriptor 3   ┴→ listener.rs (GatewayListener)
//!     → into_parts: tokio listener (serving) + std handle (handoff)
//!     → inflight.rs (per-request guards, drain accounting)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - The listening socket outlives any single process across a restart
//! - In-flight requests are counted so a drain can report what it waited on

pub mod inflight;
pub mod listener;

pub use inflight::{InflightGuard, InflightTracker};
pub use listener::{GatewayListener, ListenerError};
