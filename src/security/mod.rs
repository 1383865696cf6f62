//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (admission gate, global or per client IP)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Admission happens before any routing or upstream work
//! - Denied requests get 429 with an empty body

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, RateLimiterState};
