//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (axum::serve)
//!     → TraceLayer
//!     → request.rs (request ID)
//!     → rate limiter (security)
//!     → request deadline (resilience)
//!     → server.rs proxy handler
//!         → director (routing) → filter pipeline (filters) → transport
//!     → Send to client
//! ```

pub mod request;
pub mod server;

pub use request::{request_id_middleware, RequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
