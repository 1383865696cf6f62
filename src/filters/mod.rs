//! Filter subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     registry.rs (explicit registration list) → FilterRegistry (immutable)
//!
//! Per request:
//!     MINI-GATEWAY-FILTERS header (stamped by the director)
//!     → pipeline.rs (resolve, partition pre/post, sort by order)
//!     → pre filters → transport → post filters
//! ```
//!
//! # Design Decisions
//! - Phase is part of the type: a filter is either `Pre` or `Post`
//! - Filters hold no per-request state; shared state must be atomic
//! - Equal orders are broken by registration name

pub mod builtin;
pub mod pipeline;
pub mod registry;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{request, Request, Response, StatusCode};

use crate::transport::UpstreamError;

pub use builtin::{AuthFilter, InspectorFilter, InspectorStats};
pub use pipeline::{FilterPipeline, GatewayError};
pub use registry::{FilterRegistry, RegistryError};

/// Failure raised by a filter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// The filter refused the request with an explicit status.
    #[error("rejected ({status}): {reason}")]
    Rejected { status: StatusCode, reason: String },
    /// The filter itself failed.
    #[error("{0}")]
    Failed(String),
}

impl FilterError {
    pub fn rejected(status: StatusCode, reason: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            reason: reason.into(),
        }
    }

    /// Status returned to the caller when this error aborts a request.
    pub fn status(&self) -> StatusCode {
        match self {
            FilterError::Rejected { status, .. } => *status,
            FilterError::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Phase in which a filter runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterPhase {
    Pre,
    Post,
}

impl FilterPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterPhase::Pre => "pre",
            FilterPhase::Post => "post",
        }
    }
}

impl fmt::Display for FilterPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter executed before the upstream call.
#[async_trait]
pub trait PreFilter: Send + Sync {
    /// Position within the pre phase, ascending.
    fn order(&self) -> i32;

    /// Whether `run` applies to this request.
    fn should_filter(&self, _req: &Request<Body>) -> Result<bool, FilterError> {
        Ok(true)
    }

    async fn run(&self, req: &mut Request<Body>) -> Result<(), FilterError>;
}

/// Filter executed after the upstream call.
///
/// Receives the head of the request as it was sent, and either the
/// upstream response or the transport error.
#[async_trait]
pub trait PostFilter: Send + Sync {
    /// Position within the post phase, ascending.
    fn order(&self) -> i32;

    /// Whether `run` applies to this request.
    fn should_filter(&self, _req: &request::Parts) -> Result<bool, FilterError> {
        Ok(true)
    }

    async fn run(
        &self,
        req: &request::Parts,
        resp: Option<&mut Response<Body>>,
        upstream_error: Option<&UpstreamError>,
    ) -> Result<(), FilterError>;
}

/// A registered filter, tagged with its phase.
#[derive(Clone)]
pub enum Filter {
    Pre(Arc<dyn PreFilter>),
    Post(Arc<dyn PostFilter>),
}

impl Filter {
    pub fn pre(filter: impl PreFilter + 'static) -> Self {
        Filter::Pre(Arc::new(filter))
    }

    pub fn post(filter: impl PostFilter + 'static) -> Self {
        Filter::Post(Arc::new(filter))
    }

    pub fn phase(&self) -> FilterPhase {
        match self {
            Filter::Pre(_) => FilterPhase::Pre,
            Filter::Post(_) => FilterPhase::Post,
        }
    }

    pub fn order(&self) -> i32 {
        match self {
            Filter::Pre(f) => f.order(),
            Filter::Post(f) => f.order(),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("phase", &self.phase())
            .field("order", &self.order())
            .finish()
    }
}
