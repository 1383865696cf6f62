//! Upstream transports.
//!
//! # Data Flow
//! ```text
//! Request (destination already rewritten by the director)
//!     → Dispatcher (scheme == "grpc" ?)
//!         → grpc.rs  (JSON payload → reflection invoker → JSON reply)
//!         → http.rs  (pooled hyper client, pass-through)
//! ```
//!
//! # Design Decisions
//! - Transport failures are values, never panics
//! - gRPC outcomes are folded into a 200/500 response; only local
//!   payload problems surface as `UpstreamError`

pub mod grpc;
pub mod http;
pub mod reflection;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};

pub use grpc::{GrpcError, GrpcInvoker, GrpcTransport};
pub use http::HttpTransport;
pub use reflection::ReflectionInvoker;

/// Failure to obtain a response from an upstream.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("request has no upstream destination")]
    MissingTarget,
    #[error("upstream request to {target} failed: {source}")]
    Http {
        target: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },
    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),
    #[error("gRPC request is not bound to a method")]
    MissingGrpcMethod,
    #[error("invalid gRPC payload: {0}")]
    Payload(String),
}

impl UpstreamError {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::MissingTarget => "missing_target",
            UpstreamError::Http { .. } => "http",
            UpstreamError::Body(_) => "body",
            UpstreamError::MissingGrpcMethod => "missing_grpc_method",
            UpstreamError::Payload(_) => "payload",
        }
    }
}

/// One round trip to an upstream.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn round_trip(&self, req: Request<Body>) -> Result<Response<Body>, UpstreamError>;
}

/// Picks the transport matching the request's destination scheme.
#[derive(Clone)]
pub struct Dispatcher {
    http: Arc<dyn Transport>,
    grpc: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(http: Arc<dyn Transport>, grpc: Arc<dyn Transport>) -> Self {
        Self { http, grpc }
    }

    /// Default transports with the given upstream connect timeout.
    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        let invoker = Arc::new(ReflectionInvoker::new(connect_timeout));
        Self::new(
            Arc::new(HttpTransport::new(connect_timeout)),
            Arc::new(GrpcTransport::new(invoker)),
        )
    }
}

#[async_trait]
impl Transport for Dispatcher {
    async fn round_trip(&self, req: Request<Body>) -> Result<Response<Body>, UpstreamError> {
        if req.uri().scheme_str() == Some("grpc") {
            self.grpc.round_trip(req).await
        } else {
            self.http.round_trip(req).await
        }
    }
}
