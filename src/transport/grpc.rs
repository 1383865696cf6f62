//! JSON-to-gRPC bridging transport.
//!
//! # Responsibilities
//! - Build the JSON payload from the query string or the request body
//! - Hand target, method and payload to a [`GrpcInvoker`]
//! - Fold the outcome into a 200 (JSON) or 500 (empty) response

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Response, StatusCode};
use serde_json::{Map, Value};

use crate::observability::metrics;
use crate::routing::GrpcMethod;
use crate::transport::{Transport, UpstreamError};

/// Largest request body accepted as a gRPC payload.
const MAX_PAYLOAD_BYTES: usize = 4 * 1024 * 1024;

/// Failure while invoking a gRPC method.
#[derive(Debug, thiserror::Error)]
pub enum GrpcError {
    #[error("invalid gRPC target '{0}'")]
    InvalidTarget(String),
    #[error("failed to dial {target}: {source}")]
    Dial {
        target: String,
        #[source]
        source: tonic::transport::Error,
    },
    #[error("reflection against {target} failed: {reason}")]
    Reflection { target: String, reason: String },
    #[error("method '{0}' not found")]
    UnknownMethod(String),
    #[error("method '{0}' is streaming; only unary calls are bridged")]
    Streaming(String),
    #[error("failed to encode request: {0}")]
    Encode(String),
    #[error("failed to decode reply: {0}")]
    Decode(String),
    #[error("upstream returned {code:?}: {message}")]
    Status { code: tonic::Code, message: String },
}

impl GrpcError {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GrpcError::InvalidTarget(_) | GrpcError::Dial { .. } => "grpc_dial",
            GrpcError::Reflection { .. } => "grpc_reflection",
            GrpcError::UnknownMethod(_) | GrpcError::Streaming(_) => "grpc_method",
            GrpcError::Encode(_) => "grpc_encode",
            GrpcError::Decode(_) => "grpc_decode",
            GrpcError::Status { .. } => "grpc_status",
        }
    }
}

/// Performs one unary call described by JSON.
#[async_trait]
pub trait GrpcInvoker: Send + Sync {
    /// Call `symbol` on `target` with a JSON `payload`, returning the JSON reply.
    async fn invoke(&self, target: &str, symbol: &str, payload: &str) -> Result<String, GrpcError>;
}

/// Transport for routes whose upstream scheme is `grpc`.
#[derive(Clone)]
pub struct GrpcTransport {
    invoker: Arc<dyn GrpcInvoker>,
}

impl GrpcTransport {
    pub fn new(invoker: Arc<dyn GrpcInvoker>) -> Self {
        Self { invoker }
    }
}

#[async_trait]
impl Transport for GrpcTransport {
    async fn round_trip(&self, req: Request<Body>) -> Result<Response<Body>, UpstreamError> {
        let Some(target) = req.uri().authority().map(|a| a.to_string()) else {
            return Err(UpstreamError::MissingTarget);
        };
        let Some(GrpcMethod(symbol)) = req.extensions().get::<GrpcMethod>().cloned() else {
            return Err(UpstreamError::MissingGrpcMethod);
        };

        let query = req.uri().query().filter(|q| !q.is_empty()).map(str::to_string);
        let payload = match query {
            Some(query) => query_to_json(&query),
            None => {
                let bytes = axum::body::to_bytes(req.into_body(), MAX_PAYLOAD_BYTES)
                    .await
                    .map_err(UpstreamError::Body)?;
                String::from_utf8(bytes.to_vec())
                    .map_err(|e| UpstreamError::Payload(e.to_string()))?
            }
        };

        match self.invoker.invoke(&target, &symbol, &payload).await {
            Ok(json) => {
                let mut resp = Response::new(Body::from(json));
                resp.headers_mut()
                    .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Ok(resp)
            }
            Err(e) => {
                match &e {
                    GrpcError::Status { code, message } => tracing::warn!(
                        target_host = %target,
                        method = %symbol,
                        code = ?code,
                        message = %message,
                        "gRPC upstream returned an error status"
                    ),
                    other => tracing::error!(
                        target_host = %target,
                        method = %symbol,
                        kind = other.kind(),
                        error = %other,
                        "gRPC invocation failed"
                    ),
                }
                metrics::record_upstream_error(e.kind());

                let mut resp = Response::new(Body::empty());
                *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                Ok(resp)
            }
        }
    }
}

/// Turn `a=1&b=x` into `{"a":"1","b":"x"}`.
///
/// Pairs split on the first `=`; a pair without one maps to an empty
/// string and empty pairs are skipped. Values are not percent-decoded.
pub fn query_to_json(query: &str) -> String {
    let mut object = Map::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        object.insert(key.to_string(), Value::String(value.to_string()));
    }
    Value::Object(object).to_string()
}
