//! Request deadline enforcement.
//!
//! # Responsibilities
//! - Wrap the handler chain in a wall-clock deadline
//! - Drop the in-flight handler on expiry, releasing its connections
//! - Answer with the configured status and body
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timed-out requests return 504 Gateway Timeout unless configured otherwise

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::config::TimeoutConfig;
use crate::observability::metrics;

/// Resolved deadline settings.
#[derive(Debug, Clone)]
pub struct TimeoutSettings {
    pub request: Duration,
    pub status: StatusCode,
    pub body: String,
}

impl TimeoutSettings {
    pub fn from_config(config: &TimeoutConfig) -> Self {
        let status = StatusCode::from_u16(config.timeout_status).unwrap_or(StatusCode::GATEWAY_TIMEOUT);
        Self {
            request: Duration::from_secs(config.request_secs),
            status,
            body: config.timeout_body.clone(),
        }
    }
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self::from_config(&TimeoutConfig::default())
    }
}

pub async fn timeout_middleware(
    State(settings): State<Arc<TimeoutSettings>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    match tokio::time::timeout(settings.request, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(path = %path, deadline = ?settings.request, "Request deadline exceeded");
            metrics::record_timeout();

            let mut response = Response::new(Body::from(settings.body.clone()));
            *response.status_mut() = settings.status;
            response
        }
    }
}
