//! Filters shipped with the gateway.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::AUTHORIZATION;
use axum::http::{request, Request, Response, StatusCode};

use crate::filters::{FilterError, PostFilter, PreFilter};
use crate::transport::UpstreamError;

/// Pre filter checking a bearer token.
///
/// Without a configured key it only logs the request.
#[derive(Debug, Clone, Default)]
pub struct AuthFilter {
    api_key: Option<String>,
}

impl AuthFilter {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }
}

#[async_trait]
impl PreFilter for AuthFilter {
    fn order(&self) -> i32 {
        0
    }

    async fn run(&self, req: &mut Request<Body>) -> Result<(), FilterError> {
        let Some(key) = &self.api_key else {
            tracing::debug!(path = %req.uri().path(), "auth: no key configured, request allowed");
            return Ok(());
        };

        let presented = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        match presented {
            Some(token) if token == key => Ok(()),
            Some(_) => Err(FilterError::rejected(StatusCode::UNAUTHORIZED, "invalid bearer token")),
            None => Err(FilterError::rejected(StatusCode::UNAUTHORIZED, "missing bearer token")),
        }
    }
}

/// Counters kept by [`InspectorFilter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InspectorStats {
    pub inspected: u64,
    pub server_errors: u64,
    pub upstream_errors: u64,
}

/// Post filter logging every upstream outcome.
#[derive(Debug, Default)]
pub struct InspectorFilter {
    inspected: AtomicU64,
    server_errors: AtomicU64,
    upstream_errors: AtomicU64,
}

impl InspectorFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> InspectorStats {
        InspectorStats {
            inspected: self.inspected.load(Ordering::Relaxed),
            server_errors: self.server_errors.load(Ordering::Relaxed),
            upstream_errors: self.upstream_errors.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl PostFilter for InspectorFilter {
    fn order(&self) -> i32 {
        1
    }

    async fn run(
        &self,
        req: &request::Parts,
        resp: Option<&mut Response<Body>>,
        upstream_error: Option<&UpstreamError>,
    ) -> Result<(), FilterError> {
        self.inspected.fetch_add(1, Ordering::Relaxed);

        if let Some(error) = upstream_error {
            self.upstream_errors.fetch_add(1, Ordering::Relaxed);
            tracing::info!(method = %req.method, uri = %req.uri, error = %error, "inspector: upstream failed");
            return Ok(());
        }

        if let Some(resp) = resp {
            if resp.status().is_server_error() {
                self.server_errors.fetch_add(1, Ordering::Relaxed);
            }
            tracing::info!(method = %req.method, uri = %req.uri, status = %resp.status(), "inspector");
        }
        Ok(())
    }
}
