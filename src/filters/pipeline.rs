//! Filter pipeline execution.
//!
//! # Responsibilities
//! - Consume the filter chain header stamped by the director
//! - Resolve names against the registry, split into pre/post phases
//! - Run each phase in ascending order around the transport call
//! - Apply the configured failure policy to filter errors
//!
//! # Design Decisions
//! - The chain header never reaches the transport
//! - Unknown filter names are logged and skipped
//! - `fail_open` logs and continues; `fail_closed` aborts the request

use std::sync::Arc;

use axum::body::Body;
use axum::http::{request, Request, Response};

use crate::config::{FailurePolicy, FilterConfig};
use crate::filters::registry::FilterRegistry;
use crate::filters::{Filter, FilterError, FilterPhase, PostFilter, PreFilter};
use crate::observability::metrics;
use crate::routing::FILTERS_HEADER;
use crate::transport::{Transport, UpstreamError};

/// Why a request did not produce an upstream response.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("{phase} filter '{name}' aborted the request: {error}")]
    Filter {
        name: String,
        phase: FilterPhase,
        error: FilterError,
    },
}

/// Filters resolved for one request, each phase sorted.
#[derive(Clone, Default)]
pub struct FilterChain {
    pre: Vec<(String, Arc<dyn PreFilter>)>,
    post: Vec<(String, Arc<dyn PostFilter>)>,
}

impl FilterChain {
    pub fn pre_names(&self) -> Vec<&str> {
        self.pre.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn post_names(&self) -> Vec<&str> {
        self.post.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pre.is_empty() && self.post.is_empty()
    }
}

/// Runs filter chains around a transport.
#[derive(Debug, Clone)]
pub struct FilterPipeline {
    registry: Arc<FilterRegistry>,
    config: FilterConfig,
}

impl FilterPipeline {
    pub fn new(registry: Arc<FilterRegistry>, config: FilterConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    /// Remove the chain header from the request and resolve its filters.
    pub fn take_chain<B>(&self, req: &mut Request<B>) -> FilterChain {
        let raw = req
            .headers_mut()
            .remove(FILTERS_HEADER)
            .and_then(|v| v.to_str().ok().map(str::to_string))
            .unwrap_or_default();

        let mut pre: Vec<(String, i32, Arc<dyn PreFilter>)> = Vec::new();
        let mut post: Vec<(String, i32, Arc<dyn PostFilter>)> = Vec::new();

        for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            match self.registry.get(name) {
                Some(Filter::Pre(f)) => pre.push((name.to_string(), f.order(), Arc::clone(f))),
                Some(Filter::Post(f)) => post.push((name.to_string(), f.order(), Arc::clone(f))),
                None => tracing::warn!(filter = %name, "Unknown filter in chain, skipped"),
            }
        }

        pre.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        post.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        FilterChain {
            pre: pre.into_iter().map(|(n, _, f)| (n, f)).collect(),
            post: post.into_iter().map(|(n, _, f)| (n, f)).collect(),
        }
    }

    /// Run the full pipeline: pre filters, transport, post filters.
    pub async fn execute(
        &self,
        mut req: Request<Body>,
        transport: &dyn Transport,
    ) -> Result<Response<Body>, GatewayError> {
        let chain = self.take_chain(&mut req);

        self.run_pre(&chain, &mut req).await?;

        let (parts, body) = req.into_parts();
        let head = parts.clone();
        let mut outcome = transport.round_trip(Request::from_parts(parts, body)).await;

        self.run_post(&chain, &head, &mut outcome).await?;

        outcome.map_err(GatewayError::Upstream)
    }

    /// Run the pre phase in order.
    pub async fn run_pre(&self, chain: &FilterChain, req: &mut Request<Body>) -> Result<(), GatewayError> {
        for (name, filter) in &chain.pre {
            let result = match filter.should_filter(req) {
                Ok(true) => filter.run(req).await,
                Ok(false) => Ok(()),
                Err(e) => Err(e),
            };
            if let Err(error) = result {
                self.on_error(name, FilterPhase::Pre, error)?;
            }
        }
        Ok(())
    }

    /// Run the post phase in order against the transport outcome.
    pub async fn run_post(
        &self,
        chain: &FilterChain,
        head: &request::Parts,
        outcome: &mut Result<Response<Body>, UpstreamError>,
    ) -> Result<(), GatewayError> {
        for (name, filter) in &chain.post {
            let result = match filter.should_filter(head) {
                Ok(true) => {
                    let (resp, upstream_error) = match &mut *outcome {
                        Ok(resp) => (Some(resp), None),
                        Err(e) => (None, Some(&*e)),
                    };
                    filter.run(head, resp, upstream_error).await
                }
                Ok(false) => Ok(()),
                Err(e) => Err(e),
            };
            if let Err(error) = result {
                self.on_error(name, FilterPhase::Post, error)?;
            }
        }
        Ok(())
    }

    fn on_error(&self, name: &str, phase: FilterPhase, error: FilterError) -> Result<(), GatewayError> {
        metrics::record_filter_error(name, phase.as_str());

        match self.config.policy_for(name) {
            FailurePolicy::FailOpen => {
                tracing::warn!(filter = %name, phase = %phase, error = %error, "Filter failed, continuing");
                Ok(())
            }
            FailurePolicy::FailClosed => {
                tracing::warn!(filter = %name, phase = %phase, error = %error, "Filter failed, aborting request");
                Err(GatewayError::Filter {
                    name: name.to_string(),
                    phase,
                    error,
                })
            }
        }
    }
}
