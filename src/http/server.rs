//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the proxy handler
//! - Wire up middleware (tracing, request ID, rate limit, deadline)
//! - Serve on a listener until the shutdown future completes
//! - Direct, filter and dispatch every request
//! - Observability (metrics, correlation IDs)

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::filters::{FilterPipeline, FilterRegistry, GatewayError};
use crate::http::request::{request_id_middleware, RequestId};
use crate::net::InflightTracker;
use crate::observability::metrics;
use crate::resilience::{timeout_middleware, TimeoutSettings};
use crate::routing::{Director, RouteTable, FILTERS_HEADER};
use crate::security::{rate_limit_middleware, RateLimiterState};
use crate::transport::{Dispatcher, Transport};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub director: Arc<Director>,
    pub pipeline: Arc<FilterPipeline>,
    pub transport: Arc<dyn Transport>,
    pub inflight: InflightTracker,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    inflight: InflightTracker,
}

impl HttpServer {
    /// Create a server with the default transports and builtin filters.
    pub fn new(config: &GatewayConfig) -> Self {
        let connect_timeout = Duration::from_secs(config.timeouts.upstream_connect_secs);
        Self::with_transport(config, Arc::new(Dispatcher::with_connect_timeout(connect_timeout)))
    }

    /// Create a server dispatching through `transport`.
    pub fn with_transport(config: &GatewayConfig, transport: Arc<dyn Transport>) -> Self {
        let registry = Arc::new(FilterRegistry::with_builtin(&config.filters));
        Self::with_parts(config, registry, transport)
    }

    /// Create a server from an explicit filter registry and transport.
    pub fn with_parts(
        config: &GatewayConfig,
        registry: Arc<FilterRegistry>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let table = Arc::new(RouteTable::from_config(&config.routes));
        let inflight = InflightTracker::new();

        let state = AppState {
            director: Arc::new(Director::new(table)),
            pipeline: Arc::new(FilterPipeline::new(registry, config.filters.clone())),
            transport,
            inflight: inflight.clone(),
        };

        let router = Self::build_router(config, state);
        Self { router, inflight }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let deadline = Arc::new(TimeoutSettings::from_config(&config.timeouts));

        let mut router = Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(middleware::from_fn_with_state(deadline, timeout_middleware));

        if config.rate_limit.enabled {
            let limiter = Arc::new(RateLimiterState::new(&config.rate_limit));
            router = router.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        router
            .layer(middleware::from_fn(request_id_middleware))
            .layer(TraceLayer::new_for_http())
    }

    /// Requests currently being handled.
    pub fn inflight(&self) -> InflightTracker {
        self.inflight.clone()
    }

    /// Run the server on `listener` until `shutdown` completes, then let
    /// in-flight requests finish.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Directs the request, then runs the filter pipeline around the transport.
async fn proxy_handler(State(state): State<AppState>, mut request: Request<Body>) -> Response {
    let _inflight = state.inflight.track();
    let start_time = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    // The chain is stamped by the director only, never taken from the client.
    if request.headers_mut().remove(FILTERS_HEADER).is_some() {
        tracing::debug!(request_id = %request_id, "Dropped client-supplied filter chain");
    }

    if state.director.direct(&mut request).is_none() {
        tracing::debug!(request_id = %request_id, path = %path, "No route matched, passing through");
    }
    let scheme = request.uri().scheme_str().unwrap_or("none").to_string();

    let response = match state.pipeline.execute(request, state.transport.as_ref()).await {
        Ok(response) => response,
        Err(GatewayError::Upstream(e)) => {
            tracing::error!(
                request_id = %request_id,
                path = %path,
                kind = e.kind(),
                error = %e,
                "Upstream request failed"
            );
            metrics::record_upstream_error(e.kind());
            empty_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
        Err(GatewayError::Filter { name, phase, error }) => {
            tracing::info!(
                request_id = %request_id,
                path = %path,
                filter = %name,
                phase = %phase,
                error = %error,
                "Request aborted by filter"
            );
            empty_response(error.status())
        }
    };

    metrics::record_request(&method, response.status().as_u16(), &scheme, start_time);
    response
}

fn empty_response(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}
