//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Ordered route table. First match wins.
    pub routes: Vec<RouteConfig>,

    /// Filter pipeline settings.
    pub filters: FilterConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Restart and drain settings.
    pub lifecycle: LifecycleConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A single route: path pattern, candidate upstreams and filter chain.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Regular expression matched against the request path.
    /// The first capture group becomes the upstream path for HTTP upstreams.
    pub pattern: String,

    /// Candidate upstreams. One is picked at random per request.
    pub upstreams: Vec<UpstreamConfig>,

    /// Names of registered filters applied to matching requests.
    #[serde(default)]
    pub filters: Vec<String>,
}

/// Protocol spoken to an upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamScheme {
    #[default]
    Http,
    Grpc,
}

impl UpstreamScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamScheme::Http => "http",
            UpstreamScheme::Grpc => "grpc",
        }
    }
}

impl std::fmt::Display for UpstreamScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream server definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Upstream authority (e.g., "localhost:8081").
    pub host: String,

    /// Protocol to use (default: http).
    #[serde(default)]
    pub scheme: UpstreamScheme,

    /// Fully qualified gRPC method, e.g. "proto.GrpcUpstreamService/Hello".
    /// Required when `scheme = "grpc"`.
    #[serde(default)]
    pub grpc_endpoint: Option<String>,
}

/// How a filter failure affects the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failure and keep going.
    #[default]
    FailOpen,
    /// Abort the pipeline and answer with the failure's status.
    FailClosed,
}

/// Filter pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    /// Policy applied to filters without an explicit override.
    pub failure_policy: FailurePolicy,

    /// Per-filter policy overrides keyed by filter name.
    pub policies: HashMap<String, FailurePolicy>,

    /// Bearer token required by the `auth` filter. Unset means log only.
    pub auth_api_key: Option<String>,
}

impl FilterConfig {
    /// Effective failure policy for the named filter.
    pub fn policy_for(&self, name: &str) -> FailurePolicy {
        self.policies
            .get(name)
            .copied()
            .unwrap_or(self.failure_policy)
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Wall-clock deadline for a whole request in seconds.
    pub request_secs: u64,

    /// Connect timeout towards upstreams in seconds.
    pub upstream_connect_secs: u64,

    /// Status code returned when the request deadline elapses.
    pub timeout_status: u16,

    /// Body returned when the request deadline elapses.
    pub timeout_body: String,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 60,
            upstream_connect_secs: 5,
            timeout_status: 504,
            timeout_body: "gateway timeout".to_string(),
        }
    }
}

/// Rate limiter keying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitMode {
    /// One bucket shared by every caller.
    #[default]
    Global,
    /// One bucket per caller IP address.
    PerClient,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable the admission gate.
    pub enabled: bool,

    /// Bucket keying.
    pub mode: RateLimitMode,

    /// Sustained refill rate (tokens per second).
    pub requests_per_second: f64,

    /// Bucket capacity.
    pub burst: u32,

    /// Per-client mode only: addresses subject to limiting. Empty means all.
    pub clients: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: RateLimitMode::Global,
            requests_per_second: 1.0,
            burst: 1,
            clients: Vec::new(),
        }
    }
}

/// Process lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Upper bound on waiting for in-flight requests during a drain.
    pub drain_timeout_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "mini_gateway=debug,tower_http=info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
