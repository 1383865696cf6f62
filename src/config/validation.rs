//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, rates > 0)
//! - Check upstream definitions are complete
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Route patterns are NOT compiled here: a bad pattern only disables
//!   its own route when the table is built
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>

use std::net::{IpAddr, SocketAddr};

use crate::config::schema::{GatewayConfig, UpstreamScheme};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),
    #[error("route #{0} has no upstreams")]
    NoUpstreams(usize),
    #[error("route #{route} upstream #{upstream} has an empty host")]
    EmptyHost { route: usize, upstream: usize },
    #[error("route #{route} upstream #{upstream} uses grpc but has no grpc_endpoint")]
    MissingGrpcEndpoint { route: usize, upstream: usize },
    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),
    #[error("timeouts.timeout_status {0} is not a valid HTTP status")]
    TimeoutStatus(u16),
    #[error("rate_limit.{0} must be greater than zero")]
    RateLimit(&'static str),
    #[error("rate_limit.clients entry '{0}' is not an IP address")]
    ClientAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    for (route_idx, route) in config.routes.iter().enumerate() {
        if route.upstreams.is_empty() {
            errors.push(ValidationError::NoUpstreams(route_idx));
        }
        for (upstream_idx, upstream) in route.upstreams.iter().enumerate() {
            if upstream.host.trim().is_empty() && upstream.scheme == UpstreamScheme::Grpc {
                errors.push(ValidationError::EmptyHost {
                    route: route_idx,
                    upstream: upstream_idx,
                });
            }
            let has_endpoint = upstream
                .grpc_endpoint
                .as_deref()
                .is_some_and(|e| !e.is_empty());
            if upstream.scheme == UpstreamScheme::Grpc && !has_endpoint {
                errors.push(ValidationError::MissingGrpcEndpoint {
                    route: route_idx,
                    upstream: upstream_idx,
                });
            }
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }
    if config.timeouts.upstream_connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("upstream_connect_secs"));
    }
    if axum::http::StatusCode::from_u16(config.timeouts.timeout_status).is_err() {
        errors.push(ValidationError::TimeoutStatus(config.timeouts.timeout_status));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.requests_per_second <= 0.0 {
            errors.push(ValidationError::RateLimit("requests_per_second"));
        }
        if config.rate_limit.burst == 0 {
            errors.push(ValidationError::RateLimit("burst"));
        }
        for client in &config.rate_limit.clients {
            if client.parse::<IpAddr>().is_err() {
                errors.push(ValidationError::ClientAddress(client.clone()));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
