//! Compiled route table.

use regex::Regex;

use crate::config::{RouteConfig, UpstreamConfig, UpstreamScheme};

/// One backend target a route may forward to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    pub host: String,
    pub scheme: UpstreamScheme,
    pub grpc_endpoint: Option<String>,
}

impl From<UpstreamConfig> for Upstream {
    fn from(config: UpstreamConfig) -> Self {
        Self {
            host: config.host,
            scheme: config.scheme,
            grpc_endpoint: config.grpc_endpoint,
        }
    }
}

/// A route with its pattern compiled.
#[derive(Debug, Clone)]
pub struct Route {
    pattern: Regex,
    upstreams: Vec<Upstream>,
    filters: Vec<String>,
}

impl Route {
    pub fn new(pattern: Regex, upstreams: Vec<Upstream>, filters: Vec<String>) -> Self {
        Self {
            pattern,
            upstreams,
            filters,
        }
    }

    /// Compile one configured route.
    pub fn compile(config: &RouteConfig) -> Result<Self, RouteError> {
        let pattern = Regex::new(&config.pattern).map_err(|source| RouteError::InvalidPattern {
            pattern: config.pattern.clone(),
            source,
        })?;

        if config.upstreams.is_empty() {
            return Err(RouteError::NoUpstreams(config.pattern.clone()));
        }

        let upstreams = config.upstreams.iter().cloned().map(Upstream::from).collect();
        Ok(Self::new(pattern, upstreams, config.filters.clone()))
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn upstreams(&self) -> &[Upstream] {
        &self.upstreams
    }

    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    /// Whether the pattern declares a group that can supply a rewritten path.
    pub fn has_capture_group(&self) -> bool {
        self.pattern.captures_len() > 1
    }
}

/// Why a configured route could not be compiled.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("route '{0}' has no upstreams")]
    NoUpstreams(String),
}

/// Ordered, immutable list of routes.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Compile routes from configuration.
    ///
    /// Routes with an invalid pattern or without upstreams are logged and
    /// skipped; the remaining routes keep their relative order.
    pub fn from_config(configs: &[RouteConfig]) -> Self {
        let mut routes = Vec::with_capacity(configs.len());

        for (index, config) in configs.iter().enumerate() {
            match Route::compile(config) {
                Ok(route) => routes.push(route),
                Err(e) => {
                    tracing::warn!(route = index, error = %e, "Route ignored");
                }
            }
        }

        tracing::info!(configured = configs.len(), active = routes.len(), "Route table compiled");
        Self { routes }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
