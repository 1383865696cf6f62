//! Token bucket admission gate.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;

use crate::config::{RateLimitConfig, RateLimitMode};
use crate::observability::metrics;

/// A simple token bucket rate limiter.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared limiter state.
#[derive(Debug)]
pub struct RateLimiterState {
    mode: RateLimitMode,
    rps: f64,
    burst: f64,
    global: Mutex<TokenBucket>,
    per_client: DashMap<IpAddr, TokenBucket>,
    /// Per-client mode: only these addresses are limited. Empty means all.
    clients: Vec<IpAddr>,
}

impl RateLimiterState {
    pub fn new(config: &RateLimitConfig) -> Self {
        let burst = f64::from(config.burst.max(1));
        let clients = config
            .clients
            .iter()
            .filter_map(|c| match c.parse::<IpAddr>() {
                Ok(ip) => Some(ip),
                Err(_) => {
                    tracing::warn!(client = %c, "Ignoring unparsable rate limit client");
                    None
                }
            })
            .collect();

        Self {
            mode: config.mode,
            rps: config.requests_per_second,
            burst,
            global: Mutex::new(TokenBucket::new(burst)),
            per_client: DashMap::new(),
            clients,
        }
    }

    /// Take a token for `client`. `None` means the caller address is unknown.
    pub fn check(&self, client: Option<IpAddr>) -> bool {
        match self.mode {
            RateLimitMode::Global => {
                let mut bucket = match self.global.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                bucket.try_acquire(self.burst, self.rps)
            }
            RateLimitMode::PerClient => {
                let ip = client.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
                if !self.clients.is_empty() && !self.clients.contains(&ip) {
                    return true;
                }
                self.per_client
                    .entry(ip)
                    .or_insert_with(|| TokenBucket::new(self.burst))
                    .try_acquire(self.burst, self.rps)
            }
        }
    }

    pub fn mode(&self) -> RateLimitMode {
        self.mode
    }
}

/// Middleware function for the admission gate.
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    if state.check(client) {
        next.run(request).await
    } else {
        let mode = match state.mode() {
            RateLimitMode::Global => "global",
            RateLimitMode::PerClient => "per_client",
        };
        tracing::debug!(client = ?client, mode, "Rate limit exceeded");
        metrics::record_rate_limited(mode);

        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
        response
    }
}
