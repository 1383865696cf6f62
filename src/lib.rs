//! mini-gateway: an HTTP/gRPC reverse-proxy gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌───────────────────────────────────────────────────────┐
//!                     │                     MINI-GATEWAY                      │
//!  Client Request     │  ┌─────────┐   ┌──────────┐   ┌──────────┐            │
//!  ───────────────────┼─▶│  net    │──▶│  http    │──▶│ routing  │            │
//!                     │  │listener │   │ server   │   │ director │            │
//!                     │  └─────────┘   └──────────┘   └────┬─────┘            │
//!                     │                                    ▼                  │
//!                     │                              ┌──────────┐             │
//!                     │                              │ filters  │ pre ─┐      │
//!                     │                              │ pipeline │ post◀┤      │
//!                     │                              └──────────┘      ▼      │
//!  Client Response    │                                         ┌──────────┐  │
//!  ◀──────────────────┼─────────────────────────────────────────│transport │──┼──▶ HTTP / gRPC
//!                     │                                         └──────────┘  │    upstreams
//!                     │  Cross-cutting: config, security (rate limit),        │
//!                     │  resilience (deadline), lifecycle, observability      │
//!                     └───────────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod filters;
pub mod http;
pub mod net;
pub mod routing;
pub mod transport;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::{Gateway, Shutdown};
