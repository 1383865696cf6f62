//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (manager.rs):
//!     MINI_GATEWAY_CONTINUE set?  → adopt descriptor 3 : bind address
//!     → serve → (replacement) SIGTERM parent
//!
//! Signals (signals.rs → mpsc queue → manager.rs):
//!     SIGHUP          → handoff.rs spawns a replacement on the same socket
//!     SIGINT/SIGTERM  → drain
//!
//! Shutdown (shutdown.rs):
//!     trigger → stop accepting → in-flight finish (bounded) → exit
//! ```
//!
//! # Design Decisions
//! - The listening socket is never closed across a restart
//! - Spawn failures are logged; the current process keeps serving
//! - Drain has a deadline: remaining requests are abandoned after it

pub mod handoff;
pub mod manager;
pub mod shutdown;
pub mod signals;

use std::io;

use crate::net::ListenerError;

pub use handoff::{default_handoff, Handoff, CONTINUE_ENV, INHERITED_FD};
pub use manager::{Gateway, LifecycleState};
pub use shutdown::Shutdown;
pub use signals::{spawn_signal_listener, LifecycleSignal};

/// Errors raised while starting, restarting or stopping the gateway.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error("failed to spawn replacement process: {0}")]
    Spawn(#[source] io::Error),
    #[error("failed to signal parent process: {0}")]
    Notify(String),
    #[error("process handoff is not supported on this platform")]
    Unsupported,
    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] io::Error),
    #[error("server failed: {0}")]
    Serve(#[source] io::Error),
    #[error("server task failed: {0}")]
    Task(String),
    #[error("server stopped without a shutdown request")]
    UnexpectedStop,
}
