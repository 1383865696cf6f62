//! Process lifecycle orchestration.
//!
//! # Responsibilities
//! - Acquire the listening socket (bind or inherit)
//! - Serve, and retire the parent when running as a replacement
//! - React to reload/interrupt events from the signal queue
//! - Drain in-flight requests within a deadline
//!
//! # Design Decisions
//! - Fail fast: a bad inherited descriptor is fatal
//! - A failed restart is logged and the process keeps serving
//! - The server stopping on its own is an error

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinError;

use crate::config::GatewayConfig;
use crate::http::HttpServer;
use crate::lifecycle::handoff::{self, Handoff, INHERITED_FD};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::{self, LifecycleSignal};
use crate::lifecycle::LifecycleError;
use crate::net::GatewayListener;

/// Where the process is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Serving,
    /// A replacement was spawned; serving until it retires us.
    Restarting,
    Draining,
    Terminated,
}

/// A gateway process: one server, one socket, one lifecycle.
pub struct Gateway {
    config: GatewayConfig,
    server: HttpServer,
    handoff: Arc<dyn Handoff>,
    shutdown: Shutdown,
    state: watch::Sender<LifecycleState>,
}

impl Gateway {
    pub fn new(config: GatewayConfig, server: HttpServer, handoff: Arc<dyn Handoff>) -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        Self {
            config,
            server,
            handoff,
            shutdown: Shutdown::new(),
            state,
        }
    }

    /// Handle that drains the gateway when triggered.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Observe lifecycle transitions.
    pub fn state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Bind the configured address, or adopt descriptor 3 when started as
    /// a replacement.
    pub fn acquire_listener(config: &GatewayConfig) -> Result<GatewayListener, LifecycleError> {
        if handoff::is_replacement() {
            tracing::info!(fd = INHERITED_FD, "Starting as replacement process");
            Ok(GatewayListener::inherit(INHERITED_FD)?)
        } else {
            Ok(GatewayListener::bind(&config.listener.bind_address)?)
        }
    }

    /// Full process run: acquire the socket, install signal handlers, serve.
    pub async fn run(config: GatewayConfig) -> Result<(), LifecycleError> {
        let listener = Self::acquire_listener(&config)?;

        let (tx, rx) = mpsc::channel(8);
        let _signals = signals::spawn_signal_listener(tx).map_err(LifecycleError::Signals)?;

        let server = HttpServer::new(&config);
        let handoff = handoff::default_handoff()?;
        Self::new(config, server, handoff).serve(listener, rx).await
    }

    /// Serve on `listener` until an interrupt (or the shutdown handle)
    /// drains the gateway.
    pub async fn serve(
        self,
        listener: GatewayListener,
        mut signals: mpsc::Receiver<LifecycleSignal>,
    ) -> Result<(), LifecycleError> {
        let Gateway {
            config,
            server,
            handoff,
            shutdown,
            state,
        } = self;

        let inherited = listener.inherited();
        let (listener, handle) = listener.into_parts()?;
        let inflight = server.inflight();

        let server_shutdown = {
            let shutdown = shutdown.clone();
            async move { shutdown.wait().await }
        };
        let mut serve_task = tokio::spawn(server.run(listener, server_shutdown));
        state.send_replace(LifecycleState::Serving);

        if inherited {
            if let Err(e) = handoff.notify_parent() {
                tracing::warn!(error = %e, "Failed to retire parent process");
            }
        }

        let mut signals_open = true;
        loop {
            tokio::select! {
                result = &mut serve_task => {
                    return finish(&state, result, shutdown.is_triggered());
                }
                _ = shutdown.wait() => break,
                signal = signals.recv(), if signals_open => match signal {
                    Some(LifecycleSignal::Reload) => {
                        state.send_replace(LifecycleState::Restarting);
                        match handoff.spawn_replacement(&handle) {
                            Ok(pid) => tracing::info!(pid, "Waiting for replacement to take over"),
                            Err(e) => {
                                tracing::error!(error = %e, "Restart failed, still serving");
                                state.send_replace(LifecycleState::Serving);
                            }
                        }
                    }
                    Some(LifecycleSignal::Interrupt) => break,
                    None => {
                        tracing::debug!("Signal queue closed");
                        signals_open = false;
                    }
                },
            }
        }

        state.send_replace(LifecycleState::Draining);
        shutdown.trigger();
        drop(handle);

        let drain_timeout = Duration::from_secs(config.lifecycle.drain_timeout_secs);
        tracing::info!(
            inflight = inflight.active_count(),
            timeout = ?drain_timeout,
            "Draining"
        );

        tokio::select! {
            result = &mut serve_task => finish(&state, result, true),
            _ = tokio::time::sleep(drain_timeout) => {
                tracing::warn!(
                    inflight = inflight.active_count(),
                    "Drain deadline elapsed, abandoning in-flight requests"
                );
                serve_task.abort();
                state.send_replace(LifecycleState::Terminated);
                Ok(())
            }
        }
    }
}

fn finish(
    state: &watch::Sender<LifecycleState>,
    result: Result<Result<(), std::io::Error>, JoinError>,
    requested: bool,
) -> Result<(), LifecycleError> {
    state.send_replace(LifecycleState::Terminated);

    match result {
        Ok(Ok(())) if requested => {
            tracing::info!("All connections closed");
            Ok(())
        }
        Ok(Ok(())) => Err(LifecycleError::UnexpectedStop),
        Ok(Err(e)) => Err(LifecycleError::Serve(e)),
        Err(e) => Err(LifecycleError::Task(e.to_string())),
    }
}
