//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGHUP, SIGINT, SIGTERM)
//! - Translate signals to [`LifecycleSignal`] events on a queue
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGTERM drains like SIGINT; it is how a replacement retires its parent
//! - SIGHUP triggers a restart, not shutdown

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Event delivered to the lifecycle manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    /// Start a replacement process on the same socket.
    Reload,
    /// Stop accepting and drain.
    Interrupt,
}

/// Forward OS signals into `tx` until the receiving side goes away.
///
/// Handlers are installed before this returns.
#[cfg(unix)]
pub fn spawn_signal_listener(tx: mpsc::Sender<LifecycleSignal>) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        loop {
            let (event, name) = tokio::select! {
                Some(()) = hangup.recv() => (LifecycleSignal::Reload, "SIGHUP"),
                Some(()) = interrupt.recv() => (LifecycleSignal::Interrupt, "SIGINT"),
                Some(()) = terminate.recv() => (LifecycleSignal::Interrupt, "SIGTERM"),
                else => break,
            };

            tracing::info!(pid = std::process::id(), signal = name, "Signal received");
            if tx.send(event).await.is_err() {
                break;
            }
        }
    }))
}

#[cfg(not(unix))]
pub fn spawn_signal_listener(tx: mpsc::Sender<LifecycleSignal>) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(pid = std::process::id(), signal = "ctrl-c", "Signal received");
            if tx.send(LifecycleSignal::Interrupt).await.is_err() {
                break;
            }
        }
    }))
}
