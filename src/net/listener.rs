//! Listening socket acquisition.
//!
//! # Responsibilities
//! - Bind the configured address on a fresh start
//! - Adopt an inherited descriptor on a replacement start
//! - Verify an inherited descriptor is a usable socket before serving

use std::io;
use std::net::{SocketAddr, TcpListener as StdTcpListener};

use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("invalid bind address '{0}'")]
    Address(String),
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("inherited descriptor {fd} is not a usable listening socket: {source}")]
    Inherit {
        fd: i32,
        #[source]
        source: io::Error,
    },
    #[error("listener inheritance is not supported on this platform")]
    Unsupported,
    #[error("listener I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// The gateway's single listening socket.
#[derive(Debug)]
pub struct GatewayListener {
    inner: StdTcpListener,
    inherited: bool,
}

impl GatewayListener {
    /// Bind to `address`.
    pub fn bind(address: &str) -> Result<Self, ListenerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|_| ListenerError::Address(address.to_string()))?;

        let inner = StdTcpListener::bind(addr).map_err(|source| ListenerError::Bind {
            address: address.to_string(),
            source,
        })?;
        inner.set_nonblocking(true)?;

        let local_addr = inner.local_addr()?;
        tracing::info!(address = %local_addr, "Listener bound");

        Ok(Self {
            inner,
            inherited: false,
        })
    }

    /// Adopt a listening socket passed down by the previous process.
    #[cfg(unix)]
    pub fn inherit(fd: std::os::fd::RawFd) -> Result<Self, ListenerError> {
        use std::os::fd::FromRawFd;

        // SAFETY: the descriptor was installed for us by the parent and is
        // owned by nothing else in this process.
        let inner = unsafe { StdTcpListener::from_raw_fd(fd) };

        let local_addr = inner
            .local_addr()
            .map_err(|source| ListenerError::Inherit { fd, source })?;
        inner
            .set_nonblocking(true)
            .map_err(|source| ListenerError::Inherit { fd, source })?;

        tracing::info!(address = %local_addr, fd, "Listener inherited");
        Ok(Self {
            inner,
            inherited: true,
        })
    }

    #[cfg(not(unix))]
    pub fn inherit(_fd: i32) -> Result<Self, ListenerError> {
        Err(ListenerError::Unsupported)
    }

    /// Whether the socket came from a previous process.
    pub fn inherited(&self) -> bool {
        self.inherited
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ListenerError> {
        Ok(self.inner.local_addr()?)
    }

    /// Borrow the raw socket, e.g. to duplicate it for a replacement process.
    pub fn handle(&self) -> &StdTcpListener {
        &self.inner
    }

    /// Split into the async listener to serve on and a handle kept for handoff.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn into_parts(self) -> Result<(TcpListener, StdTcpListener), ListenerError> {
        let handle = self.inner.try_clone()?;
        let listener = TcpListener::from_std(self.inner)?;
        Ok((listener, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_rejects_garbage_address() {
        assert!(matches!(
            GatewayListener::bind("not-an-address"),
            Err(ListenerError::Address(_))
        ));
    }

    #[tokio::test]
    async fn bind_and_split() {
        let listener = GatewayListener::bind("127.0.0.1:0").unwrap();
        assert!(!listener.inherited());
        let addr = listener.local_addr().unwrap();

        let (tokio_listener, handle) = listener.into_parts().unwrap();
        assert_eq!(tokio_listener.local_addr().unwrap(), addr);
        assert_eq!(handle.local_addr().unwrap(), addr);
    }

    #[cfg(unix)]
    #[test]
    fn inherit_rejects_non_socket_descriptor() {
        use std::os::fd::IntoRawFd;

        let file = std::fs::File::open("/dev/null").unwrap();
        let fd = file.into_raw_fd();

        assert!(matches!(
            GatewayListener::inherit(fd),
            Err(ListenerError::Inherit { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn inherit_adopts_listening_socket() {
        use std::os::fd::IntoRawFd;

        let original = StdTcpListener::bind("127.0.0.1:0").unwrap();
        let addr = original.local_addr().unwrap();
        let fd = original.into_raw_fd();

        let inherited = GatewayListener::inherit(fd).unwrap();
        assert!(inherited.inherited());
        assert_eq!(inherited.local_addr().unwrap(), addr);
    }
}
