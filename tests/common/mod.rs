//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use mini_gateway::config::{GatewayConfig, RouteConfig, UpstreamConfig, UpstreamScheme};
use mini_gateway::http::HttpServer;
use mini_gateway::lifecycle::{Gateway, Handoff, LifecycleError, LifecycleSignal, LifecycleState};
use mini_gateway::net::GatewayListener;

/// Start a mock backend that answers with the request head it received,
/// after `delay`.
pub async fn start_echo_backend(delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    tokio::spawn(async move {
                        echo(socket, delay).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn echo(mut socket: TcpStream, delay: Duration) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }

    tokio::time::sleep(delay).await;

    let body = String::from_utf8_lossy(&head).to_string();
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// A route forwarding `^/{prefix}/(.*)` to `backend` over HTTP.
pub fn http_route(prefix: &str, backend: SocketAddr, filters: &[&str]) -> RouteConfig {
    RouteConfig {
        pattern: format!("^/{}/(.*)", prefix),
        upstreams: vec![UpstreamConfig {
            host: backend.to_string(),
            scheme: UpstreamScheme::Http,
            grpc_endpoint: None,
        }],
        filters: filters.iter().map(|f| f.to_string()).collect(),
    }
}

/// Config listening on an ephemeral port with rate limiting off.
pub fn base_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.rate_limit.enabled = false;
    config.lifecycle.drain_timeout_secs = 5;
    config
}

/// Handoff that records spawn requests instead of starting processes.
#[derive(Default)]
pub struct RecordingHandoff {
    pub spawns: std::sync::atomic::AtomicUsize,
}

impl Handoff for RecordingHandoff {
    fn spawn_replacement(&self, _listener: &std::net::TcpListener) -> Result<u32, LifecycleError> {
        self.spawns.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(1)
    }

    fn notify_parent(&self) -> Result<(), LifecycleError> {
        Ok(())
    }
}

/// Handoff for a replacement: retiring the parent interrupts the parent
/// gateway through its signal queue.
pub struct ReplacementHandoff {
    pub parent: mpsc::Sender<LifecycleSignal>,
    pub notified: std::sync::atomic::AtomicUsize,
}

impl ReplacementHandoff {
    pub fn new(parent: mpsc::Sender<LifecycleSignal>) -> Self {
        Self {
            parent,
            notified: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

impl Handoff for ReplacementHandoff {
    fn spawn_replacement(&self, _listener: &std::net::TcpListener) -> Result<u32, LifecycleError> {
        Err(LifecycleError::Unsupported)
    }

    fn notify_parent(&self) -> Result<(), LifecycleError> {
        self.notified.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.parent
            .try_send(LifecycleSignal::Interrupt)
            .map_err(|e| LifecycleError::Notify(e.to_string()))
    }
}

pub struct TestGateway {
    pub addr: SocketAddr,
    pub signals: mpsc::Sender<LifecycleSignal>,
    pub state: watch::Receiver<LifecycleState>,
    pub task: JoinHandle<Result<(), LifecycleError>>,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a gateway with the default transports.
pub async fn start_gateway(config: GatewayConfig, handoff: Arc<dyn Handoff>) -> TestGateway {
    let server = HttpServer::new(&config);
    start_gateway_with(config, server, handoff).await
}

/// Start a gateway around a prepared server.
pub async fn start_gateway_with(
    config: GatewayConfig,
    server: HttpServer,
    handoff: Arc<dyn Handoff>,
) -> TestGateway {
    let listener = GatewayListener::bind(&config.listener.bind_address).unwrap();
    start_gateway_on(config, listener, server, handoff).await
}

/// Start a gateway serving an already acquired listener.
pub async fn start_gateway_on(
    config: GatewayConfig,
    listener: GatewayListener,
    server: HttpServer,
    handoff: Arc<dyn Handoff>,
) -> TestGateway {
    let addr = listener.local_addr().unwrap();

    let gateway = Gateway::new(config, server, handoff);
    let state = gateway.state();
    let (signals, rx) = mpsc::channel(4);
    let task = tokio::spawn(gateway.serve(listener, rx));

    TestGateway {
        addr,
        signals,
        state,
        task,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
