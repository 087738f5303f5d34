//! Embedded HTTP server backed by a [`Registry`].
//!
//! Every connection is served with hyper's HTTP/1 implementation on its own
//! tokio task. Received requests are consumed through the registry and the
//! canned response is written back.

mod handler;

use crate::config::MockConfig;
use crate::error::MockError;
use crate::expectation::{ExpectedBody, ExpectedMethod};
use crate::registry::{ExpectationHandle, Registry};
use crate::sink::RecordingSink;
use handler::handle_mock_request;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

/// State shared by the accept loop and every connection.
pub(crate) struct ServerState {
    registry: Arc<Registry>,
    recoverable: AtomicBool,
    failures: RecordingSink,
}

impl ServerState {
    fn is_recoverable(&self) -> bool {
        self.recoverable.load(Ordering::SeqCst)
    }
}

/// A running mock server. Stops accepting connections when dropped.
pub struct MockServer {
    address: SocketAddr,
    state: Arc<ServerState>,
    shutdown_tx: broadcast::Sender<()>,
}

impl MockServer {
    /// Start a server on an ephemeral port of `127.0.0.1`.
    pub async fn start() -> Result<Self, MockError> {
        Self::start_with(&MockConfig::default()).await
    }

    /// Start a server from `config`, registering its expectations first.
    pub async fn start_with(config: &MockConfig) -> Result<Self, MockError> {
        let registry = Arc::new(Registry::new());
        config.apply(&registry)?;
        Self::start_with_registry(registry, config).await
    }

    /// Start a server that consumes requests through an existing registry.
    /// Expectations listed in `config` are not applied.
    pub async fn start_with_registry(
        registry: Arc<Registry>,
        config: &MockConfig,
    ) -> Result<Self, MockError> {
        let bind = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|e| MockError::Bind {
                address: bind.clone(),
                reason: e.to_string(),
            })?;
        let address = listener.local_addr().map_err(|e| MockError::Bind {
            address: bind,
            reason: e.to_string(),
        })?;
        info!("Mock server listening on {}", address);

        let state = Arc::new(ServerState {
            registry,
            recoverable: AtomicBool::new(config.recoverable),
            failures: RecordingSink::new(),
        });

        let (shutdown_tx, _) = broadcast::channel(1);
        let mut shutdown_rx = shutdown_tx.subscribe();
        let serving = Arc::clone(&state);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, peer)) => {
                                let state = Arc::clone(&serving);
                                tokio::spawn(async move {
                                    let io = TokioIo::new(stream);
                                    let service = service_fn(move |req| {
                                        handle_mock_request(req, Arc::clone(&state))
                                    });
                                    if let Err(e) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        debug!("Connection error from {}: {}", peer, e);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Accept error on {}: {}", address, e);
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Mock server on {} shutting down", address);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            address,
            state,
            shutdown_tx,
        })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Base URI of the server, e.g. `http://127.0.0.1:49152`.
    pub fn uri(&self) -> String {
        format!("http://{}", self.address)
    }

    /// Absolute URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.uri(), path)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.state.registry
    }

    /// Register an expectation on the server's registry.
    pub fn on(
        &self,
        method: impl Into<ExpectedMethod>,
        url: &str,
        body: impl Into<ExpectedBody>,
    ) -> ExpectationHandle<'_> {
        self.state.registry.on(method, url, body)
    }

    /// Send failures to the registry's fatal path instead of answering them
    /// with `404 Not Found`.
    pub fn not_recoverable(self) -> Self {
        self.state.recoverable.store(false, Ordering::SeqCst);
        self
    }

    pub fn is_recoverable(&self) -> bool {
        self.state.is_recoverable()
    }

    /// Failures answered with `404 Not Found` so far, oldest first.
    pub fn failures(&self) -> Vec<String> {
        self.state.failures.errors()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
    }
}
