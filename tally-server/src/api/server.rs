//! HTTP server setup, connection handling, and graceful drain.

use crate::api::router;
use crate::api::state::AppState;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use std::net::SocketAddr;
use std::sync::Arc;
use tally_core::{Result, TallyError};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// HTTP server for the public API and the peer protocol.
pub struct ApiServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: Arc<AppState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_rx: oneshot::Receiver<()>,
}

impl ApiServer {
    /// Bind the listen socket. Port `0` picks a free port; the effective
    /// address is available through [`ApiServer::local_addr`].
    pub async fn bind(addr: SocketAddr, state: Arc<AppState>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|source| TallyError::Io {
            path: addr.to_string().into(),
            source,
        })?;
        Self::from_listener(listener, state)
    }

    /// Wrap an already-bound listener. Useful when the node's URL must be
    /// known before the rest of the node is assembled.
    pub fn from_listener(listener: TcpListener, state: Arc<AppState>) -> Result<Self> {
        let local_addr = listener.local_addr().map_err(|source| TallyError::Io {
            path: "listener".into(),
            source,
        })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        Ok(Self {
            listener,
            local_addr,
            state,
            shutdown_tx: Some(shutdown_tx),
            shutdown_rx,
        })
    }

    /// The bound socket address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Take the shutdown handle. Sending on it stops the accept loop and
    /// drains in-flight connections.
    pub fn shutdown_handle(&mut self) -> Option<oneshot::Sender<()>> {
        self.shutdown_tx.take()
    }

    /// Serve until the shutdown handle fires, then drain active handlers.
    pub async fn run(mut self) -> Result<()> {
        tracing::info!(addr = %self.local_addr, "server started");

        let graceful = GracefulShutdown::new();
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, remote_addr) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            tracing::warn!(error = %e, "accept failed");
                            continue;
                        }
                    };

                    let io = TokioIo::new(stream);
                    let state = Arc::clone(&self.state);
                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { router::route(req, state).await }
                    });

                    let conn = http1::Builder::new().serve_connection(io, service);
                    let conn = graceful.watch(conn);
                    tokio::spawn(async move {
                        if let Err(e) = conn.await {
                            tracing::debug!(remote = %remote_addr, error = %e, "connection error");
                        }
                    });
                }
                _ = &mut self.shutdown_rx => {
                    tracing::info!("shutdown requested, draining connections");
                    break;
                }
            }
        }

        drop(self.listener);
        graceful.shutdown().await;
        tracing::info!("server stopped");
        Ok(())
    }
}

/// Parse a `":8080"` / `"0.0.0.0:8080"` style listen string.
pub fn listen_addr(port: &str) -> Result<SocketAddr> {
    let full = if port.starts_with(':') {
        format!("0.0.0.0{port}")
    } else {
        port.to_string()
    };
    full.parse()
        .map_err(|_| TallyError::Config(format!("invalid listen port: {port:?} (want \":8080\")")))
}
