//! Callback listener server
//!
//! Binds the callback address and serves the ingest webhooks plus the
//! read-only registry endpoints.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::error::Result;
use crate::registry::{SnapshotStore, StreamRegistry};
use crate::server::callbacks::NotificationListener;
use crate::server::config::ServerConfig;
use crate::server::guard::{Acquisition, ListenerGuard};
use crate::server::handlers;

/// Build the listener's router
pub fn build_router<S: SnapshotStore>(
    listener: Arc<NotificationListener<S>>,
    config: &ServerConfig,
) -> Router {
    Router::new()
        .route("/api/stream/start", post(handlers::on_publish::<S>))
        .route("/api/stream/stop", post(handlers::on_publish_done::<S>))
        .route("/api/streams", get(handlers::list_streams::<S>))
        .route("/api/streams/active", get(handlers::list_active::<S>))
        .route("/api/streams/by-key/{key}", get(handlers::show_stream::<S>))
        .route("/api/stats", get(handlers::stats::<S>))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .with_state(listener)
}

/// Ingest callback server
pub struct NotificationServer<S: SnapshotStore> {
    config: ServerConfig,
    listener: Arc<NotificationListener<S>>,
}

impl<S: SnapshotStore> NotificationServer<S> {
    /// Create a new server over `registry`
    pub fn new(config: ServerConfig, registry: Arc<StreamRegistry<S>>) -> Self {
        Self {
            config,
            listener: Arc::new(NotificationListener::new(registry)),
        }
    }

    /// Get a reference to the stream registry
    pub fn registry(&self) -> &Arc<StreamRegistry<S>> {
        self.listener.registry()
    }

    /// Get the router serving this listener
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.listener), &self.config)
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound socket
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(addr = %listener.local_addr()?, "Callback listener listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Callback listener stopped");
        Ok(())
    }

    /// Run the server unless another instance already holds the port
    ///
    /// Returns `AlreadyRunning` without binding when the guard reports the
    /// port taken. The guard is released when the server stops.
    pub async fn run_guarded<F>(&self, guard: &ListenerGuard, shutdown: F) -> Result<Acquisition>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.config.single_instance && guard.try_acquire()? == Acquisition::AlreadyRunning {
            tracing::info!(
                addr = %guard.addr(),
                "Callback listener already running, not starting another"
            );
            return Ok(Acquisition::AlreadyRunning);
        }

        let result = self.run_until(shutdown).await;
        guard.release();
        result.map(|()| Acquisition::Acquired)
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}
