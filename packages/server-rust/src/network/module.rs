//! Network module with deferred startup.
//!
//! `new()` allocates shared state, `start()` binds the HTTP and relay
//! listeners, `serve()` accepts traffic on both until shutdown.

use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::connection::RelayHub;
use super::handlers::{
    dispatch_handler, explore_handler, health_handler, index_handler, liveness_handler,
    readiness_handler, relay_upgrade_handler, AppState, RelayState,
};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;
use crate::service::Registry;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);
const SHUTDOWN_REASON: &str = "server shutting down";

/// Ports actually bound by [`NetworkModule::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundPorts {
    pub http: u16,
    pub relay: u16,
}

/// Owns both listeners and the state their routers share.
pub struct NetworkModule {
    config: NetworkConfig,
    registry: Arc<Registry>,
    hub: Arc<RelayHub>,
    shutdown: Arc<ShutdownController>,
    http_listener: Option<TcpListener>,
    relay_listener: Option<TcpListener>,
    http_port: Option<u16>,
}

impl NetworkModule {
    /// Creates the module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, registry: Arc<Registry>) -> Self {
        Self {
            config,
            registry,
            hub: Arc::new(RelayHub::new()),
            shutdown: Arc::new(ShutdownController::new()),
            http_listener: None,
            relay_listener: None,
            http_port: None,
        }
    }

    #[must_use]
    pub fn hub(&self) -> Arc<RelayHub> {
        Arc::clone(&self.hub)
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Host used in introspection URLs when a request has no `Host` header.
    fn fallback_host(&self) -> String {
        if let Some(public) = &self.config.public_host {
            return public.clone();
        }
        let host = match self.config.host.as_str() {
            "0.0.0.0" | "::" | "[::]" => "localhost",
            other => other,
        };
        let port = self.http_port.unwrap_or(self.config.port);
        format!("{host}:{port}")
    }

    /// HTTP router with every route and the transport middleware.
    ///
    /// - `GET /`: banner
    /// - `GET /health`, `/health/live`, `/health/ready`: probes
    /// - `POST /explore`: introspection
    /// - every other `POST`, including the probe paths: dispatch
    pub fn build_router(&self) -> Router {
        let state = AppState::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.hub),
            Arc::clone(&self.shutdown),
            Arc::new(self.config.clone()),
            self.fallback_host(),
        );

        Router::new()
            .route("/", get(index_handler).post(dispatch_handler))
            .route("/health", get(health_handler).post(dispatch_handler))
            .route("/health/live", get(liveness_handler).post(dispatch_handler))
            .route("/health/ready", get(readiness_handler).post(dispatch_handler))
            .route("/explore", post(explore_handler))
            .route("/{*path}", post(dispatch_handler))
            .layer(build_http_layers(&self.config))
            .with_state(state)
    }

    /// Relay router: an upgrade is accepted on any path.
    pub fn build_relay_router(&self) -> Router {
        let state = RelayState {
            hub: Arc::clone(&self.hub),
            config: Arc::new(self.config.relay.clone()),
        };

        Router::new()
            .route("/", get(relay_upgrade_handler))
            .route("/{*path}", get(relay_upgrade_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Binds both listeners. Port 0 in the configuration yields an
    /// OS-assigned port, reported in the result.
    ///
    /// # Errors
    ///
    /// Returns an error if either address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<BoundPorts> {
        let http = TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let relay = TcpListener::bind((self.config.host.as_str(), self.config.relay.port)).await?;

        let ports = BoundPorts {
            http: http.local_addr()?.port(),
            relay: relay.local_addr()?.port(),
        };
        info!(
            host = %self.config.host,
            http_port = ports.http,
            relay_port = ports.relay,
            "listeners bound"
        );

        self.http_listener = Some(http);
        self.relay_listener = Some(relay);
        self.http_port = Some(ports.http);
        Ok(ports)
    }

    /// Serves both listeners until `shutdown` resolves or
    /// [`ShutdownController::trigger_shutdown`] is called.
    ///
    /// On shutdown every relay connection gets a close frame, then
    /// dispatches in progress get up to 30 seconds to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or either server
    /// hits a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let (Some(http_listener), Some(relay_listener)) =
            (self.http_listener.take(), self.relay_listener.take())
        else {
            anyhow::bail!("start() must be called before serve()");
        };

        let router = self.build_router();
        let relay_router = self.build_relay_router();
        let controller = self.shutdown;
        let hub = self.hub;
        controller.set_ready();

        {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move {
                shutdown.await;
                controller.trigger_shutdown();
            });
        }

        let http = axum::serve(http_listener, router).with_graceful_shutdown({
            let controller = Arc::clone(&controller);
            async move { controller.wait_for_shutdown().await }
        });
        let relay = axum::serve(relay_listener, relay_router).with_graceful_shutdown({
            let controller = Arc::clone(&controller);
            let hub = Arc::clone(&hub);
            async move {
                controller.wait_for_shutdown().await;
                let closed = hub.close_all(SHUTDOWN_REASON);
                info!(connections = closed, "relay connections closed");
            }
        });

        info!("serving HTTP and relay traffic");
        let result = tokio::try_join!(http.into_future(), relay.into_future());

        // No-ops after a clean shutdown; needed when a listener failed.
        controller.trigger_shutdown();
        hub.close_all(SHUTDOWN_REASON);
        result?;

        if controller.wait_for_drain(DRAIN_TIMEOUT).await {
            info!("shutdown complete");
        } else {
            warn!("shutdown finished with dispatches still in flight");
        }
        Ok(())
    }
}
