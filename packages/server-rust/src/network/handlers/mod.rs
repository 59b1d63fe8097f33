//! HTTP and relay handler definitions for the Aviary server.
//!
//! [`AppState`] is carried through the HTTP router, [`RelayState`] through
//! the relay router.

pub mod dispatch;
pub mod explore;
pub mod health;
pub mod index;
pub mod relay;

pub use dispatch::dispatch_handler;
pub use explore::explore_handler;
pub use health::{health_handler, liveness_handler, readiness_handler};
pub use index::index_handler;
pub use relay::relay_upgrade_handler;

use std::sync::Arc;
use std::time::Instant;

use aviary_core::{Origin, RequestContext};
use axum::http::header::HOST;
use axum::http::HeaderMap;
use uuid::Uuid;

use super::{NetworkConfig, RelayConfig, RelayHub, ShutdownController};
use crate::service::{build_dispatch_pipeline, DispatchPipeline, Dispatcher, Explorer, Registry};

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_REQUEST_ID: &str = "x-request-id";

/// Shared state for the HTTP router. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Dispatcher wrapped in its middleware stack.
    pub pipeline: DispatchPipeline,
    pub explorer: Explorer,
    /// The relay's Connection Set, read for health reporting.
    pub hub: Arc<RelayHub>,
    pub shutdown: Arc<ShutdownController>,
    pub config: Arc<NetworkConfig>,
    /// Host used in introspection URLs when a request has no `Host` header.
    pub fallback_host: Arc<str>,
    /// Server process start time, used for uptime.
    pub start_time: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(
        registry: Arc<Registry>,
        hub: Arc<RelayHub>,
        shutdown: Arc<ShutdownController>,
        config: Arc<NetworkConfig>,
        fallback_host: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            pipeline: build_dispatch_pipeline(Dispatcher::new(Arc::clone(&registry))),
            explorer: Explorer::new(registry),
            hub,
            shutdown,
            config,
            fallback_host: fallback_host.into(),
            start_time: Instant::now(),
        }
    }

    /// Builds the operation context from request headers.
    ///
    /// The scheme comes from `X-Forwarded-Proto` (default `http`), the host
    /// from `Host` (default [`Self::fallback_host`]), and the request ID
    /// from `X-Request-Id`, generating one if the header is missing.
    #[must_use]
    pub fn request_context(&self, headers: &HeaderMap) -> RequestContext {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.is_empty())
        };

        let scheme = header(X_FORWARDED_PROTO)
            .and_then(|value| value.split(',').next())
            .map_or("http", str::trim);
        let host = header(HOST.as_str()).unwrap_or(&*self.fallback_host);
        let request_id = header(X_REQUEST_ID)
            .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);

        RequestContext::new(request_id, Origin::new(scheme, host))
    }
}

/// Shared state for the relay router.
#[derive(Clone)]
pub struct RelayState {
    pub hub: Arc<RelayHub>,
    pub config: Arc<RelayConfig>,
}
