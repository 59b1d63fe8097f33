//! Convention-based dispatch: `/<namespace>/<operation>` selects a
//! registered operation, which is invoked and its envelope returned as-is.
//!
//! Lookup misses become `ControllerNotFound` / `ServiceNotFound` envelopes.
//! Everything that goes wrong inside an operation (a returned error, or a
//! panic while building or polling its future) becomes an `Unknown`
//! envelope carrying the error text. `dispatch` itself never fails.

use std::any::Any;
use std::convert::Infallible;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use aviary_core::{Envelope, ErrorKind, RequestContext};
use futures_util::FutureExt;
use serde_json::Value;
use tower::Service;
use tracing::{debug, warn};

use super::operation::{Call, Operation, OperationRequest, RouteTarget};
use super::registry::Registry;

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Routes calls to operations held by a shared, read-only [`Registry`].
///
/// Cloning is cheap; every clone sees the same registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Looks up the operation named by `path` and invokes it with `body`
    /// and `ctx`.
    pub async fn dispatch(&self, path: &str, body: Value, ctx: RequestContext) -> Envelope {
        let (target, rest) = RouteTarget::parse(path);

        let Some(namespace) = self.registry.namespace(target.namespace) else {
            debug!(namespace = target.namespace, "controller not found");
            return Envelope::controller_not_found();
        };
        let Some(operation) = namespace.operation(target.operation) else {
            debug!(
                namespace = target.namespace,
                operation = target.operation,
                "service not found"
            );
            return Envelope::service_not_found();
        };

        let request = OperationRequest {
            namespace: target.namespace.to_string(),
            operation: target.operation.to_string(),
            rest: rest.into_iter().map(str::to_string).collect(),
            body,
        };
        invoke_guarded(operation, request, ctx).await
    }
}

/// Invokes `operation`, downgrading errors and panics to `Unknown`.
async fn invoke_guarded(
    operation: &Operation,
    request: OperationRequest,
    ctx: RequestContext,
) -> Envelope {
    let namespace = request.namespace.clone();
    let fut = match panic::catch_unwind(AssertUnwindSafe(|| operation.invoke(request, ctx))) {
        Ok(fut) => fut,
        Err(payload) => return panicked(&namespace, operation.name(), payload.as_ref()),
    };

    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(envelope)) => envelope,
        Ok(Err(err)) => {
            warn!(
                namespace = %namespace,
                operation = operation.name(),
                error = %err,
                "operation failed"
            );
            Envelope::unknown(err.to_string())
        }
        Err(payload) => panicked(&namespace, operation.name(), payload.as_ref()),
    }
}

fn panicked(namespace: &str, operation: &str, payload: &(dyn Any + Send)) -> Envelope {
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or(ErrorKind::Unknown.default_message());
    warn!(namespace, operation, panic = message, "operation panicked");
    Envelope::unknown(message)
}

// ---------------------------------------------------------------------------
// tower::Service
// ---------------------------------------------------------------------------

impl Service<Call> for Dispatcher {
    type Response = Envelope;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Envelope, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, call: Call) -> Self::Future {
        let this = self.clone();
        Box::pin(async move { Ok(this.dispatch(&call.path, call.body, call.ctx).await) })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
