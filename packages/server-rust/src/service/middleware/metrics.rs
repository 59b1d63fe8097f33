//! Metrics middleware for dispatch calls.
//!
//! Records call duration and the resulting domain status code on a
//! `tracing` span, one span per call.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use aviary_core::Envelope;
use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::service::operation::{Call, RouteTarget};

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

/// Tower layer that instruments dispatch calls with timing and outcome.
#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

/// Service wrapper that records call duration and status code in a span.
#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S> Service<Call> for MetricsService<S>
where
    S: Service<Call, Response = Envelope, Error = Infallible> + Send,
    S::Future: Send + 'static,
{
    type Response = Envelope;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Envelope, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, call: Call) -> Self::Future {
        let (target, _) = RouteTarget::parse(&call.path);
        let span = info_span!(
            "dispatch",
            namespace = target.namespace,
            operation = target.operation,
            request_id = %call.ctx.request_id,
            status_code = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
        );

        let fut = self.inner.call(call);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

                if let Ok(envelope) = &result {
                    let status_code = envelope.status_code();
                    tracing::Span::current().record("status_code", status_code);
                    tracing::Span::current().record("duration_ms", duration_ms);
                    tracing::info!(status_code, duration_ms, "dispatch complete");
                }

                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
