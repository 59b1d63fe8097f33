//! Pipeline composition: wraps the dispatcher in its middleware stack.

use tower::ServiceBuilder;

use super::metrics::{MetricsLayer, MetricsService};
use crate::service::dispatcher::Dispatcher;

/// The composed dispatch service handed to the HTTP layer.
pub type DispatchPipeline = MetricsService<Dispatcher>;

/// Build the dispatch pipeline around `dispatcher`.
///
/// Layer order (outermost to innermost):
/// 1. `MetricsLayer` -- record timing and domain status code
///
/// The returned service is `Clone`; each HTTP request drives its own clone.
#[must_use]
pub fn build_dispatch_pipeline(dispatcher: Dispatcher) -> DispatchPipeline {
    ServiceBuilder::new().layer(MetricsLayer).service(dispatcher)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
