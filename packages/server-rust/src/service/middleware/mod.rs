//! Tower middleware layers for the dispatch pipeline.
//!
//! - [`metrics`]: per-call timing and outcome via `tracing` spans
//! - [`pipeline`]: composes the layers around the [`Dispatcher`](crate::service::Dispatcher)

pub mod metrics;
pub mod pipeline;

pub use metrics::MetricsLayer;
pub use pipeline::{build_dispatch_pipeline, DispatchPipeline};
