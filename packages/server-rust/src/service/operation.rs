//! Operation types: the invocable unit a namespace is made of, the request
//! an operation receives, and the call value that flows through the
//! dispatch pipeline.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use aviary_core::{Envelope, RequestContext};
use serde_json::Value;

/// Future returned by an operation handler.
pub type OperationFuture = Pin<Box<dyn Future<Output = anyhow::Result<Envelope>> + Send>>;

/// Type-erased operation handler.
type BoxedHandler = Arc<dyn Fn(OperationRequest, RequestContext) -> OperationFuture + Send + Sync>;

// ---------------------------------------------------------------------------
// OperationRequest
// ---------------------------------------------------------------------------

/// The request-like value handed to an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    /// Namespace segment the request was routed by.
    pub namespace: String,
    /// Operation segment the request was routed by.
    pub operation: String,
    /// Path segments after the operation name, for operations that use them.
    pub rest: Vec<String>,
    /// Parsed JSON body; `Value::Null` when the body was empty.
    pub body: Value,
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A named, invocable unit within a namespace. Immutable once built.
///
/// Cloning is cheap: the handler is shared behind an `Arc`.
#[derive(Clone)]
pub struct Operation {
    name: String,
    handler: BoxedHandler,
}

impl Operation {
    /// Wraps an async handler.
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(OperationRequest, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Envelope>> + Send + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(move |req, ctx| Box::pin(handler(req, ctx))),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Starts the handler. The returned future is not polled yet.
    ///
    /// May panic if the handler panics before producing its future; the
    /// dispatcher guards against that.
    pub fn invoke(&self, request: OperationRequest, ctx: RequestContext) -> OperationFuture {
        (self.handler)(request, ctx)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Call
// ---------------------------------------------------------------------------

/// One dispatch request travelling through the tower pipeline.
#[derive(Debug, Clone)]
pub struct Call {
    /// URI path, without query string, e.g. `/birds/put`.
    pub path: String,
    pub body: Value,
    pub ctx: RequestContext,
}

impl Call {
    #[must_use]
    pub fn new(path: impl Into<String>, body: Value, ctx: RequestContext) -> Self {
        Self {
            path: path.into(),
            body,
            ctx,
        }
    }
}

/// Route segments extracted from a dispatch path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteTarget<'a> {
    pub namespace: &'a str,
    pub operation: &'a str,
}

impl<'a> RouteTarget<'a> {
    /// Splits `path` on `/`: segment 1 names the namespace, segment 2 the
    /// operation. Missing segments are empty strings; anything after
    /// segment 2 is returned separately.
    #[must_use]
    pub fn parse(path: &'a str) -> (Self, Vec<&'a str>) {
        let mut segments = path.split('/').skip(1);
        let namespace = segments.next().unwrap_or_default();
        let operation = segments.next().unwrap_or_default();
        let rest = segments.collect();
        (
            Self {
                namespace,
                operation,
            },
            rest,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
