/// Where a request was observed to arrive: the protocol and `Host` the
/// caller used. Introspection builds fully-qualified URLs from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// URL scheme, e.g. `"http"` or `"https"`.
    pub scheme: String,
    /// Host and optional port as sent by the client.
    pub host: String,
}

impl Origin {
    #[must_use]
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
        }
    }

    /// Absolute URL for `path` on this origin. `path` must start with `/`.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.host, path)
    }
}

impl Default for Origin {
    fn default() -> Self {
        Self::new("http", "localhost")
    }
}

/// Per-request context handed to every operation alongside the request
/// itself. Carries no identity: requests are unauthenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Value of the `x-request-id` header assigned by the HTTP layer.
    pub request_id: String,
    /// Observed protocol and host.
    pub origin: Origin,
}

impl RequestContext {
    #[must_use]
    pub fn new(request_id: impl Into<String>, origin: Origin) -> Self {
        Self {
            request_id: request_id.into(),
            origin,
        }
    }
}
