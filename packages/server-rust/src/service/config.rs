/// Configuration for the dispatch side of the server.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Treat a handler module without a route table as a startup error
    /// instead of registering an empty namespace for it.
    pub strict_modules: bool,
}
