//! Convention-based request dispatch.
//!
//! 1. **Registry** (`registry`): namespace -> operations, built once at startup
//! 2. **Dispatch** (`dispatcher`): `/<namespace>/<operation>` -> invoke -> `Envelope`
//! 3. **Introspection** (`explore`): one URL per registered operation
//! 4. **Middleware** (`middleware`): Tower layers around the dispatcher
//! 5. **Handler modules** (`domain`): the built-in `birds` and `node` namespaces

pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod explore;
pub mod middleware;
pub mod operation;
pub mod registry;

// Re-export key types for convenient access.
pub use config::ServiceConfig;
pub use dispatcher::Dispatcher;
pub use explore::Explorer;
pub use middleware::{build_dispatch_pipeline, DispatchPipeline};
pub use operation::{Call, Operation, OperationRequest};
pub use registry::{
    HandlerModule, ModuleSource, Namespace, Registry, RegistryError, RouteTable, StaticModules,
};
