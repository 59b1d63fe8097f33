//! Networking: configuration, relay connections, HTTP handlers, and
//! lifecycle control.

pub mod config;
pub mod connection;
pub mod handlers;
pub mod middleware;
pub mod module;
pub mod shutdown;

pub use config::*;
pub use connection::*;
pub use handlers::{AppState, RelayState};
pub use module::{BoundPorts, NetworkModule};
pub use shutdown::*;
