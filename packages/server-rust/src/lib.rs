//! Aviary server: convention-routed HTTP dispatcher, route introspection,
//! and a WebSocket fan-out relay.
//!
//! - [`service`]: handler registry, dispatcher, introspection, built-in modules
//! - [`network`]: HTTP and relay listeners, handlers, lifecycle
//! - [`storage`]: storage collaborators behind the built-in modules

pub mod network;
pub mod service;
pub mod storage;
pub mod traits;

pub use network::{NetworkConfig, NetworkModule, RelayHub};
pub use service::{Dispatcher, Explorer, Registry, ServiceConfig};
pub use traits::SightingStore;
