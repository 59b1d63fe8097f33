//! Built-in handler modules.
//!
//! Each module becomes one namespace: `birds.controller` serves `/birds/*`
//! and `node.controller` serves `/node/*`. Both delegate to a shared
//! [`SightingStore`].

pub mod birds;
pub mod node;

use std::sync::Arc;

pub use birds::BirdsModule;
pub use node::NodeModule;

use super::registry::StaticModules;
use crate::traits::SightingStore;

/// The compiled list of handler modules served by the binary.
#[must_use]
pub fn builtin_modules(store: &Arc<dyn SightingStore>) -> StaticModules {
    StaticModules::new()
        .with(BirdsModule::new(Arc::clone(store)))
        .with(NodeModule::new(Arc::clone(store)))
}
