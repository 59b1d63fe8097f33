//! Self-describing capability listing: one absolute URL per registered
//! operation, grouped by namespace.

use std::collections::BTreeMap;
use std::sync::Arc;

use aviary_core::Origin;

use super::registry::Registry;

/// Builds route listings from a shared, read-only [`Registry`].
#[derive(Debug, Clone)]
pub struct Explorer {
    registry: Arc<Registry>,
}

impl Explorer {
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Maps `"Routes for <namespace>"` to the URLs of that namespace's
    /// operations, built from the caller's observed `origin`. Namespaces
    /// without operations are listed with an empty sequence.
    #[must_use]
    pub fn explore(&self, origin: &Origin) -> BTreeMap<String, Vec<String>> {
        self.registry
            .namespaces()
            .map(|namespace| {
                let urls = namespace
                    .operation_names()
                    .map(|op| origin.url_for(&format!("/{}/{op}", namespace.name())))
                    .collect();
                (format!("Routes for {}", namespace.name()), urls)
            })
            .collect()
    }

    /// Number of namespaces a listing would contain.
    #[must_use]
    pub fn namespace_count(&self) -> usize {
        self.registry.len()
    }
}
