//! Handler registry: namespace name to operations, built once from a
//! [`ModuleSource`] before traffic is accepted.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use tracing::{info, warn};

use super::config::ServiceConfig;
use super::operation::Operation;

// ---------------------------------------------------------------------------
// Handler modules
// ---------------------------------------------------------------------------

/// Operations exported by one handler module, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    operations: Vec<Operation>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an operation. Duplicate names are reported when the registry
    /// is built, not here.
    #[must_use]
    pub fn route(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// A source of operations grouped under one namespace.
pub trait HandlerModule: Send + Sync {
    /// Identity of the module, e.g. `"birds.controller"`. Everything before
    /// the first `.` becomes the namespace name.
    fn module_name(&self) -> &str;

    /// The module's exported routes. `None` means the module does not
    /// export a route table at all.
    fn routes(&self) -> Option<RouteTable>;
}

/// Where handler modules come from.
pub trait ModuleSource {
    /// Enumerates every handler module.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read. Registry construction
    /// treats this as fatal.
    fn load(&self) -> anyhow::Result<Vec<&dyn HandlerModule>>;
}

/// Compiled-in list of handler modules. Always readable.
#[derive(Default)]
pub struct StaticModules {
    modules: Vec<Box<dyn HandlerModule>>,
}

impl StaticModules {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, module: impl HandlerModule + 'static) -> Self {
        self.modules.push(Box::new(module));
        self
    }
}

impl ModuleSource for StaticModules {
    fn load(&self) -> anyhow::Result<Vec<&dyn HandlerModule>> {
        Ok(self
            .modules
            .iter()
            .map(|module| module.as_ref() as &dyn HandlerModule)
            .collect())
    }
}

/// Derives a namespace name from a module identity (`"birds.controller"`
/// becomes `"birds"`).
#[must_use]
pub fn namespace_name(module_name: &str) -> &str {
    module_name.split('.').next().unwrap_or(module_name)
}

// ---------------------------------------------------------------------------
// Namespace
// ---------------------------------------------------------------------------

/// A named group of operations, keyed by operation name.
#[derive(Debug, Clone)]
pub struct Namespace {
    name: String,
    operations: BTreeMap<String, Operation>,
}

impl Namespace {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    /// Operation names in lexical order.
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Errors that abort registry construction.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read handler modules: {0}")]
    Source(#[source] anyhow::Error),
    #[error("duplicate namespace: {name}")]
    DuplicateNamespace { name: String },
    #[error("duplicate operation {operation} in namespace {namespace}")]
    DuplicateOperation {
        namespace: String,
        operation: String,
    },
    #[error("module {module} does not export a route table")]
    MalformedModule { module: String },
}

/// Namespace name to namespace. Built once before traffic is accepted and
/// read-only afterwards, so lookups need no synchronization.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    namespaces: BTreeMap<String, Namespace>,
}

impl Registry {
    /// Builds the registry from every module in `source`.
    ///
    /// A module without a route table registers an empty namespace and logs
    /// a warning, unless `config.strict_modules` is set, in which case it is
    /// an error.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Source`] if the source cannot be read
    /// - [`RegistryError::DuplicateNamespace`] / [`RegistryError::DuplicateOperation`]
    ///   if two names collide
    /// - [`RegistryError::MalformedModule`] in strict mode
    pub fn build(
        source: &dyn ModuleSource,
        config: &ServiceConfig,
    ) -> Result<Self, RegistryError> {
        let modules = source.load().map_err(RegistryError::Source)?;
        let mut namespaces = BTreeMap::new();

        for module in modules {
            let module_name = module.module_name();
            let name = namespace_name(module_name).to_string();

            let routes = match module.routes() {
                Some(routes) => routes,
                None if config.strict_modules => {
                    return Err(RegistryError::MalformedModule {
                        module: module_name.to_string(),
                    });
                }
                None => {
                    warn!(
                        module = module_name,
                        namespace = %name,
                        "module exports no route table, registering empty namespace"
                    );
                    RouteTable::new()
                }
            };

            let mut operations = BTreeMap::new();
            for op in routes.operations {
                match operations.entry(op.name().to_string()) {
                    Entry::Vacant(slot) => {
                        slot.insert(op);
                    }
                    Entry::Occupied(slot) => {
                        return Err(RegistryError::DuplicateOperation {
                            namespace: name,
                            operation: slot.key().clone(),
                        });
                    }
                }
            }

            match namespaces.entry(name) {
                Entry::Vacant(slot) => {
                    let name = slot.key().clone();
                    slot.insert(Namespace { name, operations });
                }
                Entry::Occupied(slot) => {
                    return Err(RegistryError::DuplicateNamespace {
                        name: slot.key().clone(),
                    });
                }
            }
        }

        info!(
            namespaces = namespaces.len(),
            operations = namespaces.values().map(Namespace::len).sum::<usize>(),
            "routes initialized"
        );
        Ok(Self { namespaces })
    }

    #[must_use]
    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.get(name)
    }

    /// Namespaces in lexical order of their names.
    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
