//! `node` namespace: upsert and list sensor node positions.

use std::sync::Arc;

use aviary_core::{Envelope, NodePosition};
use tracing::debug;

use crate::service::operation::Operation;
use crate::service::registry::{HandlerModule, RouteTable};
use crate::traits::SightingStore;

pub struct NodeModule {
    store: Arc<dyn SightingStore>,
}

impl NodeModule {
    #[must_use]
    pub fn new(store: Arc<dyn SightingStore>) -> Self {
        Self { store }
    }
}

impl HandlerModule for NodeModule {
    fn module_name(&self) -> &str {
        "node.controller"
    }

    fn routes(&self) -> Option<RouteTable> {
        let put_store = Arc::clone(&self.store);
        let get_store = Arc::clone(&self.store);

        let table = RouteTable::new()
            .route(Operation::new("put", move |req, _ctx| {
                let store = Arc::clone(&put_store);
                async move {
                    let position: NodePosition = serde_json::from_value(req.body)?;
                    let node = store.upsert_node(position).await?;
                    debug!(node = %node.id, local_id = node.local_id, "node position stored");
                    Ok(Envelope::from_serialize(&node)?)
                }
            }))
            .route(Operation::new("get", move |_req, _ctx| {
                let store = Arc::clone(&get_store);
                async move {
                    let nodes = store.list_nodes().await?;
                    Ok(Envelope::from_serialize(&nodes)?)
                }
            }));
        Some(table)
    }
}

#[cfg(test)]
mod tests {
    use aviary_core::{ErrorKind, RequestContext};
    use serde_json::{json, Value};

    use super::*;
    use crate::service::config::ServiceConfig;
    use crate::service::dispatcher::Dispatcher;
    use crate::service::registry::{Registry, StaticModules};
    use crate::storage::MemoryStore;

    fn dispatcher() -> Dispatcher {
        let source = StaticModules::new().with(NodeModule::new(Arc::new(MemoryStore::new())));
        let registry = Registry::build(&source, &ServiceConfig::default()).unwrap();
        Dispatcher::new(Arc::new(registry))
    }

    async fn put(dispatcher: &Dispatcher, body: Value) -> Envelope {
        dispatcher
            .dispatch("/node/put", body, RequestContext::default())
            .await
    }

    #[tokio::test]
    async fn put_inserts_then_updates() {
        let dispatcher = dispatcher();
        let first = put(&dispatcher, json!({ "_id": "esp-1", "long": 1.0, "lat": 2.0 })).await;
        let second = put(&dispatcher, json!({ "_id": "esp-2", "long": 3.0, "lat": 4.0 })).await;
        let moved = put(&dispatcher, json!({ "_id": "esp-1", "long": 5.0, "lat": 6.0 })).await;

        assert_eq!(first.data().unwrap()["localId"], 0);
        assert_eq!(second.data().unwrap()["localId"], 1);
        assert_eq!(moved.data().unwrap()["localId"], 0);
        assert_eq!(moved.data().unwrap()["long"], 5.0);

        let all = dispatcher
            .dispatch("/node/get", Value::Null, RequestContext::default())
            .await;
        let nodes = all.data().unwrap().as_array().unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0]["_id"], "esp-1");
    }

    #[tokio::test]
    async fn put_without_id_is_unknown() {
        let env = put(&dispatcher(), json!({ "long": 1.0, "lat": 2.0 })).await;
        assert_eq!(env.error_kind(), Some(ErrorKind::Unknown));
        assert!(env.error().unwrap().contains("_id"));
    }
}
