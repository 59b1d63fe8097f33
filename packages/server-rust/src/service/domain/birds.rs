//! `birds` namespace: record and list bird sightings.

use std::sync::Arc;

use aviary_core::{Envelope, NewBird};

use crate::service::operation::Operation;
use crate::service::registry::{HandlerModule, RouteTable};
use crate::traits::SightingStore;

pub struct BirdsModule {
    store: Arc<dyn SightingStore>,
}

impl BirdsModule {
    #[must_use]
    pub fn new(store: Arc<dyn SightingStore>) -> Self {
        Self { store }
    }
}

impl HandlerModule for BirdsModule {
    fn module_name(&self) -> &str {
        "birds.controller"
    }

    fn routes(&self) -> Option<RouteTable> {
        let put_store = Arc::clone(&self.store);
        let get_store = Arc::clone(&self.store);

        let table = RouteTable::new()
            .route(Operation::new("put", move |req, _ctx| {
                let store = Arc::clone(&put_store);
                async move {
                    let bird: NewBird = serde_json::from_value(req.body)?;
                    let stored = store.insert_bird(bird).await?;
                    Ok(Envelope::from_serialize(&stored)?)
                }
            }))
            .route(Operation::new("get", move |_req, _ctx| {
                let store = Arc::clone(&get_store);
                async move {
                    let birds = store.list_birds().await?;
                    Ok(Envelope::from_serialize(&birds)?)
                }
            }));
        Some(table)
    }
}
