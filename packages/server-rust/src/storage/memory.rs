//! In-memory [`SightingStore`] backed by [`DashMap`] and a locked `Vec`.
//!
//! Suitable for development and tests. Nothing survives a restart.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use aviary_core::{Bird, NewBird, Node, NodePosition};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{ClockSource, SystemClock};
use crate::traits::SightingStore;

/// In-memory sightings and node positions.
pub struct MemoryStore {
    birds: RwLock<Vec<Bird>>,
    nodes: DashMap<String, Node>,
    /// Nodes are never removed, so this equals the node count.
    next_local_id: AtomicU64,
    clock: Arc<dyn ClockSource>,
}

impl MemoryStore {
    /// Creates an empty store stamped by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store stamped by `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn ClockSource>) -> Self {
        Self {
            birds: RwLock::new(Vec::new()),
            nodes: DashMap::new(),
            next_local_id: AtomicU64::new(0),
            clock,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SightingStore for MemoryStore {
    async fn insert_bird(&self, bird: NewBird) -> anyhow::Result<Bird> {
        let now = self.clock.now();
        let stored = Bird {
            id: Uuid::new_v4().to_string(),
            name: bird.name,
            long: bird.long,
            lat: bird.lat,
            created_at: now,
            updated_at: now,
        };
        self.birds.write().push(stored.clone());
        Ok(stored)
    }

    async fn list_birds(&self) -> anyhow::Result<Vec<Bird>> {
        Ok(self.birds.read().clone())
    }

    async fn upsert_node(&self, position: NodePosition) -> anyhow::Result<Node> {
        let now = self.clock.now();
        let node = match self.nodes.entry(position.id) {
            Entry::Occupied(mut entry) => {
                let node = entry.get_mut();
                node.long = position.long;
                node.lat = position.lat;
                node.updated_at = now;
                node.clone()
            }
            Entry::Vacant(entry) => {
                let node = Node {
                    id: entry.key().clone(),
                    long: position.long,
                    lat: position.lat,
                    local_id: self.next_local_id.fetch_add(1, Ordering::SeqCst),
                    created_at: now,
                    updated_at: now,
                };
                entry.insert(node.clone());
                node
            }
        };
        Ok(node)
    }

    async fn list_nodes(&self) -> anyhow::Result<Vec<Node>> {
        let mut nodes: Vec<Node> = self
            .nodes
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        nodes.sort_by_key(|node| node.local_id);
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Clock that advances by one millisecond per reading.
    struct TickingClock(AtomicU64);

    impl ClockSource for TickingClock {
        fn now(&self) -> u64 {
            self.0.fetch_add(1, Ordering::SeqCst)
        }
    }

    fn store() -> MemoryStore {
        MemoryStore::with_clock(Arc::new(TickingClock(AtomicU64::new(1_000))))
    }

    fn position(id: &str, long: f64, lat: f64) -> NodePosition {
        NodePosition {
            id: id.to_string(),
            long,
            lat,
        }
    }

    #[tokio::test]
    async fn birds_are_listed_in_insertion_order() {
        let store = store();
        for name in ["robin", "wren", "jay"] {
            store
                .insert_bird(NewBird {
                    name: name.to_string(),
                    long: Some(0.0),
                    lat: Some(0.0),
                })
                .await
                .unwrap();
        }

        let names: Vec<String> = store
            .list_birds()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["robin", "wren", "jay"]);
    }

    #[tokio::test]
    async fn inserted_bird_gets_id_and_timestamps() {
        let bird = store()
            .insert_bird(NewBird {
                name: "robin".to_string(),
                long: Some(4.3),
                lat: Some(50.8),
            })
            .await
            .unwrap();
        assert!(!bird.id.is_empty());
        assert_eq!(bird.created_at, 1_000);
        assert_eq!(bird.updated_at, bird.created_at);
    }

    #[tokio::test]
    async fn new_nodes_get_dense_local_ids() {
        let store = store();
        let a = store.upsert_node(position("a", 1.0, 1.0)).await.unwrap();
        let b = store.upsert_node(position("b", 2.0, 2.0)).await.unwrap();
        assert_eq!(a.local_id, 0);
        assert_eq!(b.local_id, 1);
    }

    #[tokio::test]
    async fn update_keeps_local_id_and_moves_node() {
        let store = store();
        let first = store.upsert_node(position("a", 1.0, 1.0)).await.unwrap();
        store.upsert_node(position("b", 2.0, 2.0)).await.unwrap();
        let moved = store.upsert_node(position("a", 9.0, 8.0)).await.unwrap();

        assert_eq!(moved.local_id, first.local_id);
        assert!((moved.long - 9.0).abs() < f64::EPSILON);
        assert!((moved.lat - 8.0).abs() < f64::EPSILON);
        assert_eq!(moved.created_at, first.created_at);
        assert!(moved.updated_at > first.updated_at);

        let nodes = store.list_nodes().await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].id, "a");
        assert_eq!(nodes[1].id, "b");
    }
}
