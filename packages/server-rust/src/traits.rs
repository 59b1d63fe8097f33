use async_trait::async_trait;
use aviary_core::{Bird, NewBird, Node, NodePosition};

/// Persistence collaborator behind the built-in handler modules.
///
/// Implementations: [`MemoryStore`](crate::storage::MemoryStore). A
/// document-database backend plugs in here.
#[async_trait]
pub trait SightingStore: Send + Sync {
    /// Record a new sighting and return it as stored.
    async fn insert_bird(&self, bird: NewBird) -> anyhow::Result<Bird>;

    /// All sightings in the order they were recorded.
    async fn list_birds(&self) -> anyhow::Result<Vec<Bird>>;

    /// Insert a node or update the position of an existing one.
    ///
    /// A new node is assigned `local_id` equal to the number of nodes known
    /// before it; an existing node keeps its `local_id`.
    async fn upsert_node(&self, position: NodePosition) -> anyhow::Result<Node>;

    /// All nodes ordered by `local_id`.
    async fn list_nodes(&self) -> anyhow::Result<Vec<Node>>;
}
