//! Persistence collaborator contract and the stores shipped with the crate.
//!
//! The tree engine never touches rows directly. Everything it needs from the host storage
//! layer is expressed by [`TreeStore`]: explicit transactions, range-predicate reads, bulk
//! updates and deletes, load-by-identifier, persisting one node, and the largest scope in use.
//!
//! Callers that run mutations from several connections must pick a store whose transactions
//! serialize writers touching the same scope; the engine computes gap positions from reads
//! made inside its transaction and relies on nobody else shifting boundaries meanwhile.

use std::fmt;
use std::hash::Hash;

use crate::error::Result;
use crate::tree::Bounds;

mod memory;
pub mod predicate;
mod sqlite;

pub use memory::MemoryStore;
pub use predicate::{Assignment, Cmp, Column, Direction, Filter, Select};
pub use sqlite::SqliteStore;

/// Capability a record type needs to take part in a nested-set tree.
pub trait TreeNode: Clone {
    /// Identifier owned by the persistence layer.
    type Id: Copy + Eq + Hash + fmt::Debug + fmt::Display;

    /// Identifier, `None` until the node has been persisted.
    fn id(&self) -> Option<Self::Id>;

    /// Records the identifier assigned by the store.
    fn set_id(&mut self, id: Self::Id);

    /// Current boundary tuple.
    fn bounds(&self) -> Bounds;

    /// Replaces the boundary tuple.
    fn set_bounds(&mut self, bounds: Bounds);
}

/// Identifier type of a store's nodes.
pub type NodeId<S> = <<S as TreeStore>::Node as TreeNode>::Id;

/// Host persistence layer consumed by [`crate::NestedSet`].
pub trait TreeStore {
    /// Record type stored in this store.
    type Node: TreeNode;

    /// Opens a transaction. Nested transactions are not supported.
    fn begin(&mut self) -> Result<()>;

    /// Makes every write since [`TreeStore::begin`] durable.
    fn commit(&mut self) -> Result<()>;

    /// Discards every write since [`TreeStore::begin`].
    fn rollback(&mut self) -> Result<()>;

    /// Loads one node by identifier.
    fn load(&self, id: NodeId<Self>) -> Result<Option<Self::Node>>;

    /// Writes the node's full state, assigning an identifier to a new node.
    fn persist(&mut self, node: &mut Self::Node) -> Result<()>;

    /// Runs a range-predicate read.
    fn select(&self, query: &Select) -> Result<Vec<Self::Node>>;

    /// Applies `assignments` to every row matching `filter` in one bulk statement.
    /// Returns the number of rows touched.
    fn update_where(&mut self, filter: &Filter, assignments: &[Assignment]) -> Result<u64>;

    /// Deletes every row matching `filter`. Returns the number of rows removed.
    fn delete_where(&mut self, filter: &Filter) -> Result<u64>;

    /// Largest scope value in use, `None` on an empty store.
    fn max_scope(&self) -> Result<Option<i64>>;
}
