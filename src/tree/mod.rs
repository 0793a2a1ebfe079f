//! Nested-set tree engine.
//!
//! A [`NestedSet`] wraps a [`TreeStore`] and keeps the boundary encoding consistent:
//!
//! - [`Bounds`] holds the pure boundary arithmetic,
//! - the shift primitives open and close gaps with bulk range updates,
//! - the query methods turn tree relationships into range predicates,
//! - the mutation methods compose shifts inside one store transaction each.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::config::TreeOptions;
use crate::error::{InvalidOperation, Result};
use crate::store::{Cmp, Column, Filter, NodeId, TreeNode, TreeStore};

mod boundary;
mod mutation;
mod query;
mod shift;

pub use boundary::Bounds;

/// Reference node of a relative operation: a live node or an identifier.
///
/// Either way the engine re-loads the node by identifier before using its boundaries, so a
/// stale in-memory copy is harmless.
pub enum NodeRef<'a, N: TreeNode> {
    /// A node previously read from the store.
    Node(&'a N),
    /// A node identifier.
    Id(N::Id),
}

impl<'a, N: TreeNode> From<&'a N> for NodeRef<'a, N> {
    fn from(node: &'a N) -> Self {
        NodeRef::Node(node)
    }
}

/// Position of a node relative to a reference node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Relation {
    /// Wraps the reference, which moves one level down.
    ParentOf,
    /// Immediately before the reference, same level.
    PrevSiblingOf,
    /// Immediately after the reference, same level.
    NextSiblingOf,
    /// Innermost-left child of the reference.
    FirstChildOf,
    /// Innermost-right child of the reference.
    LastChildOf,
}

impl Relation {
    /// Every relation, in declaration order.
    pub const ALL: [Relation; 5] = [
        Relation::ParentOf,
        Relation::PrevSiblingOf,
        Relation::NextSiblingOf,
        Relation::FirstChildOf,
        Relation::LastChildOf,
    ];

    /// Snake-case name, as accepted by [`Relation::from_str`].
    pub fn as_str(self) -> &'static str {
        match self {
            Relation::ParentOf => "parent_of",
            Relation::PrevSiblingOf => "prev_sibling_of",
            Relation::NextSiblingOf => "next_sibling_of",
            Relation::FirstChildOf => "first_child_of",
            Relation::LastChildOf => "last_child_of",
        }
    }

    /// Left boundary and level a node takes when placed relative to `reference`.
    pub(crate) fn placement(self, reference: &Bounds) -> (i64, i64) {
        match self {
            Relation::ParentOf | Relation::PrevSiblingOf => (reference.left, reference.level),
            Relation::NextSiblingOf => (reference.right + 1, reference.level),
            Relation::FirstChildOf => (reference.left + 1, reference.level + 1),
            Relation::LastChildOf => (reference.right, reference.level + 1),
        }
    }

    /// Rejects positions that have no valid place in a single-rooted tree.
    pub(crate) fn check_reference(self, reference: &Bounds) -> Result<()> {
        if !reference.is_root() {
            return Ok(());
        }
        match self {
            Relation::ParentOf => Err(InvalidOperation::ParentOfRoot.into()),
            Relation::PrevSiblingOf | Relation::NextSiblingOf => {
                Err(InvalidOperation::SiblingOfRoot.into())
            }
            Relation::FirstChildOf | Relation::LastChildOf => Ok(()),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Relation {
    type Err = InvalidOperation;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let name = name.strip_suffix("_of").unwrap_or(&name);
        match name {
            "parent" => Ok(Relation::ParentOf),
            "prev_sibling" => Ok(Relation::PrevSiblingOf),
            "next_sibling" => Ok(Relation::NextSiblingOf),
            "first_child" => Ok(Relation::FirstChildOf),
            "last_child" => Ok(Relation::LastChildOf),
            _ => Err(InvalidOperation::UnknownRelation(s.to_string())),
        }
    }
}

/// Nested-set engine over a persistence collaborator.
#[derive(Debug)]
pub struct NestedSet<S> {
    store: S,
    options: TreeOptions,
}

impl<S: TreeStore> NestedSet<S> {
    /// Wraps `store`.
    pub fn new(store: S, options: TreeOptions) -> Self {
        Self { store, options }
    }

    /// Engine options.
    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// Whether several trees share the store.
    pub fn scoping(&self) -> bool {
        self.options.scoping
    }

    /// The wrapped store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the wrapped store. Writing boundary columns through it bypasses
    /// every invariant the engine maintains.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Unwraps the store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Adds the scope condition when scoping is enabled.
    pub(crate) fn scoped(&self, filter: Filter, scope: i64) -> Filter {
        if self.options.scoping {
            filter.and(Column::Scope, Cmp::Eq, scope)
        } else {
            filter
        }
    }

    /// Identifier behind a reference. Unsaved nodes cannot be referenced.
    pub(crate) fn reference_id(reference: &NodeRef<'_, S::Node>) -> Result<NodeId<S>> {
        match reference {
            NodeRef::Node(node) => node
                .id()
                .ok_or_else(|| InvalidOperation::NodeNotFound("<unsaved>".into()).into()),
            NodeRef::Id(id) => Ok(*id),
        }
    }

    /// Loads an attached node, failing when it is missing or detached.
    pub(crate) fn reload(&self, id: NodeId<S>) -> Result<S::Node> {
        let node = self
            .store
            .load(id)?
            .ok_or_else(|| InvalidOperation::NodeNotFound(id.to_string()))?;
        debug_assert!(
            node.bounds().is_well_formed(),
            "node {id} loaded with malformed bounds {:?}",
            node.bounds()
        );
        if !node.bounds().is_valid() {
            return Err(InvalidOperation::Detached.into());
        }
        Ok(node)
    }

    /// Replaces the caller's boundaries with the stored ones, when the node has been saved.
    /// A node whose row is gone is detached.
    pub(crate) fn refresh(&self, node: &mut S::Node) -> Result<()> {
        let Some(id) = node.id() else {
            return Ok(());
        };
        match self.store.load(id)? {
            Some(stored) => {
                debug_assert!(
                    stored.bounds().is_well_formed(),
                    "node {id} loaded with malformed bounds {:?}",
                    stored.bounds()
                );
                node.set_bounds(stored.bounds());
            }
            None => node.set_bounds(Bounds::default()),
        }
        Ok(())
    }

    /// Runs `f` inside one store transaction: commit on success, rollback on any failure.
    pub(crate) fn atomically<T>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.store.begin()?;
        let outcome = f(self).and_then(|value| self.store.commit().map(|()| value));
        if let Err(err) = &outcome {
            if let Err(rollback_err) = self.store.rollback() {
                warn!(operation, error = %rollback_err, "rollback failed");
            }
            debug!(operation, error = %err, "rolled back");
        }
        outcome
    }
}

/// Puts `node` back to `snapshot` when `result` failed.
pub(crate) fn restore_on_err<N: TreeNode, T>(
    node: &mut N,
    snapshot: N,
    result: Result<T>,
) -> Result<T> {
    if result.is_err() {
        *node = snapshot;
    }
    result
}
