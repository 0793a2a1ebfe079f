//! Identifier and record types shared by the shipped stores.

use std::fmt;

use crate::store::TreeNode;
use crate::tree::Bounds;

/// Row identifier assigned by [`crate::store::MemoryStore`] and [`crate::store::SqliteStore`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId(value)
    }
}

impl From<RecordId> for i64 {
    fn from(value: RecordId) -> Self {
        value.0
    }
}

/// A named tree element.
///
/// Freshly constructed records are detached: they have no identifier and all-zero
/// bounds until an insert or `make_root` places them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    id: Option<RecordId>,
    /// Free-form payload.
    pub name: String,
    bounds: Bounds,
}

impl Record {
    /// Creates a detached record.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            bounds: Bounds::default(),
        }
    }

    /// Rebuilds a record from stored columns.
    pub fn from_parts(id: RecordId, name: String, bounds: Bounds) -> Self {
        Self {
            id: Some(id),
            name,
            bounds,
        }
    }

    /// Left boundary.
    pub fn left(&self) -> i64 {
        self.bounds.left
    }

    /// Right boundary.
    pub fn right(&self) -> i64 {
        self.bounds.right
    }

    /// Depth below the root.
    pub fn level(&self) -> i64 {
        self.bounds.level
    }

    /// Tree identifier.
    pub fn scope(&self) -> i64 {
        self.bounds.scope
    }
}

impl TreeNode for Record {
    type Id = RecordId;

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }
}
