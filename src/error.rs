use thiserror::Error;

use crate::config::ConfigError;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, TreeError>;

/// Structural precondition violations.
///
/// These are detected before any transaction is opened, so a caller that receives one
/// can be sure the store was not touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidOperation {
    /// The node already has valid boundaries and cannot be inserted again.
    #[error("node is already attached to a tree")]
    AlreadyAttached,
    /// The node has no valid boundaries.
    #[error("node is not attached to a tree")]
    Detached,
    /// A root has no position a parent could be inserted at.
    #[error("cannot insert a node as parent of a root")]
    ParentOfRoot,
    /// Siblings of a root would create a second root inside one scope.
    #[error("cannot place a node next to a root")]
    SiblingOfRoot,
    /// The reference node is the node being moved.
    #[error("cannot move a node relative to itself")]
    SelfReference,
    /// The reference node lies inside the subtree being moved.
    #[error("cannot move a node relative to its own descendant")]
    IntoOwnSubtree,
    /// Only a leaf can be moved to wrap another node.
    #[error("only a leaf node can be moved as parent of another node")]
    ParentMustBeLeaf,
    /// The reference could not be resolved to a persisted node.
    #[error("cannot find node with identifier {0}")]
    NodeNotFound(String),
    /// A relation name did not parse.
    #[error("unknown relation `{0}`")]
    UnknownRelation(String),
    /// The requested scope already holds a tree.
    #[error("scope {0} already holds nodes")]
    ScopeInUse(i64),
    /// Re-rooting needs a fresh scope, which is unavailable without scoping.
    #[error("scoping is disabled; a node cannot be detached into its own tree")]
    ScopingDisabled,
    /// The single unscoped tree already has a root.
    #[error("a root node already exists")]
    RootExists,
    /// Transaction calls arrived out of order.
    #[error("transaction state: {0}")]
    TransactionState(&'static str),
}

/// Errors produced by the tree engine and its stores.
#[derive(Debug, Error)]
pub enum TreeError {
    /// Caller logic error, rejected before any write.
    #[error("invalid operation: {0}")]
    Invalid(#[from] InvalidOperation),
    /// Failure reported by the SQLite store.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failure reported by any other store.
    #[error("storage failure: {0}")]
    Storage(String),
    /// A stored row could not be decoded into a node.
    #[error("corruption detected: {0}")]
    Corruption(String),
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl TreeError {
    /// Returns the invalid-operation kind when this error is a caller logic error.
    pub fn invalid_operation(&self) -> Option<&InvalidOperation> {
        match self {
            TreeError::Invalid(kind) => Some(kind),
            _ => None,
        }
    }
}
