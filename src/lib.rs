//! Nested-set tree maintenance over range-queryable stores.
//!
//! Every node carries a `(left, right)` interval and a `level`; a node's descendants are
//! exactly the nodes whose intervals fall strictly inside its own. Several independent trees
//! share one store, told apart by `scope`.
//!
//! [`NestedSet`] owns the arithmetic. Storage is a [`TreeStore`] collaborator: the crate ships
//! an in-memory store and a SQLite store, and any other backend can implement the trait.
//!
//! ```
//! use arbor::{MemoryStore, NestedSet, Record, TreeOptions};
//!
//! let mut tree = NestedSet::new(MemoryStore::new(), TreeOptions::default());
//! let mut root = Record::new("root");
//! tree.make_root(&mut root, None)?;
//! let mut child = Record::new("child");
//! tree.insert_as_last_child_of(&mut child, &root)?;
//! assert_eq!((child.left(), child.right(), child.level()), (2, 3, 1));
//! # Ok::<(), arbor::TreeError>(())
//! ```

#![warn(missing_docs)]

pub mod admin;
pub mod config;
pub mod error;
pub mod store;
pub mod tree;
pub mod types;

pub use config::{ArborConfig, SqliteOptions, TreeOptions};
pub use error::{InvalidOperation, Result, TreeError};
pub use store::{MemoryStore, SqliteStore, TreeNode, TreeStore};
pub use tree::{Bounds, NestedSet, NodeRef, Relation};
pub use types::{Record, RecordId};
