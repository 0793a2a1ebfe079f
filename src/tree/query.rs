use std::collections::BTreeSet;

use crate::error::Result;
use crate::store::{Cmp, Column, Direction, Filter, NodeId, Select, TreeNode, TreeStore};
use crate::tree::NestedSet;

/// Read-side queries. Each one is a single range predicate in the subject's scope; a detached
/// subject, or no match, yields `None` or an empty list rather than an error.
///
/// Queries use the boundaries of the node they are given. After a mutation elsewhere in the
/// tree, re-load the subject with [`NestedSet::get`] to see its current position.
impl<S: TreeStore> NestedSet<S> {
    /// Loads a node by identifier.
    pub fn get(&self, id: NodeId<S>) -> Result<Option<S::Node>> {
        self.store.load(id)
    }

    fn first(&self, query: Select) -> Result<Option<S::Node>> {
        Ok(self.store.select(&query.limit(1))?.into_iter().next())
    }

    /// Innermost ancestor, `None` for a root.
    pub fn parent(&self, node: &S::Node) -> Result<Option<S::Node>> {
        let b = node.bounds();
        if !b.has_parent() {
            return Ok(None);
        }
        let filter = Filter::new()
            .and(Column::Left, Cmp::Lt, b.left)
            .and(Column::Right, Cmp::Gt, b.right)
            .and(Column::Level, Cmp::Ge, b.level - 1);
        self.first(
            Select::filter(self.scoped(filter, b.scope)).order_by(Column::Right, Direction::Asc),
        )
    }

    /// Whether the node sits below a root.
    pub fn has_parent(&self, node: &S::Node) -> bool {
        node.bounds().has_parent()
    }

    /// Ancestors from the root down to the parent, limited to `depth` levels above the node.
    pub fn ancestors(&self, node: &S::Node, depth: Option<i64>) -> Result<Vec<S::Node>> {
        let b = node.bounds();
        if !b.is_valid() {
            return Ok(Vec::new());
        }
        let mut filter = Filter::new()
            .and(Column::Left, Cmp::Lt, b.left)
            .and(Column::Right, Cmp::Gt, b.right);
        if let Some(depth) = depth {
            filter = filter.and(Column::Level, Cmp::Ge, b.level - depth);
        }
        self.store.select(
            &Select::filter(self.scoped(filter, b.scope)).order_by(Column::Left, Direction::Asc),
        )
    }

    /// Descendants in pre-order, limited to `depth` levels below the node.
    pub fn descendants(
        &self,
        node: &S::Node,
        depth: Option<i64>,
        include_self: bool,
    ) -> Result<Vec<S::Node>> {
        let b = node.bounds();
        if !b.is_valid() {
            return Ok(Vec::new());
        }
        let (lower, upper) = if include_self {
            (Cmp::Ge, Cmp::Le)
        } else {
            (Cmp::Gt, Cmp::Lt)
        };
        let mut filter = Filter::new()
            .and(Column::Left, lower, b.left)
            .and(Column::Right, upper, b.right);
        if let Some(depth) = depth {
            filter = filter.and(Column::Level, Cmp::Le, b.level + depth);
        }
        self.store.select(
            &Select::filter(self.scoped(filter, b.scope)).order_by(Column::Left, Direction::Asc),
        )
    }

    /// Direct children, left to right.
    pub fn children(&self, node: &S::Node) -> Result<Vec<S::Node>> {
        self.descendants(node, Some(1), false)
    }

    /// Number of direct children.
    pub fn child_count(&self, node: &S::Node) -> Result<usize> {
        if !node.bounds().has_children() {
            return Ok(0);
        }
        Ok(self.children(node)?.len())
    }

    /// Number of descendants, from the boundaries alone.
    pub fn descendant_count(&self, node: &S::Node) -> i64 {
        let b = node.bounds();
        if b.is_valid() {
            b.descendant_count()
        } else {
            0
        }
    }

    /// Leftmost child.
    pub fn first_child(&self, node: &S::Node) -> Result<Option<S::Node>> {
        let b = node.bounds();
        if !b.has_children() {
            return Ok(None);
        }
        let filter = Filter::new().and(Column::Left, Cmp::Eq, b.left + 1);
        self.first(Select::filter(self.scoped(filter, b.scope)))
    }

    /// Rightmost child.
    pub fn last_child(&self, node: &S::Node) -> Result<Option<S::Node>> {
        let b = node.bounds();
        if !b.has_children() {
            return Ok(None);
        }
        let filter = Filter::new().and(Column::Right, Cmp::Eq, b.right - 1);
        self.first(Select::filter(self.scoped(filter, b.scope)))
    }

    /// Sibling immediately to the left.
    pub fn prev_sibling(&self, node: &S::Node) -> Result<Option<S::Node>> {
        let b = node.bounds();
        if !b.is_valid() {
            return Ok(None);
        }
        let filter = Filter::new().and(Column::Right, Cmp::Eq, b.left - 1);
        self.first(Select::filter(self.scoped(filter, b.scope)))
    }

    /// Sibling immediately to the right.
    pub fn next_sibling(&self, node: &S::Node) -> Result<Option<S::Node>> {
        let b = node.bounds();
        if !b.is_valid() {
            return Ok(None);
        }
        let filter = Filter::new().and(Column::Left, Cmp::Eq, b.right + 1);
        self.first(Select::filter(self.scoped(filter, b.scope)))
    }

    /// Whether a sibling sits immediately to the left.
    pub fn has_prev_sibling(&self, node: &S::Node) -> Result<bool> {
        Ok(self.prev_sibling(node)?.is_some())
    }

    /// Whether a sibling sits immediately to the right.
    pub fn has_next_sibling(&self, node: &S::Node) -> Result<bool> {
        Ok(self.next_sibling(node)?.is_some())
    }

    /// Children of the node's parent, left to right. Roots have no siblings.
    pub fn siblings(&self, node: &S::Node, include_self: bool) -> Result<Vec<S::Node>> {
        let Some(parent) = self.parent(node)? else {
            return Ok(Vec::new());
        };
        let b = node.bounds();
        let scoping = self.scoping();
        let mut siblings = self.children(&parent)?;
        if !include_self {
            siblings.retain(|sibling| !sibling.bounds().is_equal(&b, scoping));
        }
        Ok(siblings)
    }

    /// Ancestors leading to the node, optionally starting at the root and ending at the node.
    pub fn path(
        &self,
        node: &S::Node,
        include_root: bool,
        include_self: bool,
    ) -> Result<Vec<S::Node>> {
        let mut path = self.ancestors(node, None)?;
        if !include_root && !path.is_empty() {
            path.remove(0);
        }
        if node.bounds().is_root() && !include_root {
            return Ok(path);
        }
        if include_self && node.id().is_some() {
            path.push(node.clone());
        }
        Ok(path)
    }

    /// Every root, ordered by scope.
    pub fn roots(&self) -> Result<Vec<S::Node>> {
        let filter = Filter::new().and(Column::Left, Cmp::Eq, 1);
        self.store
            .select(&Select::filter(filter).order_by(Column::Scope, Direction::Asc))
    }

    /// Every node of one tree in pre-order. `scope` is ignored without scoping.
    pub fn tree(&self, scope: i64) -> Result<Vec<S::Node>> {
        let filter = Filter::new().and(Column::Left, Cmp::Ge, 1);
        self.store.select(
            &Select::filter(self.scoped(filter, scope)).order_by(Column::Left, Direction::Asc),
        )
    }

    /// Distinct scopes holding attached nodes.
    pub fn scopes(&self) -> Result<Vec<i64>> {
        let filter = Filter::new().and(Column::Left, Cmp::Ge, 1);
        let scopes: BTreeSet<i64> = self
            .store
            .select(&Select::filter(filter))?
            .iter()
            .map(|node| node.bounds().scope)
            .collect();
        Ok(scopes.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::TreeOptions;
    use crate::store::{MemoryStore, TreeNode, TreeStore};
    use crate::tree::{Bounds, NestedSet};
    use crate::types::Record;

    // root
    // ├── a
    // │   ├── a1
    // │   └── a2
    // └── b
    fn fixture() -> (NestedSet<MemoryStore>, Vec<Record>) {
        let mut store = MemoryStore::new();
        let mut nodes = Vec::new();
        for (name, bounds) in [
            ("root", Bounds::new(1, 10, 0, 1)),
            ("a", Bounds::new(2, 7, 1, 1)),
            ("a1", Bounds::new(3, 4, 2, 1)),
            ("a2", Bounds::new(5, 6, 2, 1)),
            ("b", Bounds::new(8, 9, 1, 1)),
        ] {
            let mut record = Record::new(name);
            record.set_bounds(bounds);
            store.persist(&mut record).unwrap();
            nodes.push(record);
        }
        (NestedSet::new(store, TreeOptions::default()), nodes)
    }

    fn names(nodes: &[Record]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn parent_is_innermost_ancestor() {
        let (tree, nodes) = fixture();
        let parent = tree.parent(&nodes[2]).unwrap().unwrap();
        assert_eq!(parent.name, "a");
        assert!(tree.parent(&nodes[0]).unwrap().is_none());
    }

    #[test]
    fn ancestors_and_depth_limit() {
        let (tree, nodes) = fixture();
        let all = tree.ancestors(&nodes[3], None).unwrap();
        assert_eq!(names(&all), ["root", "a"]);
        let near = tree.ancestors(&nodes[3], Some(1)).unwrap();
        assert_eq!(names(&near), ["a"]);
    }

    #[test]
    fn descendants_children_and_counts() {
        let (tree, nodes) = fixture();
        let root = &nodes[0];
        assert_eq!(
            names(&tree.descendants(root, None, false).unwrap()),
            ["a", "a1", "a2", "b"]
        );
        assert_eq!(
            names(&tree.descendants(&nodes[1], None, true).unwrap()),
            ["a", "a1", "a2"]
        );
        assert_eq!(names(&tree.children(root).unwrap()), ["a", "b"]);
        assert_eq!(tree.child_count(root).unwrap(), 2);
        assert_eq!(tree.child_count(&nodes[4]).unwrap(), 0);
        assert_eq!(tree.descendant_count(root), 4);
    }

    #[test]
    fn first_and_last_child() {
        let (tree, nodes) = fixture();
        assert_eq!(tree.first_child(&nodes[1]).unwrap().unwrap().name, "a1");
        assert_eq!(tree.last_child(&nodes[1]).unwrap().unwrap().name, "a2");
        assert!(tree.first_child(&nodes[4]).unwrap().is_none());
    }

    #[test]
    fn sibling_lookups() {
        let (tree, nodes) = fixture();
        let a = &nodes[1];
        let b = &nodes[4];
        assert_eq!(tree.next_sibling(a).unwrap().unwrap().name, "b");
        assert_eq!(tree.prev_sibling(b).unwrap().unwrap().name, "a");
        assert!(!tree.has_prev_sibling(a).unwrap());
        assert!(tree.has_next_sibling(a).unwrap());
        assert_eq!(names(&tree.siblings(a, false).unwrap()), ["b"]);
        assert_eq!(names(&tree.siblings(a, true).unwrap()), ["a", "b"]);
        assert!(tree.siblings(&nodes[0], true).unwrap().is_empty());
    }

    #[test]
    fn path_flags() {
        let (tree, nodes) = fixture();
        let a1 = &nodes[2];
        assert_eq!(names(&tree.path(a1, false, false).unwrap()), ["a"]);
        assert_eq!(names(&tree.path(a1, true, true).unwrap()), ["root", "a", "a1"]);
        assert!(tree.path(&nodes[0], false, true).unwrap().is_empty());
        assert_eq!(names(&tree.path(&nodes[0], true, true).unwrap()), ["root"]);
    }

    #[test]
    fn detached_subjects_yield_nothing() {
        let (tree, _) = fixture();
        let loose = Record::new("loose");
        assert!(tree.parent(&loose).unwrap().is_none());
        assert!(tree.ancestors(&loose, None).unwrap().is_empty());
        assert!(tree.descendants(&loose, None, true).unwrap().is_empty());
        assert!(tree.prev_sibling(&loose).unwrap().is_none());
        assert!(tree.next_sibling(&loose).unwrap().is_none());
        assert!(tree.path(&loose, true, true).unwrap().is_empty());
        assert_eq!(tree.descendant_count(&loose), 0);
    }

    #[test]
    fn roots_trees_and_scopes() {
        let (mut tree, _) = fixture();
        let mut other = Record::new("other");
        other.set_bounds(Bounds::root(4));
        tree.store_mut().persist(&mut other).unwrap();

        assert_eq!(names(&tree.roots().unwrap()), ["root", "other"]);
        assert_eq!(tree.scopes().unwrap(), vec![1, 4]);
        assert_eq!(tree.tree(1).unwrap().len(), 5);
        assert_eq!(names(&tree.tree(4).unwrap()), ["other"]);
    }

    #[test]
    fn queries_stay_inside_scope() {
        let (mut tree, nodes) = fixture();
        // same boundaries, different tree
        let mut twin = Record::new("twin");
        twin.set_bounds(Bounds::new(8, 9, 1, 2));
        tree.store_mut().persist(&mut twin).unwrap();

        assert_eq!(tree.next_sibling(&nodes[1]).unwrap().unwrap().name, "b");
        assert_eq!(names(&tree.children(&nodes[0]).unwrap()), ["a", "b"]);
    }
}
