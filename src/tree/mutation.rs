use tracing::debug;

use crate::error::{InvalidOperation, Result};
use crate::store::{Assignment, Cmp, Column, Filter, NodeId, Select, TreeNode, TreeStore};
use crate::tree::{restore_on_err, Bounds, NestedSet, NodeRef, Relation};

macro_rules! relative_ops {
    ($($relation:ident => $insert:ident, $move_to:ident, $what:literal;)*) => {
        impl<S: TreeStore> NestedSet<S> {
            $(
                #[doc = concat!("Inserts a detached node as ", $what, " the reference.")]
                pub fn $insert<'r, R>(&mut self, node: &mut S::Node, reference: R) -> Result<()>
                where
                    R: Into<NodeRef<'r, S::Node>>,
                    S::Node: 'r,
                {
                    self.insert(node, Relation::$relation, reference.into())
                }

                #[doc = concat!("Moves a node and its subtree to become ", $what, " the reference.")]
                pub fn $move_to<'r, R>(&mut self, node: &mut S::Node, reference: R) -> Result<()>
                where
                    R: Into<NodeRef<'r, S::Node>>,
                    S::Node: 'r,
                {
                    self.move_node(node, Relation::$relation, reference.into())
                }
            )*
        }
    };
}

relative_ops! {
    ParentOf => insert_as_parent_of, move_as_parent_of, "the parent of";
    PrevSiblingOf => insert_as_prev_sibling_of, move_as_prev_sibling_of, "the previous sibling of";
    NextSiblingOf => insert_as_next_sibling_of, move_as_next_sibling_of, "the next sibling of";
    FirstChildOf => insert_as_first_child_of, move_as_first_child_of, "the first child of";
    LastChildOf => insert_as_last_child_of, move_as_last_child_of, "the last child of";
}

impl<S: TreeStore> NestedSet<S> {
    /// Attaches a detached node at `relation` to `reference` and persists it.
    pub fn insert(
        &mut self,
        node: &mut S::Node,
        relation: Relation,
        reference: NodeRef<'_, S::Node>,
    ) -> Result<()> {
        let snapshot = node.clone();
        let result = self.attach(node, relation, &reference);
        restore_on_err(node, snapshot, result)
    }

    fn attach(
        &mut self,
        node: &mut S::Node,
        relation: Relation,
        reference: &NodeRef<'_, S::Node>,
    ) -> Result<()> {
        self.refresh(node)?;
        if node.bounds().is_valid() {
            return Err(InvalidOperation::AlreadyAttached.into());
        }
        let target_id = Self::reference_id(reference)?;
        relation.check_reference(&self.reload(target_id)?.bounds())?;

        self.atomically("insert", |tree| {
            let target = tree.reload(target_id)?.bounds();
            relation.check_reference(&target)?;
            tree.place_new(node, relation, target)
        })?;

        let b = node.bounds();
        debug!(
            node = ?node.id(),
            %relation,
            reference = %target_id,
            left = b.left,
            right = b.right,
            scope = b.scope,
            "inserted"
        );
        Ok(())
    }

    /// Moves an attached node, with its subtree, to `relation` of `reference`. A detached
    /// node is inserted instead.
    pub fn move_node(
        &mut self,
        node: &mut S::Node,
        relation: Relation,
        reference: NodeRef<'_, S::Node>,
    ) -> Result<()> {
        let snapshot = node.clone();
        let result = self.relocate(node, relation, &reference);
        restore_on_err(node, snapshot, result)
    }

    fn relocate(
        &mut self,
        node: &mut S::Node,
        relation: Relation,
        reference: &NodeRef<'_, S::Node>,
    ) -> Result<()> {
        self.refresh(node)?;
        let node_id = match node.id() {
            Some(id) if node.bounds().is_valid() => id,
            _ => return self.attach(node, relation, reference),
        };
        let target_id = Self::reference_id(reference)?;
        if target_id == node_id {
            return Err(InvalidOperation::SelfReference.into());
        }
        self.check_move(&node.bounds(), relation, &self.reload(target_id)?.bounds())?;

        self.atomically("move", |tree| {
            let current = tree.reload(node_id)?.bounds();
            let target = tree.reload(target_id)?.bounds();
            tree.check_move(&current, relation, &target)?;
            if relation == Relation::ParentOf {
                return tree.rewrap(node, current, target_id);
            }
            let (new_left, level) = relation.placement(&target);
            let level_delta = level - current.level;
            if tree.scoping() && current.scope != target.scope {
                tree.move_between_trees(node, current, new_left, level_delta, target.scope)
            } else {
                tree.update_node(node_id, node, current, new_left, level_delta)
            }
        })?;

        let b = node.bounds();
        debug!(
            node = %node_id,
            %relation,
            reference = %target_id,
            left = b.left,
            right = b.right,
            scope = b.scope,
            "moved"
        );
        Ok(())
    }

    /// Appends `child` as the last child of `parent`.
    pub fn add_child<'r, R>(&mut self, parent: R, child: &mut S::Node) -> Result<()>
    where
        R: Into<NodeRef<'r, S::Node>>,
        S::Node: 'r,
    {
        self.insert_as_last_child_of(child, parent)
    }

    /// Turns the node into the root of its own tree, carrying its subtree along.
    ///
    /// Without `scope` the next free scope (`max + 1`, or 1 on an empty store) is used. A node
    /// that is already a root is left alone; a detached node becomes a single-node tree.
    pub fn make_root(&mut self, node: &mut S::Node, scope: Option<i64>) -> Result<()> {
        let snapshot = node.clone();
        let result = self.reroot(node, scope);
        restore_on_err(node, snapshot, result)
    }

    fn reroot(&mut self, node: &mut S::Node, scope: Option<i64>) -> Result<()> {
        self.refresh(node)?;
        let current = node.bounds();
        let attached = node.id().is_some() && current.is_valid();
        if attached && current.is_root() {
            return Ok(());
        }

        if !self.scoping() {
            if attached {
                return Err(InvalidOperation::ScopingDisabled.into());
            }
            if !self.roots()?.is_empty() {
                return Err(InvalidOperation::RootExists.into());
            }
        } else if let Some(scope) = scope {
            if self.scope_in_use(scope)? {
                return Err(InvalidOperation::ScopeInUse(scope).into());
            }
        }

        self.atomically("make_root", |tree| {
            let new_scope = match scope {
                Some(scope) => scope,
                None if tree.scoping() => tree.next_scope()?,
                None => 1,
            };
            if !attached {
                node.set_bounds(Bounds::root(new_scope));
                return tree.store.persist(node);
            }
            let current = match node.id() {
                Some(id) => tree.reload(id)?.bounds(),
                None => current,
            };
            let width = current.width();
            if current.has_children() {
                let inside = Filter::new()
                    .and(Column::Left, Cmp::Gt, current.left)
                    .and(Column::Right, Cmp::Lt, current.right);
                let offset = 1 - current.left;
                tree.store.update_where(
                    &tree.scoped(inside, current.scope),
                    &[
                        Assignment::Add(Column::Left, offset),
                        Assignment::Add(Column::Right, offset),
                        Assignment::Add(Column::Level, -current.level),
                        Assignment::Set(Column::Scope, new_scope),
                    ],
                )?;
            }
            node.set_bounds(Bounds::new(1, width, 0, new_scope));
            tree.store.persist(node)?;
            tree.shift(current.right + 1, -width, current.scope)
        })?;

        debug!(node = ?node.id(), scope = node.bounds().scope, "made root");
        Ok(())
    }

    /// Deletes the node and its whole subtree, closing the gap they leave.
    ///
    /// Returns the number of rows removed. The caller's node is reset to detached bounds.
    pub fn delete(&mut self, node: &mut S::Node) -> Result<u64> {
        let id = node
            .id()
            .ok_or_else(|| InvalidOperation::NodeNotFound("<unsaved>".into()))?;
        self.reload(id)?;

        let removed = self.atomically("delete", |tree| {
            let b = tree.reload(id)?.bounds();
            let subtree = Filter::new()
                .and(Column::Left, Cmp::Ge, b.left)
                .and(Column::Right, Cmp::Le, b.right);
            let removed = tree.store.delete_where(&tree.scoped(subtree, b.scope))?;
            tree.shift(b.right + 1, b.left - b.right - 1, b.scope)?;
            Ok(removed)
        })?;

        node.set_bounds(Bounds::default());
        debug!(node = %id, removed, "deleted");
        Ok(removed)
    }

    /// Persists the node's payload. Boundaries always come from the store; a detached node,
    /// including one whose row has since been deleted, becomes a new root.
    pub fn save(&mut self, node: &mut S::Node) -> Result<()> {
        self.refresh(node)?;
        if node.id().is_none() || !node.bounds().is_valid() {
            return self.make_root(node, None);
        }
        self.store.persist(node)
    }

    fn check_move(&self, current: &Bounds, relation: Relation, target: &Bounds) -> Result<()> {
        if target.is_descendant_of(current, self.scoping()) {
            return Err(InvalidOperation::IntoOwnSubtree.into());
        }
        relation.check_reference(target)?;
        if relation == Relation::ParentOf && !current.is_leaf() {
            return Err(InvalidOperation::ParentMustBeLeaf.into());
        }
        Ok(())
    }

    fn scope_in_use(&self, scope: i64) -> Result<bool> {
        let filter = Filter::new()
            .and(Column::Left, Cmp::Ge, 1)
            .and(Column::Scope, Cmp::Eq, scope);
        Ok(!self.store.select(&Select::filter(filter).limit(1))?.is_empty())
    }

    fn next_scope(&self) -> Result<i64> {
        Ok(match self.store.max_scope()? {
            Some(max) if max > 0 => max + 1,
            _ => 1,
        })
    }

    /// Opens a two-wide gap for a new node and persists it there.
    fn place_new(&mut self, node: &mut S::Node, relation: Relation, target: Bounds) -> Result<()> {
        let bounds = if relation == Relation::ParentOf {
            self.shift(target.right + 1, 2, target.scope)?;
            let subtree = Filter::new()
                .and(Column::Left, Cmp::Ge, target.left)
                .and(Column::Right, Cmp::Le, target.right);
            self.store.update_where(
                &self.scoped(subtree, target.scope),
                &[
                    Assignment::Add(Column::Left, 1),
                    Assignment::Add(Column::Right, 1),
                    Assignment::Add(Column::Level, 1),
                ],
            )?;
            Bounds::new(target.left, target.right + 2, target.level, target.scope)
        } else {
            let (left, level) = relation.placement(&target);
            self.shift(left, 2, target.scope)?;
            Bounds::new(left, left + 1, level, target.scope)
        };
        node.set_bounds(bounds);
        self.store.persist(node)
    }

    /// Same-tree move: open the destination gap, fix levels, slide the subtree in, close the
    /// source gap.
    fn update_node(
        &mut self,
        node_id: NodeId<S>,
        node: &mut S::Node,
        current: Bounds,
        new_left: i64,
        level_delta: i64,
    ) -> Result<()> {
        let scope = current.scope;
        let width = current.width();
        let (mut left, mut right) = (current.left, current.right);

        self.shift(new_left, width, scope)?;
        if left >= new_left {
            left += width;
            right += width;
        }
        if level_delta != 0 {
            let subtree = Filter::new()
                .and(Column::Left, Cmp::Ge, left)
                .and(Column::Right, Cmp::Le, right);
            self.store.update_where(
                &self.scoped(subtree, scope),
                &[Assignment::Add(Column::Level, level_delta)],
            )?;
        }
        self.shift_range(left, right, new_left - left, scope)?;
        self.shift(right + 1, -width, scope)?;

        node.set_bounds(self.reload(node_id)?.bounds());
        self.store.persist(node)
    }

    /// Cross-tree move. Descendants are matched by the bounds and scope captured before any
    /// write.
    fn move_between_trees(
        &mut self,
        node: &mut S::Node,
        current: Bounds,
        new_left: i64,
        level_delta: i64,
        new_scope: i64,
    ) -> Result<()> {
        let width = current.width();
        let offset = new_left - current.left;

        self.shift(new_left, width, new_scope)?;
        if current.has_children() {
            let inside = Filter::new()
                .and(Column::Left, Cmp::Gt, current.left)
                .and(Column::Right, Cmp::Lt, current.right)
                .and(Column::Scope, Cmp::Eq, current.scope);
            self.store.update_where(
                &inside,
                &[
                    Assignment::Add(Column::Left, offset),
                    Assignment::Add(Column::Right, offset),
                    Assignment::Add(Column::Level, level_delta),
                    Assignment::Set(Column::Scope, new_scope),
                ],
            )?;
        }
        node.set_bounds(Bounds::new(
            new_left,
            new_left + width - 1,
            current.level + level_delta,
            new_scope,
        ));
        self.store.persist(node)?;
        self.shift(current.right + 1, -width, current.scope)
    }

    /// Detaches a leaf, closes its gap, then wraps the re-loaded reference with it.
    fn rewrap(
        &mut self,
        node: &mut S::Node,
        current: Bounds,
        target_id: NodeId<S>,
    ) -> Result<()> {
        node.set_bounds(Bounds::new(0, 0, 0, current.scope));
        self.store.persist(node)?;
        self.shift(current.right + 1, -2, current.scope)?;

        let target = self.reload(target_id)?.bounds();
        Relation::ParentOf.check_reference(&target)?;
        self.place_new(node, Relation::ParentOf, target)
    }
}
