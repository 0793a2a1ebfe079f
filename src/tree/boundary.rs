/// Boundary tuple of one node.
///
/// `left` and `right` delimit the node's interval, `level` is its depth below the root and
/// `scope` names the tree it belongs to. All-zero bounds describe a detached node.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bounds {
    /// Left boundary.
    pub left: i64,
    /// Right boundary.
    pub right: i64,
    /// Depth below the root; the root is at level 0.
    pub level: i64,
    /// Tree identifier. Ignored when scoping is disabled.
    pub scope: i64,
}

impl Bounds {
    /// Builds a bounds tuple.
    pub const fn new(left: i64, right: i64, level: i64, scope: i64) -> Self {
        Self {
            left,
            right,
            level,
            scope,
        }
    }

    /// Bounds of a single-node tree in `scope`.
    pub const fn root(scope: i64) -> Self {
        Self::new(1, 2, 0, scope)
    }

    /// Whether the node carries usable boundaries.
    pub fn is_valid(&self) -> bool {
        self.right > self.left
    }

    /// Whether the node is the root of its tree.
    pub fn is_root(&self) -> bool {
        self.left == 1
    }

    /// Whether the node has no descendants.
    pub fn is_leaf(&self) -> bool {
        self.right - self.left == 1
    }

    /// Whether the node has at least one descendant.
    pub fn has_children(&self) -> bool {
        self.right - self.left > 1
    }

    /// Whether the node sits below some root.
    pub fn has_parent(&self) -> bool {
        self.is_valid() && !self.is_root()
    }

    /// Number of nodes strictly inside this node's interval.
    pub fn descendant_count(&self) -> i64 {
        (self.right - self.left - 1) / 2
    }

    /// Count of boundary values occupied by this node's subtree.
    pub fn width(&self) -> i64 {
        self.right - self.left + 1
    }

    /// Whether two nodes live in the same tree. Always true without scoping.
    pub fn same_scope(&self, other: &Bounds, scoping: bool) -> bool {
        !scoping || self.scope == other.scope
    }

    /// Whether `self` lies strictly inside `other`.
    pub fn is_descendant_of(&self, other: &Bounds, scoping: bool) -> bool {
        self.left > other.left && self.right < other.right && self.same_scope(other, scoping)
    }

    /// Whether `self` lies inside `other` or is `other`.
    pub fn is_descendant_of_or_equal(&self, other: &Bounds, scoping: bool) -> bool {
        self.left >= other.left && self.right <= other.right && self.same_scope(other, scoping)
    }

    /// Whether `other` lies strictly inside `self`.
    pub fn is_ancestor_of(&self, other: &Bounds, scoping: bool) -> bool {
        other.is_descendant_of(self, scoping)
    }

    /// Boundary equality, including scope when scoping is enabled.
    pub fn is_equal(&self, other: &Bounds, scoping: bool) -> bool {
        self.left == other.left && self.right == other.right && self.same_scope(other, scoping)
    }

    /// Shape check for bounds read back from a store: either detached or a well-formed interval.
    pub(crate) fn is_well_formed(&self) -> bool {
        let detached = self.left == 0 && self.right == 0;
        detached
            || (self.left >= 1
                && self.is_valid()
                && (self.right - self.left) % 2 == 1
                && self.level >= 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_bounds_are_invalid() {
        let bounds = Bounds::default();
        assert!(!bounds.is_valid());
        assert!(!bounds.is_root());
        assert!(!bounds.has_parent());
        assert!(bounds.is_well_formed());
    }

    #[test]
    fn leaf_and_counts() {
        let root = Bounds::new(1, 10, 0, 1);
        let leaf = Bounds::new(4, 5, 2, 1);
        assert!(root.is_root());
        assert!(root.has_children());
        assert_eq!(root.descendant_count(), 4);
        assert_eq!(root.width(), 10);
        assert!(leaf.is_leaf());
        assert!(leaf.has_parent());
        assert_eq!(leaf.descendant_count(), 0);
    }

    #[test]
    fn containment_respects_scope() {
        let outer = Bounds::new(1, 10, 0, 1);
        let inner = Bounds::new(2, 3, 1, 1);
        let foreign = Bounds::new(2, 3, 1, 2);

        assert!(inner.is_descendant_of(&outer, true));
        assert!(outer.is_ancestor_of(&inner, true));
        assert!(!foreign.is_descendant_of(&outer, true));
        assert!(foreign.is_descendant_of(&outer, false));
        assert!(!outer.is_descendant_of(&outer, true));
        assert!(outer.is_descendant_of_or_equal(&outer, true));
    }

    #[test]
    fn equality_ignores_level_and_optionally_scope() {
        let a = Bounds::new(2, 3, 1, 1);
        let b = Bounds::new(2, 3, 4, 2);
        assert!(!a.is_equal(&b, true));
        assert!(a.is_equal(&b, false));
    }

    #[test]
    fn malformed_intervals_are_flagged() {
        assert!(!Bounds::new(3, 5, 1, 1).is_well_formed());
        assert!(!Bounds::new(5, 4, 1, 1).is_well_formed());
        assert!(!Bounds::new(0, 3, 0, 1).is_well_formed());
        assert!(Bounds::new(2, 7, 1, 1).is_well_formed());
    }
}
