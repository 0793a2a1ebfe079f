//! Range predicates, assignments and orderings understood by every [`super::TreeStore`].

use std::cmp::Ordering;
use std::fmt;

use crate::tree::Bounds;

/// Boundary column of a node row.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Column {
    /// Left boundary.
    Left,
    /// Right boundary.
    Right,
    /// Depth below the root.
    Level,
    /// Tree identifier.
    Scope,
}

impl Column {
    /// Reads this column out of a bounds tuple.
    pub fn get(self, bounds: &Bounds) -> i64 {
        match self {
            Column::Left => bounds.left,
            Column::Right => bounds.right,
            Column::Level => bounds.level,
            Column::Scope => bounds.scope,
        }
    }

    fn slot(self, bounds: &mut Bounds) -> &mut i64 {
        match self {
            Column::Left => &mut bounds.left,
            Column::Right => &mut bounds.right,
            Column::Level => &mut bounds.level,
            Column::Scope => &mut bounds.scope,
        }
    }
}

/// Comparison operator of a condition.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Cmp {
    /// `=`
    Eq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
}

impl Cmp {
    /// SQL spelling of the operator.
    pub fn as_sql(self) -> &'static str {
        match self {
            Cmp::Eq => "=",
            Cmp::Lt => "<",
            Cmp::Gt => ">",
            Cmp::Le => "<=",
            Cmp::Ge => ">=",
        }
    }

    fn holds(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Cmp::Eq => lhs == rhs,
            Cmp::Lt => lhs < rhs,
            Cmp::Gt => lhs > rhs,
            Cmp::Le => lhs <= rhs,
            Cmp::Ge => lhs >= rhs,
        }
    }
}

/// `column <cmp> value`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Condition {
    /// Compared column.
    pub column: Column,
    /// Operator.
    pub cmp: Cmp,
    /// Literal right-hand side.
    pub value: i64,
}

/// Conjunction of conditions. An empty filter matches every row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Filter matching every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `column <cmp> value` to the conjunction.
    pub fn and(mut self, column: Column, cmp: Cmp, value: i64) -> Self {
        self.conditions.push(Condition { column, cmp, value });
        self
    }

    /// The conditions, in insertion order.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Evaluates the filter against one row.
    pub fn matches(&self, bounds: &Bounds) -> bool {
        self.conditions
            .iter()
            .all(|c| c.cmp.holds(c.column.get(bounds), c.value))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conditions.is_empty() {
            return f.write_str("true");
        }
        for (idx, c) in self.conditions.iter().enumerate() {
            if idx > 0 {
                f.write_str(" and ")?;
            }
            write!(f, "{:?} {} {}", c.column, c.cmp.as_sql(), c.value)?;
        }
        Ok(())
    }
}

/// Column write applied by a bulk update.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Assignment {
    /// `column = column + delta`
    Add(Column, i64),
    /// `column = value`
    Set(Column, i64),
}

impl Assignment {
    /// The written column.
    pub fn column(&self) -> Column {
        match *self {
            Assignment::Add(column, _) | Assignment::Set(column, _) => column,
        }
    }

    /// Applies the write to an in-memory row.
    pub fn apply(&self, bounds: &mut Bounds) {
        match *self {
            Assignment::Add(column, delta) => *column.slot(bounds) += delta,
            Assignment::Set(column, value) => *column.slot(bounds) = value,
        }
    }
}

/// Sort direction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first.
    Asc,
    /// Largest first.
    Desc,
}

/// A filtered, optionally ordered and limited read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Select {
    /// Row filter.
    pub filter: Filter,
    /// Sort key.
    pub order: Option<(Column, Direction)>,
    /// Maximum number of rows returned.
    pub limit: Option<usize>,
}

impl Select {
    /// Reads every row matching `filter`, unordered.
    pub fn filter(filter: Filter) -> Self {
        Self {
            filter,
            order: None,
            limit: None,
        }
    }

    /// Orders by `column` in `direction`.
    pub fn order_by(mut self, column: Column, direction: Direction) -> Self {
        self.order = Some((column, direction));
        self
    }

    /// Caps the result size.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Compares two rows under this query's ordering.
    pub fn compare(&self, a: &Bounds, b: &Bounds) -> Ordering {
        match self.order {
            Some((column, Direction::Asc)) => column.get(a).cmp(&column.get(b)),
            Some((column, Direction::Desc)) => column.get(b).cmp(&column.get(a)),
            None => Ordering::Equal,
        }
    }
}
