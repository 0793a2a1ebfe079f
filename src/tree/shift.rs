use tracing::trace;

use crate::error::Result;
use crate::store::{Assignment, Cmp, Column, Filter, TreeStore};
use crate::tree::NestedSet;

impl<S: TreeStore> NestedSet<S> {
    /// Adds `delta` to every left boundary `>= first`, then to every right boundary `>= first`,
    /// within `scope`. A negative delta closes a gap.
    ///
    /// Callers own the transaction.
    pub(crate) fn shift(&mut self, first: i64, delta: i64, scope: i64) -> Result<()> {
        self.shift_columns(first, None, delta, scope)
    }

    /// Like [`NestedSet::shift`], restricted to boundaries in `first..=last`. Used to slide a
    /// subtree without touching anything outside it.
    pub(crate) fn shift_range(
        &mut self,
        first: i64,
        last: i64,
        delta: i64,
        scope: i64,
    ) -> Result<()> {
        self.shift_columns(first, Some(last), delta, scope)
    }

    // One statement per column: a row can cross the threshold with one boundary only.
    fn shift_columns(
        &mut self,
        first: i64,
        last: Option<i64>,
        delta: i64,
        scope: i64,
    ) -> Result<()> {
        if delta == 0 {
            return Ok(());
        }
        for column in [Column::Left, Column::Right] {
            let mut filter = Filter::new().and(column, Cmp::Ge, first);
            if let Some(last) = last {
                filter = filter.and(column, Cmp::Le, last);
            }
            let filter = self.scoped(filter, scope);
            let touched = self
                .store
                .update_where(&filter, &[Assignment::Add(column, delta)])?;
            trace!(?column, first, ?last, delta, scope, touched, "shift");
        }
        Ok(())
    }
}
