use std::collections::BTreeMap;

use tracing::trace;

use crate::error::{InvalidOperation, Result, TreeError};
use crate::store::{Assignment, Filter, Select, TreeNode, TreeStore};
use crate::types::{Record, RecordId};

/// In-memory [`TreeStore`] with snapshot transactions.
///
/// `begin` clones the row map, `rollback` restores the clone. Writes can be made to fail on
/// demand with [`MemoryStore::fail_writes_after`], which is how the atomicity of the tree
/// engine is exercised in tests.
#[derive(Debug)]
pub struct MemoryStore<N = Record> {
    rows: BTreeMap<RecordId, N>,
    next_id: i64,
    snapshot: Option<(BTreeMap<RecordId, N>, i64)>,
    writes_before_failure: Option<u64>,
}

impl<N> Default for MemoryStore<N> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
            snapshot: None,
            writes_before_failure: None,
        }
    }
}

impl<N: TreeNode<Id = RecordId>> MemoryStore<N> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the store holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every row, ordered by identifier.
    pub fn rows(&self) -> impl Iterator<Item = &N> {
        self.rows.values()
    }

    /// Whether a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Lets `writes` more writes succeed, then fails every later write.
    pub fn fail_writes_after(&mut self, writes: u64) {
        self.writes_before_failure = Some(writes);
    }

    /// Removes any pending write failure.
    pub fn clear_faults(&mut self) {
        self.writes_before_failure = None;
    }

    fn charge_write(&mut self) -> Result<()> {
        match self.writes_before_failure.as_mut() {
            Some(0) => Err(TreeError::Storage("injected write failure".into())),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl<N: TreeNode<Id = RecordId>> TreeStore for MemoryStore<N> {
    type Node = N;

    fn begin(&mut self) -> Result<()> {
        if self.snapshot.is_some() {
            return Err(InvalidOperation::TransactionState("transaction already open").into());
        }
        self.snapshot = Some((self.rows.clone(), self.next_id));
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| InvalidOperation::TransactionState("commit without begin").into())
    }

    fn rollback(&mut self) -> Result<()> {
        let (rows, next_id) = self
            .snapshot
            .take()
            .ok_or(InvalidOperation::TransactionState("rollback without begin"))?;
        self.rows = rows;
        self.next_id = next_id;
        Ok(())
    }

    fn load(&self, id: RecordId) -> Result<Option<N>> {
        Ok(self.rows.get(&id).cloned())
    }

    fn persist(&mut self, node: &mut N) -> Result<()> {
        self.charge_write()?;
        let id = match node.id() {
            Some(id) => {
                self.next_id = self.next_id.max(id.0 + 1);
                id
            }
            None => {
                let id = RecordId(self.next_id);
                self.next_id += 1;
                node.set_id(id);
                id
            }
        };
        self.rows.insert(id, node.clone());
        Ok(())
    }

    fn select(&self, query: &Select) -> Result<Vec<N>> {
        let mut hits: Vec<&N> = self
            .rows
            .values()
            .filter(|row| query.filter.matches(&row.bounds()))
            .collect();
        hits.sort_by(|a, b| {
            query
                .compare(&a.bounds(), &b.bounds())
                .then_with(|| a.id().cmp(&b.id()))
        });
        if let Some(limit) = query.limit {
            hits.truncate(limit);
        }
        Ok(hits.into_iter().cloned().collect())
    }

    fn update_where(&mut self, filter: &Filter, assignments: &[Assignment]) -> Result<u64> {
        self.charge_write()?;
        let mut touched = 0;
        for row in self.rows.values_mut() {
            let mut bounds = row.bounds();
            if !filter.matches(&bounds) {
                continue;
            }
            for assignment in assignments {
                assignment.apply(&mut bounds);
            }
            row.set_bounds(bounds);
            touched += 1;
        }
        trace!(%filter, touched, "memory update");
        Ok(touched)
    }

    fn delete_where(&mut self, filter: &Filter) -> Result<u64> {
        self.charge_write()?;
        let before = self.rows.len();
        self.rows.retain(|_, row| !filter.matches(&row.bounds()));
        Ok((before - self.rows.len()) as u64)
    }

    fn max_scope(&self) -> Result<Option<i64>> {
        Ok(self.rows.values().map(|row| row.bounds().scope).max())
    }
}
