use std::path::Path;
use std::time::Duration;

use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use tracing::{debug, trace};

use crate::config::{ArborConfig, SqliteOptions};
use crate::error::{InvalidOperation, Result, TreeError};
use crate::store::{Assignment, Column, Direction, Filter, Select, TreeNode, TreeStore};
use crate::tree::{Bounds, NestedSet};
use crate::types::{Record, RecordId};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Quoted identifiers of the node table.
#[derive(Debug, Clone)]
struct Layout {
    table: String,
    id: String,
    name: String,
    left: String,
    right: String,
    level: String,
    scope: String,
}

impl Layout {
    fn new(options: &SqliteOptions) -> Self {
        let quote = |name: &str| format!("\"{name}\"");
        Self {
            table: quote(&options.table),
            id: quote(&options.id_column),
            name: quote(&options.name_column),
            left: quote(&options.left_column),
            right: quote(&options.right_column),
            level: quote(&options.level_column),
            scope: quote(&options.scope_column),
        }
    }

    fn column(&self, column: Column) -> &str {
        match column {
            Column::Left => &self.left,
            Column::Right => &self.right,
            Column::Level => &self.level,
            Column::Scope => &self.scope,
        }
    }

    fn projection(&self) -> String {
        format!(
            "{}, {}, {}, {}, {}, {}",
            self.id, self.name, self.left, self.right, self.level, self.scope
        )
    }

    /// Renders `filter` as a `WHERE` body, appending its literals to `params`.
    fn where_clause(&self, filter: &Filter, params: &mut Vec<i64>) -> String {
        if filter.conditions().is_empty() {
            return "1".to_string();
        }
        filter
            .conditions()
            .iter()
            .map(|condition| {
                params.push(condition.value);
                format!(
                    "{} {} ?",
                    self.column(condition.column),
                    condition.cmp.as_sql()
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

/// [`TreeStore`] backed by a SQLite table.
///
/// Range updates and deletes become single `UPDATE`/`DELETE` statements, so every shift pass
/// is evaluated against the pre-statement row values. Write transactions start with
/// `BEGIN IMMEDIATE`, which takes the database's reserved lock up front and serializes
/// concurrent writers.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    layout: Layout,
    in_transaction: bool,
}

impl SqliteStore {
    /// Opens (or creates) a database file and makes sure the node table exists.
    pub fn open(path: impl AsRef<Path>, options: SqliteOptions) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        debug!(path = %path.as_ref().display(), "opened sqlite tree store");
        Self::from_connection(conn, options)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory(options: SqliteOptions) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, options)
    }

    /// Wraps an existing connection.
    pub fn from_connection(conn: Connection, options: SqliteOptions) -> Result<Self> {
        options.validate()?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self {
            conn,
            layout: Layout::new(&options),
            in_transaction: false,
        };
        store.ensure_table()?;
        Ok(store)
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn ensure_table(&self) -> Result<()> {
        let l = &self.layout;
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                {id} INTEGER PRIMARY KEY,
                {name} TEXT NOT NULL DEFAULT '',
                {left} INTEGER NOT NULL,
                {right} INTEGER NOT NULL,
                {level} INTEGER NOT NULL,
                {scope} INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS {left_idx} ON {table} ({scope}, {left});
            CREATE INDEX IF NOT EXISTS {right_idx} ON {table} ({scope}, {right});",
            table = l.table,
            id = l.id,
            name = l.name,
            left = l.left,
            right = l.right,
            level = l.level,
            scope = l.scope,
            left_idx = index_name(&l.table, "scope_left"),
            right_idx = index_name(&l.table, "scope_right"),
        ))?;
        Ok(())
    }

    /// Maps undecodable column values to [`TreeError::Corruption`].
    fn decode_error(err: rusqlite::Error) -> TreeError {
        match err {
            rusqlite::Error::InvalidColumnType(idx, name, ty) => {
                TreeError::Corruption(format!("column {name} (#{idx}) holds {ty}"))
            }
            rusqlite::Error::FromSqlConversionFailure(idx, ty, source) => {
                TreeError::Corruption(format!("column #{idx} ({ty}) does not decode: {source}"))
            }
            other => other.into(),
        }
    }

    fn read_row(row: &Row<'_>) -> rusqlite::Result<Record> {
        Ok(Record::from_parts(
            RecordId(row.get(0)?),
            row.get(1)?,
            Bounds::new(row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?),
        ))
    }
}

impl NestedSet<SqliteStore> {
    /// Opens the tree described by `config`: its `database` file with the configured table
    /// layout, or a private in-memory database when no file is set.
    pub fn from_config(config: &ArborConfig) -> Result<Self> {
        let store = match &config.database {
            Some(path) => SqliteStore::open(path, config.sqlite.clone())?,
            None => SqliteStore::open_in_memory(config.sqlite.clone())?,
        };
        Ok(NestedSet::new(store, config.tree.clone()))
    }
}

fn index_name(quoted_table: &str, suffix: &str) -> String {
    format!("\"{}_{suffix}\"", quoted_table.trim_matches('"'))
}

impl TreeStore for SqliteStore {
    type Node = Record;

    fn begin(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(InvalidOperation::TransactionState("transaction already open").into());
        }
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(InvalidOperation::TransactionState("commit without begin").into());
        }
        self.conn.execute_batch("COMMIT")?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(InvalidOperation::TransactionState("rollback without begin").into());
        }
        self.in_transaction = false;
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn load(&self, id: RecordId) -> Result<Option<Record>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            self.layout.projection(),
            self.layout.table,
            self.layout.id
        );
        let record = self
            .conn
            .query_row(&sql, [id.0], Self::read_row)
            .optional()
            .map_err(Self::decode_error)?;
        Ok(record)
    }

    fn persist(&mut self, node: &mut Record) -> Result<()> {
        let l = &self.layout;
        let bounds = node.bounds();
        match node.id() {
            Some(id) => {
                let sql = format!(
                    "INSERT INTO {table} ({id}, {name}, {left}, {right}, {level}, {scope})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT({id}) DO UPDATE SET
                        {name} = excluded.{name},
                        {left} = excluded.{left},
                        {right} = excluded.{right},
                        {level} = excluded.{level},
                        {scope} = excluded.{scope}",
                    table = l.table,
                    id = l.id,
                    name = l.name,
                    left = l.left,
                    right = l.right,
                    level = l.level,
                    scope = l.scope,
                );
                self.conn.execute(
                    &sql,
                    rusqlite::params![
                        id.0,
                        node.name,
                        bounds.left,
                        bounds.right,
                        bounds.level,
                        bounds.scope
                    ],
                )?;
            }
            None => {
                let sql = format!(
                    "INSERT INTO {} ({}, {}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4, ?5)",
                    l.table, l.name, l.left, l.right, l.level, l.scope
                );
                self.conn.execute(
                    &sql,
                    rusqlite::params![
                        node.name,
                        bounds.left,
                        bounds.right,
                        bounds.level,
                        bounds.scope
                    ],
                )?;
                node.set_id(RecordId(self.conn.last_insert_rowid()));
            }
        }
        Ok(())
    }

    fn select(&self, query: &Select) -> Result<Vec<Record>> {
        let mut params = Vec::new();
        let mut sql = format!(
            "SELECT {} FROM {} WHERE {}",
            self.layout.projection(),
            self.layout.table,
            self.layout.where_clause(&query.filter, &mut params)
        );
        if let Some((column, direction)) = query.order {
            let dir = match direction {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            sql.push_str(&format!(
                " ORDER BY {} {dir}, {} ASC",
                self.layout.column(column),
                self.layout.id
            ));
        } else {
            sql.push_str(&format!(" ORDER BY {} ASC", self.layout.id));
        }
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        trace!(%sql, ?params, "sqlite select");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), Self::read_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(Self::decode_error)?);
        }
        Ok(out)
    }

    fn update_where(&mut self, filter: &Filter, assignments: &[Assignment]) -> Result<u64> {
        if assignments.is_empty() {
            return Ok(0);
        }
        let mut params = Vec::with_capacity(assignments.len() + filter.conditions().len());
        let set = assignments
            .iter()
            .map(|assignment| {
                let column = self.layout.column(assignment.column());
                match *assignment {
                    Assignment::Add(_, delta) => {
                        params.push(delta);
                        format!("{column} = {column} + ?")
                    }
                    Assignment::Set(_, value) => {
                        params.push(value);
                        format!("{column} = ?")
                    }
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        let clause = self.layout.where_clause(filter, &mut params);
        let sql = format!("UPDATE {} SET {set} WHERE {clause}", self.layout.table);
        trace!(%sql, ?params, "sqlite update");
        let touched = self.conn.execute(&sql, params_from_iter(params.iter()))?;
        Ok(touched as u64)
    }

    fn delete_where(&mut self, filter: &Filter) -> Result<u64> {
        let mut params = Vec::new();
        let clause = self.layout.where_clause(filter, &mut params);
        let sql = format!("DELETE FROM {} WHERE {clause}", self.layout.table);
        trace!(%sql, ?params, "sqlite delete");
        let removed = self.conn.execute(&sql, params_from_iter(params.iter()))?;
        Ok(removed as u64)
    }

    fn max_scope(&self) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT MAX({}) FROM {}",
            self.layout.scope, self.layout.table
        );
        let max = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(max)
    }
}
