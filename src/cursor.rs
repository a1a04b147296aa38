//! Database cursor.
//!
//! A `Cursor` drives statements over one connection: execute with optional
//! positional parameters, then pull rows out of the streaming result set.
//! Prepared statements are cached per cursor in an LRU keyed by SQL text;
//! evicted handles are closed on the server before the next request goes
//! out.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::statement::{BatchEntry, ColumnMetadata, PreparedStatement, ResultSet, Statement};
use crate::value::{Row, Value};

/// Default prepared-statement cache capacity per cursor.
const DEFAULT_CACHE_CAPACITY: usize = 50;

/// A cursor over an open connection.
///
/// The mutable borrow of the connection serialises all cursor traffic with
/// any other connection use, which is exactly the one-message-in-flight
/// discipline the protocol requires.
pub struct Cursor<'conn> {
    conn: &'conn mut Connection,
    closed: bool,
    /// Rows fetched by `fetch_many` when no size is given.
    pub array_size: usize,
    row_count: i64,
    statement: Option<Statement>,
    result_set: Option<ResultSet>,
    description: Option<Arc<Vec<ColumnMetadata>>>,
    cache: LruCache<String, PreparedStatement>,
    pending_close: Vec<i32>,
}

impl<'conn> Cursor<'conn> {
    pub(crate) fn new(conn: &'conn mut Connection) -> Self {
        Self::with_cache_capacity(conn, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(conn: &'conn mut Connection, capacity: usize) -> Self {
        Cursor {
            conn,
            closed: false,
            array_size: 1,
            row_count: -1,
            statement: None,
            result_set: None,
            description: None,
            cache: LruCache::new(NonZeroUsize::new(capacity.max(1)).unwrap()),
            pending_close: Vec::new(),
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Interface("cursor is closed".to_string()));
        }
        if self.conn.is_closed() {
            return Err(Error::Interface("connection is closed".to_string()));
        }
        Ok(())
    }

    /// Close open handles from the previous operation and flush evictions.
    async fn reset(&mut self) -> Result<()> {
        if let Some(mut rs) = self.result_set.take() {
            self.conn.close_result_set(&mut rs).await?;
        }
        if let Some(stmt) = self.statement.take() {
            self.conn.close_statement(stmt).await?;
        }
        for handle in std::mem::take(&mut self.pending_close) {
            self.conn.close_statement(Statement::new(handle)).await?;
        }
        self.description = None;
        self.row_count = -1;
        Ok(())
    }

    /// Execute a SQL operation, optionally with positional `?` parameters.
    pub async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<()> {
        self.check_open()?;
        self.reset().await?;

        let (handle, outcome) = if params.is_empty() {
            let stmt = self.conn.create_statement().await?;
            self.statement = Some(stmt);
            let outcome = self.conn.execute(stmt, sql).await?;
            (stmt.handle, outcome)
        } else {
            let stmt = self.prepared(sql).await?;
            let outcome = self.conn.execute_prepared(&stmt, params).await?;
            (stmt.handle, outcome)
        };

        self.row_count = outcome.row_count;
        if outcome.has_result_set() {
            let mut rs = self.conn.get_result_set(handle).await?;
            self.description = Some(self.conn.get_metadata(&mut rs).await?);
            self.result_set = Some(rs);
        }
        Ok(())
    }

    /// Execute one operation over a sequence of parameter tuples as a single
    /// batch. Returns the per-tuple outcomes; a failed tuple carries its
    /// error instead of raising. With auto-commit on, the batch is committed
    /// before returning.
    pub async fn execute_many(
        &mut self,
        sql: &str,
        param_seq: &[Vec<Value>],
    ) -> Result<Vec<BatchEntry>> {
        self.check_open()?;
        self.reset().await?;

        let stmt = self.prepared(sql).await?;
        let entries = self.conn.execute_batch_prepared(&stmt, param_seq).await?;

        self.row_count =
            entries.iter().map(|e| match e { BatchEntry::UpdateCount(n) if *n > 0 => *n, _ => 0 }).sum();

        if self.conn.auto_commit() {
            self.conn.commit().await?;
        }
        Ok(entries)
    }

    async fn prepared(&mut self, sql: &str) -> Result<PreparedStatement> {
        if let Some(found) = self.cache.get(sql) {
            return Ok(found.clone());
        }
        let stmt = self.conn.prepare(sql).await?;
        if let Some((evicted_sql, evicted)) = self.cache.push(sql.to_string(), stmt.clone()) {
            if evicted_sql != sql {
                self.pending_close.push(evicted.handle);
            }
        }
        Ok(stmt)
    }

    /// Fetch the next row, refilling the window from the server as needed.
    pub async fn fetch_one(&mut self) -> Result<Option<Row>> {
        self.check_open()?;
        let rs = self
            .result_set
            .as_mut()
            .ok_or_else(|| Error::Interface("previous execute produced no result set".to_string()))?;

        if rs.needs_fetch() {
            self.conn.fetch_next(rs).await?;
        }
        let rs = self.result_set.as_mut().unwrap();
        Ok(rs.next_buffered())
    }

    /// Fetch up to `size` rows (default `array_size`).
    pub async fn fetch_many(&mut self, size: Option<usize>) -> Result<Vec<Row>> {
        let size = size.unwrap_or(self.array_size);
        let mut rows = Vec::with_capacity(size);
        while rows.len() < size {
            match self.fetch_one().await? {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        Ok(rows)
    }

    /// Fetch every remaining row.
    pub async fn fetch_all(&mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.fetch_one().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Column metadata of the current result set, if any.
    pub fn description(&self) -> Option<&Arc<Vec<ColumnMetadata>>> {
        self.description.as_ref()
    }

    /// Update count of the last execute; -1 when not applicable.
    pub fn row_count(&self) -> i64 {
        self.row_count
    }

    /// Close the cursor, releasing every server-side handle it owns.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if !self.conn.is_closed() {
            self.reset().await?;
            while let Some((_, stmt)) = self.cache.pop_lru() {
                self.conn.close_statement(Statement::new(stmt.handle)).await?;
            }
        }
        self.closed = true;
        Ok(())
    }
}

impl std::fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("closed", &self.closed)
            .field("row_count", &self.row_count)
            .field("cached_statements", &self.cache.len())
            .finish()
    }
}
