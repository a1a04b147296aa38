//! Statement and result-set state.
//!
//! These types carry the client-side view of server-allocated handles:
//! plain statements, prepared statements with their parameter count, and
//! result sets with their buffered row window. All wire traffic for them
//! lives on `Connection`; a `ResultSet` is a passive buffer the connection
//! refills one server window at a time.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::value::{Row, Value};

// ============================================================================
// Statements
// ============================================================================

/// A server-side statement handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statement {
    pub handle: i32,
}

impl Statement {
    pub fn new(handle: i32) -> Self {
        Statement { handle }
    }
}

/// A server-side prepared statement: handle plus the parameter count the
/// server reported, used to validate bound tuples before they hit the wire.
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    pub handle: i32,
    pub parameter_count: usize,
    /// Result-set metadata, when the server sends it with the prepare
    /// response.
    pub description: Option<Arc<Vec<ColumnMetadata>>>,
}

impl PreparedStatement {
    pub fn new(handle: i32, parameter_count: usize) -> Self {
        PreparedStatement { handle, parameter_count, description: None }
    }
}

/// Which generated keys an execute should materialise.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GeneratedKeys {
    #[default]
    None,
    /// Server default key column(s).
    Returned,
    /// Identified by column position.
    ByIds(Vec<i32>),
    /// Identified by column name.
    ByNames(Vec<String>),
}

/// Outcome of a statement execution.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionResult {
    /// Non-zero when a result set is available via `GetResultSet`.
    pub result: i64,
    /// Update count; -1 for statements that do not update rows.
    pub row_count: i64,
}

impl ExecutionResult {
    pub fn has_result_set(&self) -> bool {
        self.result > 0
    }
}

/// Per-tuple outcome of a batch execution. A failed row keeps its error
/// instead of raising, so partial success stays observable.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEntry {
    UpdateCount(i64),
    Failed { code: i32, message: String },
}

impl BatchEntry {
    pub fn is_failed(&self) -> bool {
        matches!(self, BatchEntry::Failed { .. })
    }
}

// ============================================================================
// Column metadata
// ============================================================================

/// One column of a result set, as returned by `GetMetadata`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    pub catalog: String,
    pub schema: String,
    pub table: String,
    pub name: String,
    pub label: String,
    pub collation: Value,
    pub type_name: String,
    pub type_code: i32,
    pub display_size: i32,
    pub precision: i32,
    pub scale: i32,
    pub flags: i32,
}

// ============================================================================
// Result sets
// ============================================================================

/// A streaming cursor over a server result set.
///
/// Rows arrive in server-sized windows; the buffer holds the current window
/// and `complete` records whether the server has signalled the final end.
/// Draining the buffer without `complete` means the consumer should ask the
/// connection for the next window.
#[derive(Debug)]
pub struct ResultSet {
    pub handle: i32,
    pub column_count: usize,
    /// Column labels from the result-set bootstrap.
    pub labels: Vec<String>,
    rows: VecDeque<Row>,
    complete: bool,
    closed: bool,
    metadata: Option<Arc<Vec<ColumnMetadata>>>,
}

impl ResultSet {
    pub fn new(handle: i32, column_count: usize, labels: Vec<String>) -> Self {
        ResultSet {
            handle,
            column_count,
            labels,
            rows: VecDeque::new(),
            complete: false,
            closed: false,
            metadata: None,
        }
    }

    /// True once the server signalled the final end of the set.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn set_complete(&mut self) {
        self.complete = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn mark_closed(&mut self) {
        self.closed = true;
    }

    pub fn buffered_rows(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn push_row(&mut self, row: Row) {
        self.rows.push_back(row);
    }

    /// Next row out of the current window, if any.
    pub fn next_buffered(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }

    /// True when a `Next` round-trip is needed before more rows can appear.
    pub fn needs_fetch(&self) -> bool {
        self.rows.is_empty() && !self.complete
    }

    pub fn metadata(&self) -> Option<&Arc<Vec<ColumnMetadata>>> {
        self.metadata.as_ref()
    }

    pub(crate) fn cache_metadata(&mut self, meta: Arc<Vec<ColumnMetadata>>) {
        self.metadata = Some(meta);
    }
}
