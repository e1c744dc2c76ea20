//! Forward-only recordsets over driver cursors

use std::collections::VecDeque;
use std::iter::FusedIterator;
use std::sync::Arc;

use crate::{ColumnMeta, RecordsetRow, Result, Value};

/// Driver-side result handle.
///
/// A cursor knows its columns and its total row count before the first
/// fetch, and hands out raw value vectors one row at a time. Dropping the
/// cursor releases whatever the driver holds for it.
pub trait Cursor: Send {
    /// Column metadata, in result order
    fn columns(&self) -> &[ColumnMeta];

    /// Total number of rows in the result, independent of how many have
    /// already been fetched
    fn row_count(&self) -> u64;

    /// Fetch the next row, or `None` once the result is exhausted
    fn fetch(&mut self) -> Result<Option<Vec<Value>>>;
}

/// A cursor over a result that the driver has already received in full.
///
/// Both bundled drivers buffer their results (the MySQL text protocol sends
/// every row before the client can report a count, and SQLite statements
/// borrow the connection), so this is what they hand to [`Recordset`].
#[derive(Debug, Default)]
pub struct BufferedCursor {
    columns: Vec<ColumnMeta>,
    rows: VecDeque<Vec<Value>>,
    total: u64,
}

impl BufferedCursor {
    pub fn new(columns: Vec<ColumnMeta>, rows: Vec<Vec<Value>>) -> Self {
        let total = rows.len() as u64;
        Self {
            columns,
            rows: rows.into(),
            total,
        }
    }
}

impl Cursor for BufferedCursor {
    fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    fn row_count(&self) -> u64 {
        self.total
    }

    fn fetch(&mut self) -> Result<Option<Vec<Value>>> {
        Ok(self.rows.pop_front())
    }
}

/// The rows produced by one `select`.
///
/// A recordset is single-pass: iterating it fetches rows from the cursor and
/// builds a [`RecordsetRow`] per step. The cursor is dropped as soon as it
/// reports the end of the result or an error, so a recordset that has been
/// fully iterated holds no driver resources. [`Recordset::row_count`] stays valid
/// throughout.
pub struct Recordset {
    cursor: Option<Box<dyn Cursor>>,
    columns: Arc<[String]>,
    meta: Vec<ColumnMeta>,
    count: u64,
}

impl Recordset {
    /// Wrap a driver cursor
    pub fn new(cursor: Box<dyn Cursor>) -> Self {
        let meta = cursor.columns().to_vec();
        let columns: Arc<[String]> = meta.iter().map(|c| c.name.clone()).collect();
        let count = cursor.row_count();
        Self {
            cursor: Some(cursor),
            columns,
            meta,
            count,
        }
    }

    /// Total number of rows in the result, however many have been read
    pub fn row_count(&self) -> u64 {
        self.count
    }

    /// True when the result has no rows
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Column names, in result order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Column metadata as reported by the driver
    pub fn column_meta(&self) -> &[ColumnMeta] {
        &self.meta
    }

    /// True once the cursor has been released
    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_none()
    }
}

impl Iterator for Recordset {
    type Item = Result<RecordsetRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;
        match cursor.fetch() {
            Ok(Some(values)) => Some(Ok(RecordsetRow::new(self.columns.clone(), values))),
            Ok(None) => {
                self.cursor = None;
                None
            }
            Err(e) => {
                tracing::debug!(error = %e, "releasing cursor after fetch error");
                self.cursor = None;
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for Recordset {}

impl std::fmt::Debug for Recordset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recordset")
            .field("columns", &self.columns)
            .field("count", &self.count)
            .field("exhausted", &self.is_exhausted())
            .finish()
    }
}
