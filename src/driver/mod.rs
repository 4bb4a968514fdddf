//! The driver abstraction: a callback-style wide-column driver interface.
//! This crate depends only on [`ArchiveDriver`]; the concrete production
//! adapter lives in [`scylla_driver`], and an in-memory fake used by tests
//! lives in [`fake`].

pub mod bridge;
pub mod scylla_driver;

#[cfg(test)]
pub mod fake;

use crate::error::ArchiveError;
use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

/// A single bound CQL value. The core is type-agnostic across the 26
/// per-type data tables; values round-trip as text except for the few
/// structural columns (ids, periods) that need their native types.
#[derive(Debug, Clone, PartialEq)]
pub enum CqlValue {
    Text(String),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Boolean(bool),
    Uuid(Uuid),
    Null,
}

pub type Row = Vec<CqlValue>;

/// A full, already-concatenated result table: every page of a paged query,
/// assembled by the driver-future bridge.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(rows: Vec<Row>) -> Self {
        Table { rows }
    }
}

/// Bind parameters for a prepared statement execution.
pub type Params = Vec<CqlValue>;

/// An opaque handle to a statement prepared against the driver session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreparedId(pub String);

impl fmt::Display for PreparedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A callback invoked with one page of results. Returns `true` if the
/// driver should fetch the next page, `false` once the caller is done
/// (mirrors the `has_more_pages` check in `aiocassandra.py`).
pub type SuccessCb = Box<dyn FnMut(Row) + Send>;
pub type ErrorCb = Box<dyn FnOnce(ArchiveError) + Send>;

/// The in-flight result of a driver execution: pages are delivered via
/// callbacks that may run on the driver's own threads, not the task loop.
pub trait DriverResult: Send {
    /// Register success/error callbacks. `on_success` is called once per
    /// page with that page's rows; the driver result itself is responsible
    /// for fetching subsequent pages and for eventually signaling
    /// completion via `on_done` (no more pages) or `on_error`.
    fn add_callbacks(
        self: Box<Self>,
        on_success: SuccessCb,
        on_done: Box<dyn FnOnce() + Send>,
        on_error: ErrorCb,
    );
}

/// The abstraction this crate depends on for all wide-column access:
/// prepare statements once, execute them with paged async delivery.
#[async_trait]
pub trait ArchiveDriver: Send + Sync {
    async fn prepare(&self, cql: &str) -> Result<PreparedId, ArchiveError>;
    fn execute_async(&self, stmt: &PreparedId, params: Params) -> Box<dyn DriverResult>;
}
