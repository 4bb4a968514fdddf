//! An in-memory `ArchiveDriver` used only by tests: no network, no real
//! paging, just a scripted queue of outcomes per prepared statement.

use super::{ArchiveDriver, CqlValue, DriverResult, ErrorCb, Params, PreparedId, Row, SuccessCb};
use crate::error::ArchiveError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// One scripted response to an `execute_async` call.
pub enum Outcome {
    /// Delivered as a single page of rows, then `on_done`.
    Pages(Vec<Row>),
    Error(ArchiveError),
}

#[derive(Default)]
pub struct FakeDriver {
    fail_prepare: Mutex<std::collections::HashSet<String>>,
    scripts: Mutex<HashMap<String, VecDeque<Outcome>>>,
    pub calls: Mutex<Vec<(String, Params)>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        FakeDriver::default()
    }

    /// Queue `outcome` to be returned by the next `execute_async` call
    /// against `cql`. Outcomes for a statement are consumed in FIFO order;
    /// once the queue is empty, further calls return an empty page.
    pub fn push_outcome(&self, cql: &str, outcome: Outcome) {
        self.scripts
            .lock()
            .unwrap()
            .entry(cql.to_string())
            .or_default()
            .push_back(outcome);
    }

    pub fn fail_prepare_for(&self, cql: &str) {
        self.fail_prepare.lock().unwrap().insert(cql.to_string());
    }

    pub fn call_count(&self, cql: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == cql)
            .count()
    }
}

struct FakeDriverResult {
    outcome: Outcome,
}

impl DriverResult for FakeDriverResult {
    fn add_callbacks(
        self: Box<Self>,
        mut on_success: SuccessCb,
        on_done: Box<dyn FnOnce() + Send>,
        on_error: ErrorCb,
    ) {
        let outcome = self.outcome;
        // Deliver from a real OS thread, mirroring a driver callback firing
        // on its own thread rather than the task loop's.
        std::thread::spawn(move || match outcome {
            Outcome::Pages(rows) => {
                for row in rows {
                    on_success(row);
                }
                on_done();
            }
            Outcome::Error(e) => on_error(e),
        });
    }
}

#[async_trait]
impl ArchiveDriver for FakeDriver {
    async fn prepare(&self, cql: &str) -> Result<PreparedId, ArchiveError> {
        if self.fail_prepare.lock().unwrap().contains(cql) {
            return Err(ArchiveError::DriverPermanent(format!(
                "failed to prepare {cql}"
            )));
        }
        Ok(PreparedId(cql.to_string()))
    }

    fn execute_async(&self, stmt: &PreparedId, params: Params) -> Box<dyn DriverResult> {
        self.calls
            .lock()
            .unwrap()
            .push((stmt.0.clone(), params));
        let outcome = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&stmt.0)
            .and_then(|q| q.pop_front())
            .unwrap_or(Outcome::Pages(Vec::new()));
        Box::new(FakeDriverResult { outcome })
    }
}

/// Build a `data`-shaped row: `(data_time, data_time_us, value_r,
/// error_desc)`.
pub fn data_row(data_time: i64, data_time_us: i32, value: &str) -> Row {
    vec![
        CqlValue::BigInt(data_time),
        CqlValue::Int(data_time_us),
        CqlValue::Text(value.to_string()),
        CqlValue::Null,
    ]
}
