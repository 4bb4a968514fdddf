//! The production `ArchiveDriver` adapter, wrapping the `scylla` crate.
//! Prepared statements are cached by CQL text, with the `Session` wrapped
//! in `Arc`. The scylla driver is natively async, unlike the callback-style
//! driver the rest of this crate is written against; this adapter's paging
//! loop runs as its own `tokio::spawn` task and drives the `DriverResult`
//! callbacks from there, mirroring a foreign-thread driver callback without
//! needing an actual blocking FFI driver.

use super::{ArchiveDriver, CqlValue as CoreCqlValue, DriverResult, ErrorCb, Params, PreparedId, Row, SuccessCb};
use crate::error::ArchiveError;
use dashmap::DashMap;
use scylla::frame::response::result::CqlValue as ScyllaCqlValue;
use scylla::prepared_statement::PreparedStatement;
use scylla::transport::errors::QueryError;
use scylla::{Session, SessionBuilder};
use std::sync::Arc;
use tracing::warn;

pub struct ScyllaDriver {
    session: Arc<Session>,
    prepared: DashMap<String, PreparedStatement>,
}

impl ScyllaDriver {
    pub async fn connect(contact_points: &[String], keyspace: &str) -> Result<Self, ArchiveError> {
        let session = SessionBuilder::new()
            .known_nodes(contact_points)
            .use_keyspace(keyspace, false)
            .build()
            .await
            .map_err(|e| ArchiveError::DriverPermanent(e.to_string()))?;
        Ok(ScyllaDriver {
            session: Arc::new(session),
            prepared: DashMap::new(),
        })
    }
}

fn to_scylla_value(v: &CoreCqlValue) -> ScyllaCqlValue {
    match v {
        CoreCqlValue::Text(s) => ScyllaCqlValue::Text(s.clone()),
        CoreCqlValue::Int(i) => ScyllaCqlValue::Int(*i),
        CoreCqlValue::BigInt(i) => ScyllaCqlValue::BigInt(*i),
        CoreCqlValue::Double(d) => ScyllaCqlValue::Double(*d),
        CoreCqlValue::Boolean(b) => ScyllaCqlValue::Boolean(*b),
        CoreCqlValue::Uuid(u) => ScyllaCqlValue::Uuid(*u),
        CoreCqlValue::Null => ScyllaCqlValue::Empty,
    }
}

fn from_scylla_value(v: Option<ScyllaCqlValue>) -> CoreCqlValue {
    match v {
        None | Some(ScyllaCqlValue::Empty) => CoreCqlValue::Null,
        Some(ScyllaCqlValue::Text(s)) | Some(ScyllaCqlValue::Ascii(s)) => CoreCqlValue::Text(s),
        Some(ScyllaCqlValue::Int(i)) => CoreCqlValue::Int(i),
        Some(ScyllaCqlValue::BigInt(i)) => CoreCqlValue::BigInt(i),
        Some(ScyllaCqlValue::Double(d)) => CoreCqlValue::Double(d),
        Some(ScyllaCqlValue::Boolean(b)) => CoreCqlValue::Boolean(b),
        Some(ScyllaCqlValue::Uuid(u)) => CoreCqlValue::Uuid(u),
        _ => CoreCqlValue::Null,
    }
}

fn classify_query_error(err: QueryError) -> ArchiveError {
    match err {
        QueryError::RequestTimeout(_)
        | QueryError::TimeoutError
        | QueryError::UnableToAllocStreamId
        | QueryError::IoError(_) => ArchiveError::DriverTransient(err.to_string()),
        other => ArchiveError::DriverPermanent(other.to_string()),
    }
}

struct ScyllaDriverResult {
    session: Arc<Session>,
    prepared: PreparedStatement,
    params: Vec<ScyllaCqlValue>,
}

impl DriverResult for ScyllaDriverResult {
    fn add_callbacks(
        self: Box<Self>,
        mut on_success: SuccessCb,
        on_done: Box<dyn FnOnce() + Send>,
        on_error: ErrorCb,
    ) {
        tokio::spawn(async move {
            let mut paging_state = scylla::transport::iterator::PagingState::start();
            loop {
                let page = self
                    .session
                    .execute_single_page(&self.prepared, self.params.clone(), paging_state.clone())
                    .await;

                let (result, next_state) = match page {
                    Ok(pair) => pair,
                    Err(e) => {
                        on_error(classify_query_error(e));
                        return;
                    }
                };

                let rows = match result.rows() {
                    Ok(rows) => rows,
                    Err(e) => {
                        on_error(ArchiveError::DriverPermanent(e.to_string()));
                        return;
                    }
                };

                for row in rows {
                    let converted: Row = row.columns.into_iter().map(from_scylla_value).collect();
                    on_success(converted);
                }

                match next_state.into_paging_control_flow() {
                    scylla::transport::iterator::PagingControlFlow::Continue(state) => {
                        paging_state = state;
                    }
                    scylla::transport::iterator::PagingControlFlow::Break => {
                        on_done();
                        return;
                    }
                }
            }
        });
    }
}

#[async_trait::async_trait]
impl ArchiveDriver for ScyllaDriver {
    async fn prepare(&self, cql: &str) -> Result<PreparedId, ArchiveError> {
        match self.session.prepare(cql).await {
            Ok(stmt) => {
                self.prepared.insert(cql.to_string(), stmt);
                Ok(PreparedId(cql.to_string()))
            }
            Err(e) => {
                warn!(cql, error = %e, "failed to prepare statement");
                Err(ArchiveError::DriverPermanent(e.to_string()))
            }
        }
    }

    fn execute_async(&self, stmt: &PreparedId, params: Params) -> Box<dyn DriverResult> {
        let prepared = self
            .prepared
            .get(&stmt.0)
            .expect("execute_async called with an unprepared statement id")
            .clone();
        let params: Vec<ScyllaCqlValue> = params.iter().map(to_scylla_value).collect();
        Box::new(ScyllaDriverResult {
            session: self.session.clone(),
            prepared,
            params,
        })
    }
}
