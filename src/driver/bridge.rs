//! The driver-future bridge: turns a callback-delivered, possibly paged
//! driver result into a task-loop-native awaitable. The scheduler handle is
//! passed in explicitly and never looked up from process-global state, so
//! the bridge works the same whether callbacks arrive on the loop thread or
//! a foreign one.

use super::{ArchiveDriver, ErrorCb, Params, PreparedId, Row, SuccessCb, Table};
use crate::error::ArchiveError;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::oneshot;

/// Submit `stmt`/`params` through `driver` and return a future that
/// completes on `loop_handle` with the concatenated result table.
pub async fn execute_future(
    driver: &dyn ArchiveDriver,
    stmt: &PreparedId,
    params: Params,
    loop_handle: Handle,
) -> Result<Table, ArchiveError> {
    let (tx, rx) = oneshot::channel::<Result<Table, ArchiveError>>();
    let tx = Arc::new(Mutex::new(Some(tx)));
    let rows: Arc<Mutex<Vec<Row>>> = Arc::new(Mutex::new(Vec::new()));

    let driver_result = driver.execute_async(stmt, params);

    let rows_for_success = rows.clone();
    let on_success: SuccessCb = Box::new(move |row| {
        rows_for_success.lock().expect("bridge rows lock poisoned").push(row);
    });

    let rows_for_done = rows.clone();
    let tx_for_done = tx.clone();
    let handle_for_done = loop_handle.clone();
    let on_done: Box<dyn FnOnce() + Send> = Box::new(move || {
        let collected = std::mem::take(&mut *rows_for_done.lock().expect("bridge rows lock poisoned"));
        let tx = tx_for_done.clone();
        // The completion MUST be scheduled onto the task loop, never
        // delivered directly from whatever thread this callback runs on.
        handle_for_done.spawn(async move {
            if let Some(sender) = tx.lock().expect("bridge tx lock poisoned").take() {
                let _ = sender.send(Ok(Table::new(collected)));
            }
        });
    });

    let tx_for_error = tx.clone();
    let handle_for_error = loop_handle;
    let on_error: ErrorCb = Box::new(move |err| {
        let tx = tx_for_error.clone();
        handle_for_error.spawn(async move {
            if let Some(sender) = tx.lock().expect("bridge tx lock poisoned").take() {
                let _ = sender.send(Err(err));
            }
        });
    });

    driver_result.add_callbacks(on_success, on_done, on_error);

    rx.await
        .unwrap_or_else(|_| Err(ArchiveError::DriverPermanent("bridge channel dropped".into())))
}

/// Default retry ceiling for [`with_retry`].
pub const DEFAULT_MAX_RETRIES: usize = 5;

/// Retry `attempt` up to `max_retries` additional times, but only when it
/// fails with [`ArchiveError::DriverTransient`]. A permanent failure (bad
/// query, auth, schema mismatch) is never transient and retrying it only
/// delays the caller.
pub async fn with_retry<F, Fut>(max_retries: usize, mut attempt: F) -> Result<Table, ArchiveError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Table, ArchiveError>>,
{
    let mut last_err = None;
    for _ in 0..=max_retries {
        match attempt().await {
            Ok(table) => return Ok(table),
            Err(e) if e.is_retriable() => last_err = Some(e),
            Err(e) => return Err(e),
        }
    }
    Err(last_err.expect("loop runs at least once"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::{data_row, FakeDriver, Outcome};

    #[tokio::test]
    async fn bridges_a_single_page_result() {
        let driver = FakeDriver::new();
        let stmt = driver.prepare("select 1").await.unwrap();
        driver.push_outcome(
            "select 1",
            Outcome::Pages(vec![data_row(1, 0, "3.14")]),
        );

        let table = execute_future(&driver, &stmt, vec![], Handle::current())
            .await
            .unwrap();
        assert_eq!(table.rows.len(), 1);
    }

    #[tokio::test]
    async fn bridges_an_error() {
        let driver = FakeDriver::new();
        let stmt = driver.prepare("select 1").await.unwrap();
        driver.push_outcome(
            "select 1",
            Outcome::Error(ArchiveError::DriverPermanent("boom".into())),
        );

        let err = execute_future(&driver, &stmt, vec![], Handle::current())
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::DriverPermanent(_)));
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let driver = FakeDriver::new();
        let stmt = driver.prepare("select 1").await.unwrap();
        driver.push_outcome(
            "select 1",
            Outcome::Error(ArchiveError::DriverTransient("timeout".into())),
        );
        driver.push_outcome(
            "select 1",
            Outcome::Error(ArchiveError::DriverTransient("timeout".into())),
        );
        driver.push_outcome("select 1", Outcome::Pages(vec![data_row(1, 0, "1")]));

        let handle = Handle::current();
        let result = with_retry(DEFAULT_MAX_RETRIES, || {
            let handle = handle.clone();
            let stmt = stmt.clone();
            async { execute_future(&driver, &stmt, vec![], handle).await }
        })
        .await
        .unwrap();

        assert_eq!(result.rows.len(), 1);
        assert_eq!(driver.call_count("select 1"), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let driver = FakeDriver::new();
        let stmt = driver.prepare("select 1").await.unwrap();
        driver.push_outcome(
            "select 1",
            Outcome::Error(ArchiveError::DriverPermanent("bad schema".into())),
        );

        let handle = Handle::current();
        let err = with_retry(DEFAULT_MAX_RETRIES, || {
            let handle = handle.clone();
            let stmt = stmt.clone();
            async { execute_future(&driver, &stmt, vec![], handle).await }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ArchiveError::DriverPermanent(_)));
        assert_eq!(driver.call_count("select 1"), 1);
    }
}
