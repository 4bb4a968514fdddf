//! Prepared-statement registry, initialized once per session.
//!
//! Preparation errors for individual data types are logged and skipped, and
//! the registry degrades gracefully — an attribute of a missing data type
//! fails at query time with a clearly classified [`ArchiveError::Unprepared`].

use crate::attribute::DataType;
use crate::driver::{ArchiveDriver, PreparedId};
use crate::error::ArchiveError;
use std::collections::HashMap;
use tracing::warn;

const ATTRIBUTES_CQL: &str = "SELECT cs, domain, family, member, name FROM att_name";
const CONFIG_CQL: &str = "SELECT cs, att_name, att_conf_id, data_type FROM att_conf";
const PARAMETER_CQL: &str = "SELECT recv_time, recv_time_us, label FROM att_parameter \
    WHERE att_conf_id = ? AND recv_time < ? ORDER BY recv_time DESC LIMIT 1";
const LATEST_PARAMETER_CQL: &str = "SELECT recv_time, recv_time_us, label FROM att_parameter \
    WHERE att_conf_id = ? ORDER BY recv_time DESC LIMIT 1";
const HISTORY_CQL: &str = "SELECT event_time, event_time_us, event FROM att_history_event \
    WHERE att_conf_id = ? AND event_time >= ? AND event_time <= ? ORDER BY event_time ASC LIMIT 10";
const ALL_HISTORY_CQL: &str = "SELECT event_time, event_time_us, event FROM att_history_event \
    WHERE att_conf_id = ? ORDER BY event_time ASC";

pub struct StatementRegistry {
    pub attributes: Option<PreparedId>,
    pub config: Option<PreparedId>,
    pub parameter: Option<PreparedId>,
    pub latest_parameter: Option<PreparedId>,
    pub history: Option<PreparedId>,
    pub all_history: Option<PreparedId>,
    data: HashMap<DataType, PreparedId>,
    data_after: HashMap<DataType, PreparedId>,
}

async fn prepare_logged(driver: &dyn ArchiveDriver, label: &str, cql: &str) -> Option<PreparedId> {
    match driver.prepare(cql).await {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(statement = label, error = %e, "failed to prepare statement, skipping");
            None
        }
    }
}

impl StatementRegistry {
    pub async fn prepare_all(driver: &dyn ArchiveDriver) -> Self {
        let attributes = prepare_logged(driver, "attributes", ATTRIBUTES_CQL).await;
        let config = prepare_logged(driver, "config", CONFIG_CQL).await;
        let parameter = prepare_logged(driver, "parameter", PARAMETER_CQL).await;
        let latest_parameter = prepare_logged(driver, "latest_parameter", LATEST_PARAMETER_CQL).await;
        let history = prepare_logged(driver, "history", HISTORY_CQL).await;
        let all_history = prepare_logged(driver, "all_history", ALL_HISTORY_CQL).await;

        let mut data = HashMap::new();
        let mut data_after = HashMap::new();
        for dt in DataType::ALL {
            let table = dt.table_name();
            let data_cql = format!(
                "SELECT data_time, data_time_us, value_r, error_desc FROM {table} WHERE att_conf_id = ? AND period = ?"
            );
            if let Some(id) = prepare_logged(driver, &format!("data[{table}]"), &data_cql).await {
                data.insert(dt, id);
            }

            let data_after_cql = format!(
                "SELECT data_time, data_time_us, value_r, error_desc FROM {table} WHERE att_conf_id = ? AND period = ? AND data_time >= ?"
            );
            if let Some(id) =
                prepare_logged(driver, &format!("data_after[{table}]"), &data_after_cql).await
            {
                data_after.insert(dt, id);
            }
        }

        StatementRegistry {
            attributes,
            config,
            parameter,
            latest_parameter,
            history,
            all_history,
            data,
            data_after,
        }
    }

    pub fn data_stmt(&self, data_type: DataType) -> Result<&PreparedId, ArchiveError> {
        self.data
            .get(&data_type)
            .ok_or(ArchiveError::Unprepared { data_type })
    }

    pub fn data_after_stmt(&self, data_type: DataType) -> Result<&PreparedId, ArchiveError> {
        self.data_after
            .get(&data_type)
            .ok_or(ArchiveError::Unprepared { data_type })
    }
}
