//! The sample type: one row of a day-partitioned data table.

use serde::{Deserialize, Serialize};

/// A single timestamped value, at microsecond resolution.
///
/// Storage precision of `data_time` alone is one second; `data_time_us` is
/// the separate microsecond offset within that second. `value_r` is carried
/// as text: the core is type-agnostic across the 26 per-type data tables and
/// never interprets the value, only orders and concatenates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub data_time: i64,
    pub data_time_us: u32,
    pub value_r: Option<String>,
    pub error_desc: Option<String>,
}

impl Sample {
    /// The composed microsecond epoch for this sample, used for ordering,
    /// merge boundaries, and dedup keys.
    pub fn composed_us(&self) -> i64 {
        self.data_time * 1_000_000 + self.data_time_us as i64
    }
}
