//! The configuration surface consumed at process start. Config-file parsing
//! and process wiring stay out of scope; this is just the explicit struct a
//! caller constructs and passes in.

use chrono_tz::Tz;

#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    pub contact_points: Vec<String>,
    pub keyspace: String,
    /// Cache byte budget shared by the size-bounded LRU cache.
    pub cache_max_bytes: usize,
    /// Maximum number of concurrent per-day fetches for a single
    /// `get_attribute_data` call.
    pub fan_out_ceiling: usize,
    /// Retry ceiling for the driver-future bridge's retry adapter.
    pub max_retries: usize,
    /// The zone "today" is decided in, pinned here as an explicit, required
    /// knob rather than read from process-global state.
    pub local_zone: Tz,
}

impl ConnectorConfig {
    pub fn new(contact_points: Vec<String>, keyspace: impl Into<String>, local_zone: Tz) -> Self {
        ConnectorConfig {
            contact_points,
            keyspace: keyspace.into(),
            cache_max_bytes: 64 * 1024 * 1024,
            fan_out_ceiling: 50,
            max_retries: crate::driver::bridge::DEFAULT_MAX_RETRIES,
            local_zone,
        }
    }
}
