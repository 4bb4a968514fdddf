use crate::attribute::DataType;
use thiserror::Error;

/// Error surface for the archive connector and everything it owns.
///
/// `CacheTooLarge` deliberately has no variant here: an oversize value is not
/// an error to the caller, it is a silent no-op in [`crate::cache::lru::Cache::set`].
#[derive(Debug, Error, Clone)]
pub enum ArchiveError {
    #[error("attribute {attribute:?} does not resolve to a configured (id, data_type)")]
    NotFound { attribute: String },

    #[error("prepared statement for data type {data_type:?} failed to initialize")]
    Unprepared { data_type: DataType },

    #[error("transient driver error: {0}")]
    DriverTransient(String),

    #[error("permanent driver error: {0}")]
    DriverPermanent(String),
}

impl ArchiveError {
    /// Whether the retry adapter in [`crate::driver::bridge`] is allowed to
    /// retry a call that failed with this error.
    pub fn is_retriable(&self) -> bool {
        matches!(self, ArchiveError::DriverTransient(_))
    }
}
