//! A read-side caching gateway in front of a time-series archive stored in
//! a wide-column database.
//!
//! Clients ask for the values of named attributes over arbitrary time
//! windows; [`connector::ArchiveConnector`] fetches the underlying rows,
//! caches them by day partition, merges cached and freshly fetched ranges
//! for the still-growing current day, and returns a coalesced
//! [`series::Series`].
//!
//! ```no_run
//! use chrono_tz::Tz;
//! use std::sync::Arc;
//! use tsarchive::config::ConnectorConfig;
//! use tsarchive::connector::ArchiveConnector;
//! use tsarchive::driver::scylla_driver::ScyllaDriver;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let driver = Arc::new(ScyllaDriver::connect(&["127.0.0.1".into()], "hdbpp").await?);
//! let config = ConnectorConfig::new(vec!["127.0.0.1".into()], "hdbpp", Tz::UTC);
//! let connector = ArchiveConnector::new(driver, config, tokio::runtime::Handle::current()).await;
//! let series = connector.get_attribute_data("ctrl/dom/fam/mem/attr", None, None).await?;
//! println!("{} samples", series.len());
//! # Ok(())
//! # }
//! ```

pub mod attribute;
pub mod cache;
pub mod config;
pub mod connector;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod sample;
pub mod series;
pub mod time;

pub use config::ConnectorConfig;
pub use connector::ArchiveConnector;
pub use error::ArchiveError;
pub use sample::Sample;
pub use series::Series;
