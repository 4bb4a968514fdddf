//! The archive connector: the orchestrator that resolves attribute →
//! (config-id, data-type), decomposes a time range into days, dispatches
//! per-day fetches with bounded concurrency, consults and populates the
//! cache, and applies the live-day merge.

use crate::attribute::{split_attr, AttributeConfig, DataType};
use crate::cache::{Cache, TtlMemo};
use crate::config::ConnectorConfig;
use crate::driver::bridge::{execute_future, with_retry};
use crate::driver::{ArchiveDriver, CqlValue, Params, Table};
use crate::error::ArchiveError;
use crate::metrics;
use crate::registry::StatementRegistry;
use crate::sample::Sample;
use crate::series::{self, Series};
use crate::time::{days, local_today, split_micros, Period};
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};
use uuid::Uuid;

type ConfigMap = HashMap<String, HashMap<String, AttributeConfig>>;
type AttributeList = HashMap<String, Vec<(String, String, String, String)>>;

/// One row of `get_history`'s wire shape.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct HistoryEvent {
    pub timestamp: f64,
    pub event: String,
}

/// The newest parameter row strictly before a given end time.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Parameter {
    pub timestamp: f64,
    pub label: String,
}

fn cql_text(v: &CqlValue) -> Option<String> {
    match v {
        CqlValue::Text(s) => Some(s.clone()),
        _ => None,
    }
}

fn cql_bigint(v: &CqlValue) -> Option<i64> {
    match v {
        CqlValue::BigInt(i) => Some(*i),
        CqlValue::Int(i) => Some(*i as i64),
        _ => None,
    }
}

fn cql_int(v: &CqlValue) -> Option<i32> {
    match v {
        CqlValue::Int(i) => Some(*i),
        CqlValue::BigInt(i) => Some(*i as i32),
        _ => None,
    }
}

fn cql_uuid(v: &CqlValue) -> Option<Uuid> {
    match v {
        CqlValue::Uuid(u) => Some(*u),
        _ => None,
    }
}

fn row_to_sample(row: &[CqlValue]) -> Option<Sample> {
    Some(Sample {
        data_time: cql_bigint(row.first()?)?,
        data_time_us: cql_int(row.get(1)?)? as u32,
        value_r: row.get(2).and_then(cql_text),
        error_desc: row.get(3).and_then(cql_text),
    })
}

fn table_to_series(table: Table) -> Series {
    Series::new(table.rows.iter().filter_map(|r| row_to_sample(r)).collect())
}

/// The cache key: `(control_system, attribute_name, period)`.
type CacheKey = (String, String, Period);

struct Inner {
    driver: Arc<dyn ArchiveDriver>,
    registry: StatementRegistry,
    cache: Cache<CacheKey, Series>,
    configs_memo: TtlMemo<ConfigMap>,
    attributes_memo: TtlMemo<AttributeList>,
    config: ConnectorConfig,
    loop_handle: Handle,
}

/// The read-side orchestrator. Depends only on `ArchiveDriver`; owns its own
/// cache and statement registry. Constructed with explicit dependencies,
/// never process-global state.
///
/// Cheaply `Clone` (an `Arc` around a shared [`Inner`]), so a fetch-then-
/// cache-write can be detached onto the task loop with [`Handle::spawn`] and
/// keep running to completion even if the caller that triggered it is
/// dropped or times out.
#[derive(Clone)]
pub struct ArchiveConnector {
    inner: Arc<Inner>,
}

impl std::ops::Deref for ArchiveConnector {
    type Target = Inner;

    fn deref(&self) -> &Inner {
        &self.inner
    }
}

impl ArchiveConnector {
    /// Prepare the registry against `driver` and construct the connector.
    pub async fn new(driver: Arc<dyn ArchiveDriver>, config: ConnectorConfig, loop_handle: Handle) -> Self {
        let registry = StatementRegistry::prepare_all(driver.as_ref()).await;
        ArchiveConnector {
            inner: Arc::new(Inner {
                driver,
                registry,
                cache: Cache::new(config.cache_max_bytes),
                configs_memo: TtlMemo::new(StdDuration::from_secs(60)),
                attributes_memo: TtlMemo::new(StdDuration::from_secs(60)),
                config,
                loop_handle,
            }),
        }
    }

    async fn execute(&self, stmt: &crate::driver::PreparedId, params: Params) -> Result<Table, ArchiveError> {
        let driver = self.driver.as_ref();
        let handle = self.loop_handle.clone();
        let result = with_retry(self.config.max_retries, || {
            let handle = handle.clone();
            let params = params.clone();
            async { execute_future(driver, stmt, params, handle).await }
        })
        .await;

        if let Err(e) = &result {
            let kind = if e.is_retriable() { "transient" } else { "permanent" };
            metrics::record_fetch_error(kind);
            warn!(statement = %stmt, error = %e, kind, "driver execution failed");
        }
        result
    }

    /// `get_attributes()` → `{cs: [(domain, family, member, name)]}`.
    /// TTL-memoized (60s); expected modest cardinality.
    #[tracing::instrument(skip(self))]
    pub async fn get_attributes(&self) -> Result<AttributeList, ArchiveError> {
        self.attributes_memo
            .get_or_try_compute(|| async {
                let stmt = self
                    .registry
                    .attributes
                    .as_ref()
                    .ok_or(ArchiveError::DriverPermanent("attributes statement unprepared".into()))?;
                let table = self.execute(stmt, vec![]).await?;
                let mut out: AttributeList = HashMap::new();
                for row in table.rows {
                    let (Some(cs), Some(domain), Some(family), Some(member), Some(name)) = (
                        row.first().and_then(cql_text),
                        row.get(1).and_then(cql_text),
                        row.get(2).and_then(cql_text),
                        row.get(3).and_then(cql_text),
                        row.get(4).and_then(cql_text),
                    ) else {
                        continue;
                    };
                    out.entry(cs).or_default().push((domain, family, member, name));
                }
                Ok(out)
            })
            .await
    }

    /// `get_att_configs()` → `{cs: {att_name: {id, data_type}}}`.
    #[tracing::instrument(skip(self))]
    pub async fn get_att_configs(&self) -> Result<ConfigMap, ArchiveError> {
        self.configs_memo
            .get_or_try_compute(|| async {
                let stmt = self
                    .registry
                    .config
                    .as_ref()
                    .ok_or(ArchiveError::DriverPermanent("config statement unprepared".into()))?;
                let table = self.execute(stmt, vec![]).await?;
                let mut out: ConfigMap = HashMap::new();
                for row in table.rows {
                    let (Some(cs), Some(att_name), Some(id), Some(data_type_name)) = (
                        row.first().and_then(cql_text),
                        row.get(1).and_then(cql_text),
                        row.get(2).and_then(cql_uuid),
                        row.get(3).and_then(cql_text),
                    ) else {
                        continue;
                    };
                    let Some(data_type) = DataType::from_table_name(&data_type_name) else {
                        continue;
                    };
                    out.entry(cs)
                        .or_default()
                        .insert(att_name, AttributeConfig { id, data_type });
                }
                Ok(out)
            })
            .await
    }

    async fn resolve(&self, cs: &str, name: &str) -> Result<AttributeConfig, ArchiveError> {
        let configs = self.get_att_configs().await?;
        configs
            .get(cs)
            .and_then(|m| m.get(name))
            .copied()
            .ok_or_else(|| ArchiveError::NotFound {
                attribute: format!("{cs}/{name}"),
            })
    }

    /// The pure DB call: look up the attribute's config, bind the right
    /// prepared statement (`data` or `data_after`), submit through the
    /// driver-future bridge, return the assembled series.
    async fn fetch(
        &self,
        cs: &str,
        name: &str,
        period: &str,
        after: Option<i64>,
    ) -> Result<Series, ArchiveError> {
        let cfg = self.resolve(cs, name).await?;
        let (stmt, params) = match after {
            Some(floor) => (
                self.registry.data_after_stmt(cfg.data_type)?,
                vec![CqlValue::Uuid(cfg.id), CqlValue::Text(period.to_string()), CqlValue::BigInt(floor)],
            ),
            None => (
                self.registry.data_stmt(cfg.data_type)?,
                vec![CqlValue::Uuid(cfg.id), CqlValue::Text(period.to_string())],
            ),
        };
        let table = self.execute(stmt, params).await?;
        Ok(table_to_series(table))
    }

    /// Run `fut` on the task loop rather than inline. A fetch-then-cache-
    /// write dispatched this way keeps running (and, for historical periods,
    /// still ends up in the cache) even if whatever awaits this call is
    /// dropped or the outer request is cancelled — only the `.await` here
    /// is abandoned, not the spawned task itself.
    async fn spawn_detached<Fut>(&self, fut: Fut) -> Result<Series, ArchiveError>
    where
        Fut: std::future::Future<Output = Result<Series, ArchiveError>> + Send + 'static,
    {
        self.loop_handle
            .spawn(fut)
            .await
            .unwrap_or_else(|e| Err(ArchiveError::DriverPermanent(format!("fetch task did not complete: {e}"))))
    }

    /// `get_period(cs, attr, period)`: today delegates to the live-day
    /// merge; historical periods are cache-or-fetch, never caching errors
    /// or future-dated periods. The fetch-and-cache-write for a miss is
    /// detached onto the task loop so cancellation of the caller can't
    /// silently drop an in-flight cache write.
    #[tracing::instrument(skip(self))]
    async fn get_period(&self, cs: &str, name: &str, period: &str) -> Result<Series, ArchiveError> {
        let today = local_today(self.config.local_zone);
        if period == today {
            return self.get_today(cs, name, &today).await;
        }

        let key: CacheKey = (cs.to_string(), name.to_string(), period.to_string());
        if let Some(cached) = self.cache.get(&key) {
            metrics::record_cache_hit("series");
            debug!(cs, name, period, "historical period cache hit");
            return Ok(cached);
        }
        metrics::record_cache_miss("series");
        let cacheable = period < today.as_str();
        debug!(cs, name, period, cacheable, "historical period cache miss, dispatching detached fetch");

        let connector = self.clone();
        let cs = cs.to_string();
        let name = name.to_string();
        let period = period.to_string();
        self.spawn_detached(async move {
            let result = connector.fetch(&cs, &name, &period, None).await;
            if let Ok(series) = &result {
                if cacheable {
                    connector.cache.set(key, series.clone(), Series::byte_cost);
                }
            }
            result
        })
        .await
    }

    /// The live-day merge: truncate the cached "today" series at the floor
    /// of its latest cached second, fetch only what's newer, concatenate,
    /// replace the cache entry. Detached onto the task loop for the same
    /// cancellation-safety reason as [`Self::get_period`].
    #[tracing::instrument(skip(self))]
    async fn get_today(&self, cs: &str, name: &str, today: &str) -> Result<Series, ArchiveError> {
        let key: CacheKey = (cs.to_string(), name.to_string(), today.to_string());
        let cached = self.cache.get(&key);
        let needs_cold_fetch = cached.as_ref().map(Series::is_empty).unwrap_or(true);

        if needs_cold_fetch {
            metrics::record_cache_miss("series");
            debug!(cs, name, today, "today cache empty, dispatching detached cold fetch");
            let connector = self.clone();
            let cs = cs.to_string();
            let name = name.to_string();
            let today = today.to_string();
            return self
                .spawn_detached(async move {
                    let result = connector.fetch(&cs, &name, &today, None).await;
                    if let Ok(series) = &result {
                        connector.cache.set(key, series.clone(), Series::byte_cost);
                    }
                    result
                })
                .await;
        }

        let cached = cached.expect("needs_cold_fetch is false only when cached is Some and non-empty");
        metrics::record_cache_hit("series");
        let latest_us = cached.max_composed_us().expect("checked non-empty above");
        let (latest_sec, _) = split_micros(latest_us);
        info!(cs, name, today, latest_sec, "live-day merge: truncating cached series and fetching rows past floor");

        let connector = self.clone();
        let cs = cs.to_string();
        let name = name.to_string();
        let today = today.to_string();
        self.spawn_detached(async move {
            let fresh = connector.fetch(&cs, &name, &today, Some(latest_sec)).await?;
            let truncated = cached.truncate_before(latest_sec);
            let combined = series::concat([truncated, fresh]);
            connector.cache.set(key, combined.clone(), Series::byte_cost);
            Ok(combined)
        })
        .await
    }

    /// `get_attribute_data(attr, t0, t1) -> Series`: the public entry point.
    /// Defaults to the trailing 24 hours, decomposes the range into day
    /// periods, fans fetches out in bounded-size chunks, and concatenates
    /// the results back into calendar order.
    #[tracing::instrument(skip(self))]
    pub async fn get_attribute_data(
        &self,
        attr: &str,
        t0: Option<DateTime<Utc>>,
        t1: Option<DateTime<Utc>>,
    ) -> Result<Series, ArchiveError> {
        let started = Instant::now();
        let t1 = t1.unwrap_or_else(Utc::now);
        let t0 = t0.unwrap_or_else(|| t1 - Duration::hours(24));

        let parsed = split_attr(attr)?;
        let cs = parsed.control_system.clone();
        let name = parsed.name();
        let periods = days(t0, t1, self.config.local_zone);

        let mut chunks = stream::iter(periods).chunks(self.config.fan_out_ceiling);
        let mut ordered = Vec::new();
        while let Some(chunk) = chunks.next().await {
            let results = futures::future::try_join_all(
                chunk.iter().map(|period| self.get_period(&cs, &name, period)),
            )
            .await?;
            ordered.extend(results);
        }

        metrics::record_latency("get_attribute_data", started);
        Ok(series::concat(ordered))
    }

    /// `get_history(attr, [t_from, t_to])`: up to 10 events within a given
    /// window, or the full unbounded history if no window is given.
    #[tracing::instrument(skip(self))]
    pub async fn get_history(
        &self,
        attr: &str,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<HistoryEvent>, ArchiveError> {
        let parsed = split_attr(attr)?;
        let cfg = self.resolve(&parsed.control_system, &parsed.name()).await?;

        let (stmt, params) = match window {
            Some((from, to)) => {
                let stmt = self
                    .registry
                    .history
                    .as_ref()
                    .ok_or(ArchiveError::DriverPermanent("history statement unprepared".into()))?;
                (stmt, vec![CqlValue::Uuid(cfg.id), CqlValue::BigInt(from.timestamp()), CqlValue::BigInt(to.timestamp())])
            }
            None => {
                let stmt = self
                    .registry
                    .all_history
                    .as_ref()
                    .ok_or(ArchiveError::DriverPermanent("all_history statement unprepared".into()))?;
                (stmt, vec![CqlValue::Uuid(cfg.id)])
            }
        };

        let table = self.execute(stmt, params).await?;
        let events = table
            .rows
            .iter()
            .filter_map(|row| {
                let sec = cql_bigint(row.first()?)?;
                let us = cql_int(row.get(1)?)?;
                let event = row.get(2).and_then(cql_text)?;
                Some(HistoryEvent {
                    timestamp: sec as f64 + us as f64 / 1_000_000.0,
                    event,
                })
            })
            .collect();
        Ok(events)
    }

    /// `get_parameters(attr, end_time)`: newest parameter row strictly
    /// before `end_time`, or `None`.
    #[tracing::instrument(skip(self))]
    pub async fn get_parameters(
        &self,
        attr: &str,
        end_time: DateTime<Utc>,
    ) -> Result<Option<Parameter>, ArchiveError> {
        let parsed = split_attr(attr)?;
        let cfg = self.resolve(&parsed.control_system, &parsed.name()).await?;
        let stmt = self
            .registry
            .parameter
            .as_ref()
            .ok_or(ArchiveError::DriverPermanent("parameter statement unprepared".into()))?;
        let table = self
            .execute(stmt, vec![CqlValue::Uuid(cfg.id), CqlValue::BigInt(end_time.timestamp())])
            .await?;
        Ok(table.rows.first().and_then(|row| {
            let sec = cql_bigint(row.first()?)?;
            let us = cql_int(row.get(1)?)?;
            let label = row.get(2).and_then(cql_text)?;
            Some(Parameter {
                timestamp: sec as f64 + us as f64 / 1_000_000.0,
                label,
            })
        }))
    }
}
