//! Series assembly: concatenation of per-day tables, trimming, optional
//! resampling, and the wire-format renderers consumed by the (excluded)
//! HTTP layer.

use crate::sample::Sample;
use serde::Serialize;
use std::collections::BTreeMap;

/// An ordered, non-decreasing-by-`(data_time, data_time_us)` collection of
/// samples for one attribute over some time window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Series {
    pub samples: Vec<Sample>,
}

impl Series {
    pub fn new(samples: Vec<Sample>) -> Self {
        Series { samples }
    }

    pub fn empty() -> Self {
        Series { samples: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// The maximum composed microsecond timestamp in the series, if any.
    pub fn max_composed_us(&self) -> Option<i64> {
        self.samples.iter().map(Sample::composed_us).max()
    }

    /// An approximate byte cost, used as the default cache cost function:
    /// a fixed per-sample overhead plus the length of any string payload.
    pub fn byte_cost(&self) -> usize {
        self.samples
            .iter()
            .map(|s| {
                16 + s.value_r.as_ref().map_or(0, String::len)
                    + s.error_desc.as_ref().map_or(0, String::len)
            })
            .sum()
    }

    /// Drop every sample with `data_time >= floor` (whole seconds), keeping
    /// the rest. Used by the live-day merge to truncate the cached side
    /// before splicing in the fresh fetch.
    pub fn truncate_before(&self, floor_sec: i64) -> Series {
        Series {
            samples: self
                .samples
                .iter()
                .filter(|s| s.data_time < floor_sec)
                .cloned()
                .collect(),
        }
    }
}

/// Stably append per-day tables, in the order given.
pub fn concat(parts: impl IntoIterator<Item = Series>) -> Series {
    let mut out = Vec::new();
    for part in parts {
        out.extend(part.samples);
    }
    Series { samples: out }
}

/// Keep samples with `t0 <= composed_time <= t1` (inclusive), `t0`/`t1`
/// given as composed microsecond epochs.
pub fn trim(series: &Series, t0: i64, t1: i64) -> Series {
    Series {
        samples: series
            .samples
            .iter()
            .filter(|s| {
                let t = s.composed_us();
                t >= t0 && t <= t1
            })
            .cloned()
            .collect(),
    }
}

/// Resampling frequency: a fixed-width window aligned to epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freq {
    Millis(i64),
    Seconds(i64),
    Minutes(i64),
}

impl Freq {
    fn width_us(&self) -> i64 {
        match self {
            Freq::Millis(n) => n * 1_000,
            Freq::Seconds(n) => n * 1_000_000,
            Freq::Minutes(n) => n * 60 * 1_000_000,
        }
    }
}

/// Round a composed microsecond timestamp down to its bucket boundary.
pub fn round_timestamp(composed_us: i64, freq: Freq) -> i64 {
    let width = freq.width_us();
    composed_us.div_euclid(width) * width
}

/// Bucket samples into fixed-width windows; each bucket's value is the mean
/// of its numeric samples, parsed from `value_r`. Non-numeric or missing
/// values are skipped for averaging purposes but do not block the bucket.
/// Empty buckets are omitted. Used only for rendering, never for cache
/// contents.
pub fn resample(series: &Series, freq: Freq) -> Series {
    let mut buckets: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for s in &series.samples {
        let Some(v) = s.value_r.as_ref().and_then(|v| v.parse::<f64>().ok()) else {
            continue;
        };
        let bucket = round_timestamp(s.composed_us(), freq);
        buckets.entry(bucket).or_default().push(v);
    }
    let samples = buckets
        .into_iter()
        .map(|(bucket_us, values)| {
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let (secs, us) = crate::time::split_micros(bucket_us);
            Sample {
                data_time: secs,
                data_time_us: us,
                value_r: Some(mean.to_string()),
                error_desc: None,
            }
        })
        .collect();
    Series { samples }
}

pub mod render {
    use super::Series;

    /// CSV block: the attribute name on its own line, then tab-separated
    /// `t_us, value_r` rows.
    pub fn render_csv(name: &str, series: &Series) -> String {
        let mut out = String::new();
        out.push_str(name);
        out.push('\n');
        for s in &series.samples {
            out.push_str(&s.composed_us().to_string());
            out.push('\t');
            out.push_str(s.value_r.as_deref().unwrap_or(""));
            out.push('\n');
        }
        out
    }

    /// Grafana-shaped JSON datasource payload: `{target, datapoints:
    /// [[value, t_ms], ...]}`. Timestamps are milliseconds as a float; the
    /// core's internal microsecond representation never leaks past here.
    pub fn render_json(name: &str, series: &Series) -> serde_json::Value {
        let datapoints: Vec<serde_json::Value> = series
            .samples
            .iter()
            .map(|s| {
                let t_ms = s.composed_us() as f64 / 1_000.0;
                let value = s
                    .value_r
                    .as_ref()
                    .and_then(|v| v.parse::<f64>().ok())
                    .and_then(serde_json::Number::from_f64)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null);
                serde_json::json!([value, t_ms])
            })
            .collect();
        serde_json::json!({ "target": name, "datapoints": datapoints })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(sec: i64, us: u32, v: &str) -> Sample {
        Sample {
            data_time: sec,
            data_time_us: us,
            value_r: Some(v.to_string()),
            error_desc: None,
        }
    }

    #[test]
    fn concat_preserves_order() {
        let a = Series::new(vec![sample(1, 0, "1")]);
        let b = Series::new(vec![sample(2, 0, "2")]);
        let out = concat([a, b]);
        assert_eq!(out.samples.len(), 2);
        assert_eq!(out.samples[0].data_time, 1);
        assert_eq!(out.samples[1].data_time, 2);
    }

    #[test]
    fn truncate_before_drops_floor_and_after() {
        let s = Series::new(vec![
            sample(10, 0, "a"),
            sample(20, 0, "b"),
            sample(30, 0, "c"),
        ]);
        let t = s.truncate_before(20);
        assert_eq!(t.samples.len(), 1);
        assert_eq!(t.samples[0].data_time, 10);
    }

    #[test]
    fn trim_keeps_inclusive_bounds() {
        let s = Series::new(vec![
            sample(10, 0, "a"),
            sample(20, 0, "b"),
            sample(30, 0, "c"),
            sample(40, 0, "d"),
        ]);
        let t0 = crate::time::compose_micros(chrono::Utc.timestamp_opt(20, 0).unwrap(), 0);
        let t1 = crate::time::compose_micros(chrono::Utc.timestamp_opt(30, 0).unwrap(), 0);
        let trimmed = trim(&s, t0, t1);
        let times: Vec<i64> = trimmed.samples.iter().map(|s| s.data_time).collect();
        assert_eq!(times, vec![20, 30], "both endpoints are included, 10 and 40 are not");
    }

    #[test]
    fn trim_of_disjoint_window_is_empty() {
        let s = Series::new(vec![sample(10, 0, "a"), sample(20, 0, "b")]);
        let t0 = crate::time::compose_micros(chrono::Utc.timestamp_opt(100, 0).unwrap(), 0);
        let t1 = crate::time::compose_micros(chrono::Utc.timestamp_opt(200, 0).unwrap(), 0);
        let trimmed = trim(&s, t0, t1);
        assert!(trimmed.samples.is_empty());
    }

    #[test]
    fn resample_buckets_by_epoch_aligned_window() {
        // Two samples 500ms apart land in the same 1s bucket; a third, a
        // full second later, starts a new one.
        let s = Series::new(vec![
            sample(100, 0, "2.0"),
            sample(100, 500_000, "4.0"),
            sample(101, 0, "10.0"),
        ]);
        let resampled = resample(&s, Freq::Seconds(1));
        assert_eq!(resampled.samples.len(), 2);
        assert_eq!(resampled.samples[0].data_time, 100);
        assert_eq!(resampled.samples[0].value_r.as_deref(), Some("3"));
        assert_eq!(resampled.samples[1].data_time, 101);
        assert_eq!(resampled.samples[1].value_r.as_deref(), Some("10"));
    }

    #[test]
    fn resample_bucket_boundaries_are_epoch_aligned_not_series_relative() {
        // A window starting mid-second (100.4s) still buckets at the 100s
        // epoch boundary, not at the first sample's own timestamp.
        let s = Series::new(vec![sample(100, 400_000, "1.0"), sample(100, 900_000, "3.0")]);
        let resampled = resample(&s, Freq::Seconds(1));
        assert_eq!(resampled.samples.len(), 1);
        assert_eq!(resampled.samples[0].data_time, 100);
        assert_eq!(resampled.samples[0].data_time_us, 0);
    }

    #[test]
    fn resample_omits_empty_buckets() {
        // A 10-minute gap between samples must not produce an entry for
        // every empty minute in between.
        let s = Series::new(vec![sample(0, 0, "1.0"), sample(600, 0, "2.0")]);
        let resampled = resample(&s, Freq::Minutes(1));
        assert_eq!(resampled.samples.len(), 2, "only the two populated buckets appear");
    }

    #[test]
    fn resample_skips_non_numeric_samples_without_dropping_the_bucket() {
        let s = Series::new(vec![
            sample(100, 0, "2.0"),
            Sample {
                data_time: 100,
                data_time_us: 100_000,
                value_r: Some("not-a-number".to_string()),
                error_desc: None,
            },
        ]);
        let resampled = resample(&s, Freq::Seconds(1));
        assert_eq!(resampled.samples.len(), 1);
        assert_eq!(resampled.samples[0].value_r.as_deref(), Some("2"));
    }

    #[test]
    fn csv_render_has_name_header() {
        let s = Series::new(vec![sample(1, 500_000, "3.14")]);
        let csv = render::render_csv("cs/a/b/c/d", &s);
        assert!(csv.starts_with("cs/a/b/c/d\n"));
        assert!(csv.contains("1500000\t3.14"));
    }

    #[test]
    fn json_render_is_grafana_shaped() {
        let s = Series::new(vec![sample(1, 0, "2.0")]);
        let v = render::render_json("a", &s);
        assert_eq!(v["target"], "a");
        assert_eq!(v["datapoints"][0][0], 2.0);
        assert_eq!(v["datapoints"][0][1], 1000.0);
    }
}
