//! Day-bucketing and microsecond timestamp composition.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

/// One calendar-day partition key, `YYYY-MM-DD`.
pub type Period = String;

/// Compose a whole-second instant and a microsecond offset into a single
/// 64-bit microsecond Unix epoch, the chosen `combine_us` representation.
pub fn compose_micros(data_time: DateTime<Utc>, data_time_us: u32) -> i64 {
    data_time.timestamp() * 1_000_000 + data_time_us as i64
}

/// Split a composed microsecond epoch back into `(seconds, micros)`.
pub fn split_micros(us: i64) -> (i64, u32) {
    let secs = us.div_euclid(1_000_000);
    let micros = us.rem_euclid(1_000_000) as u32;
    (secs, micros)
}

/// `YYYY-MM-DD` for a UTC instant converted into `zone`.
pub fn period_of(t: DateTime<Utc>, zone: Tz) -> Period {
    t.with_timezone(&zone).date_naive().format("%Y-%m-%d").to_string()
}

/// Today's date in `zone`, as a `Period` string. Single source of truth for
/// "is this period live" decisions; always driven by an explicit zone, never
/// process-global state.
pub fn local_today(zone: Tz) -> Period {
    period_of(Utc::now(), zone)
}

/// Inclusive sequence of `YYYY-MM-DD` strings in `zone` covering `[t0, t1]`.
/// Returns exactly `floor_day(t1) - floor_day(t0) + 1` entries.
pub fn days(t0: DateTime<Utc>, t1: DateTime<Utc>, zone: Tz) -> Vec<Period> {
    let d0 = t0.with_timezone(&zone).date_naive();
    let d1 = t1.with_timezone(&zone).date_naive();
    let mut out = Vec::new();
    let mut d = d0;
    while d <= d1 {
        out.push(d.format("%Y-%m-%d").to_string());
        d += Duration::days(1);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn days_single_day() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 3, 15, 23, 59, 59).unwrap();
        let ps = days(t0, t1, Tz::UTC);
        assert_eq!(ps, vec!["2024-03-15".to_string()]);
    }

    #[test]
    fn days_cross_day() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 15, 23, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 3, 17, 1, 0, 0).unwrap();
        let ps = days(t0, t1, Tz::UTC);
        assert_eq!(
            ps,
            vec![
                "2024-03-15".to_string(),
                "2024-03-16".to_string(),
                "2024-03-17".to_string(),
            ]
        );
    }

    #[test]
    fn compose_and_split_roundtrip() {
        let t = Utc.timestamp_opt(1_710_500_000, 0).unwrap();
        let us = compose_micros(t, 742_100);
        let (secs, micros) = split_micros(us);
        assert_eq!(secs, 1_710_500_000);
        assert_eq!(micros, 742_100);
    }
}
