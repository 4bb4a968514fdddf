//! Cache hit/miss counters and per-operation latency histograms.

use std::time::Instant;

pub fn record_cache_hit(cache: &'static str) {
    metrics::counter!("archive.cache.hit", "cache" => cache).increment(1);
}

pub fn record_cache_miss(cache: &'static str) {
    metrics::counter!("archive.cache.miss", "cache" => cache).increment(1);
}

pub fn record_latency(operation: &'static str, started: Instant) {
    let ms = started.elapsed().as_secs_f64() * 1000.0;
    metrics::histogram!("archive.operation.duration_ms", "operation" => operation).record(ms);
}

pub fn record_fetch_error(kind: &'static str) {
    metrics::counter!("archive.fetch.error", "kind" => kind).increment(1);
}
