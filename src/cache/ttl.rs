//! TTL memoization for short-lived metadata (name/config listings).
//!
//! Recomputes at most once per TTL window ("cache the last value for up to
//! T seconds, recompute on miss"), expressed as a small generic combinator
//! rather than a decorator.

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// A single-slot memoized producer with an expiry. Holds the lock across
/// recomputation so concurrent callers racing past TTL expiry still invoke
/// the producer at most once.
pub struct TtlMemo<T: Clone> {
    ttl: Duration,
    slot: Mutex<Option<(T, Instant)>>,
}

impl<T: Clone> TtlMemo<T> {
    pub fn new(ttl: Duration) -> Self {
        TtlMemo {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Return the memoized value if still fresh; otherwise call `producer`,
    /// and on success, memoize its result with a fresh expiry. A failed
    /// `producer` call does not update the slot, so the caller's error
    /// surfaces once and the next call retries immediately (no need to wait
    /// out the TTL).
    pub async fn get_or_try_compute<E, F, Fut>(&self, producer: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut guard = self.slot.lock().await;
        if let Some((value, fetched_at)) = guard.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(value.clone());
            }
        }
        let value = producer().await?;
        *guard = Some((value.clone(), Instant::now()));
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn memoizes_within_ttl_recomputes_after_expiry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let memo: TtlMemo<i32> = TtlMemo::new(Duration::from_millis(20));

        let c = calls.clone();
        let v1 = memo
            .get_or_try_compute(|| async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ()>(42)
            })
            .await
            .unwrap();
        assert_eq!(v1, 42);

        let c = calls.clone();
        let v2 = memo
            .get_or_try_compute(|| async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ()>(99)
            })
            .await
            .unwrap();
        assert_eq!(v2, 42, "still within TTL, returns memoized value");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(30)).await;

        let c = calls.clone();
        let v3 = memo
            .get_or_try_compute(|| async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ()>(99)
            })
            .await
            .unwrap();
        assert_eq!(v3, 99, "TTL expired, recomputes");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_producer_does_not_memoize() {
        let memo: TtlMemo<i32> = TtlMemo::new(Duration::from_secs(60));
        let r: Result<i32, &str> = memo.get_or_try_compute(|| async { Err("boom") }).await;
        assert!(r.is_err());

        let r2 = memo.get_or_try_compute(|| async { Ok::<_, &str>(7) }).await;
        assert_eq!(r2, Ok(7));
    }
}
