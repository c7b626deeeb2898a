//! TTL cache with negative entries, plus in-flight request coalescing (§4.B, §4.C).
//!
//! The coalescing waiter fan-out generalizes `casparian_mcp::core::event::Event`'s
//! broadcast-to-subscribers pattern: instead of multiple distinct job events going out
//! to N listeners, it's one computed value going out to N callers who all asked for the
//! same key while the first caller's future was still running.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
enum Slot<T> {
    Positive(T),
    Negative,
}

struct CacheEntry<T> {
    slot: Slot<T>,
    expires_at: DateTime<Utc>,
}

/// A TTL-keyed value cache. `T` is cloned out on every hit, so callers should wrap
/// expensive payloads in an `Arc` themselves.
pub struct Cache<T: Clone> {
    entries: DashMap<String, CacheEntry<T>>,
}

impl<T: Clone> Default for Cache<T> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<T: Clone> Cache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` on miss or expiry. `Some(None)` would mean a negative entry, so the return
    /// type flattens that into `Some(None)` via the outer `Option<Option<T>>` shape:
    /// `Ok` hits return `Some(Some(value))`, negative hits return `Some(None)`, misses
    /// return `None`.
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<Option<T>> {
        let entry = self.entries.get(key)?;
        if entry.expires_at <= now {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(match &entry.slot {
            Slot::Positive(v) => Some(v.clone()),
            Slot::Negative => None,
        })
    }

    pub fn put_ok(&self, key: impl Into<String>, value: T, ttl: Duration, now: DateTime<Utc>) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                slot: Slot::Positive(value),
                expires_at: now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero()),
            },
        );
    }

    /// Cache the absence of a result (§4.C: "not found" responses are cached too, with a
    /// shorter TTL, so a flood of misses for a nonexistent ISBN doesn't keep hitting
    /// every provider).
    pub fn put_negative(&self, key: impl Into<String>, ttl: Duration, now: DateTime<Utc>) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                slot: Slot::Negative,
                expires_at: now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero()),
            },
        );
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }
}

/// Fans a single in-flight computation out to every concurrent caller asking for the
/// same key, so N simultaneous requests for the same fingerprint cost one upstream call.
pub struct Coalescer<T, E> {
    in_flight: DashMap<String, broadcast::Sender<Arc<Result<T, E>>>>,
}

impl<T, E> Default for Coalescer<T, E> {
    fn default() -> Self {
        Self {
            in_flight: DashMap::new(),
        }
    }
}

impl<T, E> Coalescer<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `produce` for `key` unless another caller is already producing it, in which
    /// case await that caller's result instead. Exactly one `produce` call executes per
    /// overlapping burst.
    pub async fn get_or_produce<F, Fut>(&self, key: &str, produce: F) -> Arc<Result<T, E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let mut rx = match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(e) => e.get().subscribe(),
            Entry::Vacant(v) => {
                let (tx, _rx) = broadcast::channel(1);
                v.insert(tx);
                return self.produce_and_broadcast(key, produce).await;
            }
        };
        match rx.recv().await {
            Ok(result) => result,
            // Producer's sender dropped without sending (panicked) — recover by
            // becoming the producer ourselves.
            Err(_) => self.produce_and_broadcast(key, produce).await,
        }
    }

    async fn produce_and_broadcast<F, Fut>(&self, key: &str, produce: F) -> Arc<Result<T, E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let result = Arc::new(produce().await);
        if let Some((_, tx)) = self.in_flight.remove(key) {
            let _ = tx.send(result.clone());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn positive_entries_expire() {
        let cache: Cache<u32> = Cache::new();
        let now = Utc::now();
        cache.put_ok("k", 7, Duration::from_secs(10), now);
        assert_eq!(cache.get("k", now), Some(Some(7)));
        let later = now + chrono::Duration::seconds(11);
        assert_eq!(cache.get("k", later), None);
    }

    #[test]
    fn negative_entries_distinguish_miss_from_absence() {
        let cache: Cache<u32> = Cache::new();
        let now = Utc::now();
        assert_eq!(cache.get("k", now), None);
        cache.put_negative("k", Duration::from_secs(10), now);
        assert_eq!(cache.get("k", now), Some(None));
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_production() {
        let coalescer: Arc<Coalescer<u32, String>> = Arc::new(Coalescer::new());
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let coalescer = coalescer.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                (*coalescer
                    .get_or_produce("isbn:123", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<u32, String>(42)
                    })
                    .await)
                    .clone()
            }));
        }

        for h in handles {
            assert_eq!(h.await.unwrap(), Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
