//! # Bounded Concurrency Runner
//!
//! Drives per-item async work with at most `limit` items in flight.
//!
//! A permit is taken from the semaphore *before* each item's task is spawned
//! and is released when that task finishes, so item N+1 cannot start until one
//! of the first N has completed.
//!
//! ## Failure policy
//! A failing item never cancels the others. Every spawned task is awaited, each
//! failure (error or panic) is logged, and once the whole batch has settled the
//! first failure is returned. Successful results are not returned in that case;
//! callers record their side effects (stats, written files) from inside `work`.

use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error};

/// Semaphore-backed worker limit shared by all processors of a build
#[derive(Clone, Debug)]
pub struct BoundedRunner {
    limit: usize,
    semaphore: Arc<Semaphore>,
}

impl BoundedRunner {
    /// Create a runner allowing `limit` concurrent items (at least one)
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            semaphore: Arc::new(Semaphore::new(limit)),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Run `work` over every item, `limit` at a time.
    ///
    /// Returns the results in input order when every item succeeds, or the
    /// first failure once all items have settled.
    pub async fn run<T, R, F, Fut>(&self, items: impl IntoIterator<Item = T>, work: F) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        let mut tasks = Vec::new();

        for item in items {
            let permit = self.semaphore.clone().acquire_owned().await?;
            let future = work(item);

            tasks.push(tokio::spawn(async move {
                let _permit = permit; // released when the item settles
                future.await
            }));
        }

        debug!("Spawned {} items with a limit of {}", tasks.len(), self.limit);

        let mut results = Vec::with_capacity(tasks.len());
        let mut first_error: Option<anyhow::Error> = None;
        let mut failures = 0usize;

        for task in tasks {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(join_error) => Err(anyhow::anyhow!("Worker task failed: {}", join_error)),
            };

            match outcome {
                Ok(result) => results.push(result),
                Err(e) => {
                    failures += 1;
                    error!("{:#}", e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e.context(format!("{} of {} items failed", failures, failures + results.len()))),
            None => Ok(results),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_limit_is_at_least_one() {
        assert_eq!(BoundedRunner::new(0).limit(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_in_flight_never_exceeds_limit() {
        let runner = BoundedRunner::new(3);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let results = runner
            .run(0..20u64, |i| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5 + i % 3)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(i * 2)
                }
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 20);
        assert_eq!(results[7], 14);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_failure_does_not_drop_other_items() {
        let runner = BoundedRunner::new(2);
        let completed = Arc::new(AtomicUsize::new(0));

        let result = runner
            .run(0..10usize, |i| {
                let completed = completed.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    if i == 3 || i == 6 {
                        return Err(anyhow::anyhow!("item {} failed", i));
                    }
                    completed.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(completed.load(Ordering::SeqCst), 8);
        assert!(format!("{:#}", err).contains("item 3 failed"));
        assert!(err.to_string().contains("2 of 10 items failed"));
    }

    #[tokio::test]
    async fn test_panicking_item_is_reported() {
        let runner = BoundedRunner::new(2);
        let result = runner
            .run(0..3usize, |i| async move {
                if i == 1 {
                    panic!("boom");
                }
                Ok(i)
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let runner = BoundedRunner::new(4);
        let results: Vec<()> = runner.run(Vec::<u8>::new(), |_| async { Ok(()) }).await.unwrap();
        assert!(results.is_empty());
    }
}
