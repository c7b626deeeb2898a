//! Parallel metadata-provider fan-out (§4.C).
//!
//! A `ProviderFanout` queries every registered `Provider` concurrently under a
//! per-provider timeout; the first provider to return a non-empty normalized result
//! wins and the rest are dropped (their futures simply never get polled again once
//! `select_ok`-style racing resolves). The whole fan-out is wrapped by
//! `shelfscribe_cache::Coalescer` keyed on a BLAKE3 fingerprint of the query so that a
//! burst of identical lookups costs one round of provider calls.

mod normalize;

pub use normalize::{Author, Edition, NormalizedWork, Work};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shelfscribe_cache::{Cache, Coalescer};
use shelfscribe_security::fingerprint::fingerprint_query;

/// One external metadata source (Open Library, Google Books, ...). Implementations do
/// their own HTTP and return already-normalized results.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;
    async fn lookup(&self, title: &str, author: Option<&str>) -> Result<NormalizedWork, ProviderError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("provider timed out")]
    Timeout,
    #[error("provider request failed: {0}")]
    Request(String),
}

/// Outcome of a full fan-out across all registered providers.
#[derive(Debug, Clone)]
pub enum FanoutOutcome {
    Found { work: NormalizedWork, provider: String },
    NoResults,
    Error { cause: String },
}

pub struct ProviderFanout {
    providers: Vec<Arc<dyn Provider>>,
    per_provider_timeout: Duration,
    cache: Cache<Arc<FanoutOutcome>>,
    coalescer: Coalescer<Arc<FanoutOutcome>, String>,
    negative_ttl: Duration,
    positive_ttl: Duration,
}

impl ProviderFanout {
    pub fn new(providers: Vec<Arc<dyn Provider>>, per_provider_timeout: Duration) -> Self {
        Self {
            providers,
            per_provider_timeout,
            cache: Cache::new(),
            coalescer: Coalescer::new(),
            negative_ttl: Duration::from_secs(5 * 60),
            positive_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }

    /// Query every provider for `(title, author)`, coalescing concurrent identical
    /// queries and caching both positive and negative results.
    pub async fn query(&self, title: &str, author: Option<&str>) -> Arc<FanoutOutcome> {
        let key = fingerprint_query(title, author);
        let now = chrono::Utc::now();

        if let Some(cached) = self.cache.get(&key, now) {
            if let Some(outcome) = cached {
                return outcome;
            }
        }

        let title = title.to_string();
        let author = author.map(|a| a.to_string());
        let result = self
            .coalescer
            .get_or_produce(&key, || async move { Ok::<_, String>(Arc::new(self.race(&title, author.as_deref()).await)) })
            .await;

        let outcome = match result.as_ref() {
            Ok(outcome) => outcome.clone(),
            Err(_) => Arc::new(FanoutOutcome::Error {
                cause: "coalesced producer failed".into(),
            }),
        };

        match outcome.as_ref() {
            FanoutOutcome::Found { .. } => self.cache.put_ok(key, outcome.clone(), self.positive_ttl, now),
            FanoutOutcome::NoResults => self.cache.put_negative(key, self.negative_ttl, now),
            // §4.C: only non-client-status provider errors are worth negative-caching;
            // we don't have HTTP status here so conservatively never cache errors.
            FanoutOutcome::Error { .. } => {}
        }

        outcome
    }

    async fn race(&self, title: &str, author: Option<&str>) -> FanoutOutcome {
        if self.providers.is_empty() {
            return FanoutOutcome::NoResults;
        }

        type LookupResult = Result<(String, NormalizedWork), Option<String>>;
        type LookupFuture = std::pin::Pin<Box<dyn std::future::Future<Output = LookupResult> + Send>>;

        let mut futures: Vec<LookupFuture> = self
            .providers
            .iter()
            .cloned()
            .map(|provider| {
                let title = title.to_string();
                let author = author.map(|a| a.to_string());
                let timeout = self.per_provider_timeout;
                Box::pin(async move {
                    let name = provider.name().to_string();
                    match tokio::time::timeout(timeout, provider.lookup(&title, author.as_deref())).await {
                        Ok(Ok(work)) if !work.editions.is_empty() => Ok((name, work)),
                        Ok(Ok(_)) => Err(None),
                        Ok(Err(e)) => Err(Some(e.to_string())),
                        Err(_) => Err(Some("timeout".to_string())),
                    }
                }) as LookupFuture
            })
            .collect();

        let mut errors = Vec::new();
        while !futures.is_empty() {
            let (result, _index, remaining) = futures::future::select_all(futures).await;
            futures = remaining;
            match result {
                Ok((provider, work)) => {
                    return FanoutOutcome::Found { work, provider };
                }
                Err(Some(cause)) => errors.push(cause),
                Err(None) => {}
            }
        }

        if errors.len() == self.providers.len() {
            FanoutOutcome::Error { cause: errors.join("; ") }
        } else {
            FanoutOutcome::NoResults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubProvider {
        name: &'static str,
        result: Result<NormalizedWork, ProviderError>,
        delay: Duration,
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn lookup(&self, _title: &str, _author: Option<&str>) -> Result<NormalizedWork, ProviderError> {
            tokio::time::sleep(self.delay).await;
            self.result.clone()
        }
    }

    fn sample_work() -> NormalizedWork {
        NormalizedWork {
            work: Work {
                title: "The Hobbit".into(),
                description: None,
            },
            editions: vec![Edition {
                isbn: Some("9780547928227".into()),
                publisher: None,
                published_year: None,
            }],
            authors: vec![Author { name: "J.R.R. Tolkien".into() }],
        }
    }

    #[tokio::test]
    async fn first_non_empty_result_wins() {
        let fast = Arc::new(StubProvider {
            name: "fast",
            result: Ok(sample_work()),
            delay: Duration::from_millis(5),
        });
        let slow = Arc::new(StubProvider {
            name: "slow",
            result: Ok(sample_work()),
            delay: Duration::from_millis(200),
        });
        let fanout = ProviderFanout::new(vec![fast, slow], Duration::from_secs(1));
        let outcome = fanout.query("The Hobbit", Some("Tolkien")).await;
        match outcome.as_ref() {
            FanoutOutcome::Found { provider, .. } => assert_eq!(provider, "fast"),
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn all_empty_yields_no_results() {
        let a = Arc::new(StubProvider {
            name: "a",
            result: Ok(NormalizedWork {
                work: Work { title: "X".into(), description: None },
                editions: vec![],
                authors: vec![],
            }),
            delay: Duration::from_millis(1),
        });
        let fanout = ProviderFanout::new(vec![a], Duration::from_secs(1));
        let outcome = fanout.query("X", None).await;
        assert!(matches!(outcome.as_ref(), FanoutOutcome::NoResults));
    }

    #[tokio::test]
    async fn all_errors_yields_merged_error() {
        let a = Arc::new(StubProvider {
            name: "a",
            result: Err(ProviderError::Request("boom".into())),
            delay: Duration::from_millis(1),
        });
        let fanout = ProviderFanout::new(vec![a], Duration::from_secs(1));
        let outcome = fanout.query("X", None).await;
        assert!(matches!(outcome.as_ref(), FanoutOutcome::Error { .. }));
    }
}
