//! Deferred construction of fallible subsystems.
//!
//! A [`Deferred`] wraps a factory whose failure must not crash or block
//! process startup (agents whose upstream dependencies may be down, a
//! database on a volume that mounts late). Construction runs on first
//! `get()`, serialized per handle so a stampede of first calls runs the
//! factory exactly once. Success is cached for the process lifetime; what
//! happens after a failure is governed by [`RetryPolicy`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{error, info};

use crate::config::RetryPolicy;

#[derive(Debug, Error, Clone)]
#[error("{name} is unavailable: {detail}")]
pub struct Unavailable {
    pub name: &'static str,
    pub detail: String,
}

enum Handle<T> {
    Uninitialized,
    Ready(Arc<T>),
    Failed { detail: String, at: Instant },
}

type Factory<T> =
    Box<dyn Fn() -> Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send>> + Send + Sync>;

/// Lazily constructs one subsystem, at most once concurrently.
pub struct Deferred<T> {
    name: &'static str,
    policy: RetryPolicy,
    factory: Factory<T>,
    handle: Mutex<Handle<T>>,
}

impl<T: Send + Sync + 'static> Deferred<T> {
    pub fn new<F, Fut>(name: &'static str, policy: RetryPolicy, factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            name,
            policy,
            factory: Box::new(move || Box::pin(factory())),
            handle: Mutex::new(Handle::Uninitialized),
        }
    }

    /// Returns the constructed subsystem, running the factory if this is the
    /// first call (or a permitted retry after a failure). Concurrent callers
    /// queue on the handle lock; exactly one of them runs the factory and
    /// the rest observe its cached outcome.
    pub async fn get(&self) -> Result<Arc<T>, Unavailable> {
        let mut handle = self.handle.lock().await;

        match &*handle {
            Handle::Ready(value) => return Ok(Arc::clone(value)),
            Handle::Failed { detail, at } => {
                let cached = Unavailable {
                    name: self.name,
                    detail: detail.clone(),
                };
                match self.policy {
                    RetryPolicy::CacheFailure => return Err(cached),
                    RetryPolicy::RetryWithBackoff(window) if at.elapsed() < window => {
                        return Err(cached)
                    }
                    _ => {} // fall through to a fresh attempt
                }
            }
            Handle::Uninitialized => {}
        }

        // Factory runs while the lock is held: one attempt at a time.
        match (self.factory)().await {
            Ok(value) => {
                info!("deferred subsystem '{}' constructed", self.name);
                let value = Arc::new(value);
                *handle = Handle::Ready(Arc::clone(&value));
                Ok(value)
            }
            Err(e) => {
                let detail = format!("{e:#}");
                error!("deferred subsystem '{}' failed to construct: {detail}", self.name);
                *handle = Handle::Failed {
                    detail: detail.clone(),
                    at: Instant::now(),
                };
                Err(Unavailable {
                    name: self.name,
                    detail,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_factory(
        runs: Arc<AtomicUsize>,
        fail_first: usize,
    ) -> impl Fn() -> Pin<Box<dyn Future<Output = anyhow::Result<u32>> + Send>> + Send + Sync {
        move || {
            let runs = Arc::clone(&runs);
            Box::pin(async move {
                let n = runs.fetch_add(1, Ordering::SeqCst);
                if n < fail_first {
                    anyhow::bail!("upstream not ready (attempt {n})")
                }
                Ok(42)
            })
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_calls_run_the_factory_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let loader = Arc::new(Deferred::new("career_agent", RetryPolicy::RetryEveryCall, {
            let runs = Arc::clone(&runs);
            move || {
                let runs = Arc::clone(&runs);
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    // Make the construction window wide enough for every
                    // task to have called get() before it finishes.
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(7_u32)
                }
            }
        }));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let loader = Arc::clone(&loader);
                tokio::spawn(async move { loader.get().await })
            })
            .collect();

        for task in tasks {
            assert_eq!(*task.await.unwrap().unwrap(), 7);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_every_call_recovers_after_transient_failure() {
        let runs = Arc::new(AtomicUsize::new(0));
        let loader = Deferred::new(
            "learning_agent",
            RetryPolicy::RetryEveryCall,
            counting_factory(Arc::clone(&runs), 1),
        );

        let err = loader.get().await.unwrap_err();
        assert!(err.detail.contains("upstream not ready"));

        // Second call retries and succeeds; success is then cached.
        assert_eq!(*loader.get().await.unwrap(), 42);
        assert_eq!(*loader.get().await.unwrap(), 42);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cache_failure_never_reruns_the_factory() {
        let runs = Arc::new(AtomicUsize::new(0));
        let loader = Deferred::new(
            "career_agent",
            RetryPolicy::CacheFailure,
            counting_factory(Arc::clone(&runs), usize::MAX),
        );

        loader.get().await.unwrap_err();
        loader.get().await.unwrap_err();
        loader.get().await.unwrap_err();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_suppresses_retries_inside_the_window() {
        let runs = Arc::new(AtomicUsize::new(0));
        let loader = Deferred::new(
            "career_agent",
            RetryPolicy::RetryWithBackoff(Duration::from_secs(30)),
            counting_factory(Arc::clone(&runs), 1),
        );

        loader.get().await.unwrap_err();
        loader.get().await.unwrap_err(); // inside the window: cached error
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(*loader.get().await.unwrap(), 42);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
