//! Duplicate call suppression.
//!
//! Concurrent work on one key collapses into a single execution whose outcome
//! is multicast to every waiter — the mechanism that keeps a thundering herd
//! of cache misses from stampeding the underlying source.
//!
//! The registry lock is never held across the user's work: waiters block on a
//! per-call barrier, so flights for independent keys proceed in parallel.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;

use crate::error::CacheError;

type Outcome<T> = Result<T, CacheError>;
type Barrier<T> = watch::Receiver<Option<Outcome<T>>>;

enum Role<T> {
    /// First caller for the key: runs the work and publishes the outcome.
    Leader(watch::Sender<Option<Outcome<T>>>),
    /// A duplicate caller: awaits the leader's barrier.
    Waiter(Barrier<T>),
}

/// Collapses concurrent calls per key into one execution.
///
/// For N concurrent [`run`](Singleflight::run) calls on the same key, the
/// work future is polled exactly once; all N callers observe the same
/// outcome. Once the execution completes and its record is unregistered, a
/// later caller starts a fresh one. There is no caching across calls — that
/// is the caller's concern.
pub struct Singleflight<T> {
    calls: Mutex<HashMap<String, Barrier<T>>>,
}

impl<T> Default for Singleflight<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Singleflight<T> {
    /// Creates an empty flight registry.
    pub fn new() -> Self {
        Singleflight {
            calls: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Barrier<T>>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Singleflight<T>
where
    T: Clone,
{
    /// Executes `work` for `key`, unless an execution is already in flight,
    /// in which case the caller awaits that execution's outcome instead.
    ///
    /// Dropping a waiter never cancels the flight. Dropping the leader drops
    /// the work with it; remaining waiters then observe
    /// [`CacheError::FlightDropped`] and the record is cleared, so the next
    /// caller starts over.
    pub async fn run<F>(&self, key: &str, work: F) -> Outcome<T>
    where
        F: Future<Output = Outcome<T>>,
    {
        let role = {
            let mut calls = self.lock();
            match calls.get(key) {
                Some(barrier) => Role::Waiter(barrier.clone()),
                None => {
                    let (publish, barrier) = watch::channel(None);
                    calls.insert(key.to_owned(), barrier);
                    Role::Leader(publish)
                }
            }
        };

        match role {
            Role::Leader(publish) => {
                // Unregisters on every exit path, including a dropped leader.
                let _guard = Unregister { flights: self, key };
                let outcome = work.await;
                let _ = publish.send(Some(outcome.clone()));
                outcome
            }
            Role::Waiter(mut barrier) => loop {
                if let Some(outcome) = barrier.borrow_and_update().as_ref() {
                    break outcome.clone();
                }
                if barrier.changed().await.is_err() {
                    // The leader is gone; it may still have published first.
                    break barrier
                        .borrow()
                        .as_ref()
                        .cloned()
                        .unwrap_or(Err(CacheError::FlightDropped));
                }
            },
        }
    }
}

struct Unregister<'a, T> {
    flights: &'a Singleflight<T>,
    key: &'a str,
}

impl<T> Drop for Unregister<'_, T> {
    fn drop(&mut self) {
        self.flights.lock().remove(self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::sync::Barrier as TaskBarrier;

    #[tokio::test(start_paused = true)]
    async fn concurrent_calls_coalesce_into_one_execution() {
        let flights = Arc::new(Singleflight::<String>::new());
        let executions = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..100 {
            let flights = Arc::clone(&flights);
            let executions = Arc::clone(&executions);
            handles.push(tokio::spawn(async move {
                flights
                    .run("x", async {
                        executions.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok("v".to_owned())
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "v");
        }
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_keys_run_in_parallel() {
        let flights = Arc::new(Singleflight::<&'static str>::new());
        // Each flight can only complete if the other is running concurrently.
        let rendezvous = Arc::new(TaskBarrier::new(2));

        let mut handles = Vec::new();
        for key in ["a", "b"] {
            let flights = Arc::clone(&flights);
            let rendezvous = Arc::clone(&rendezvous);
            handles.push(tokio::spawn(async move {
                flights
                    .run(key, async {
                        rendezvous.wait().await;
                        Ok(key)
                    })
                    .await
            }));
        }

        let joined = tokio::time::timeout(Duration::from_secs(5), async {
            for handle in handles {
                handle.await.unwrap().unwrap();
            }
        })
        .await;
        assert!(joined.is_ok(), "flights on distinct keys serialized");
    }

    #[tokio::test]
    async fn later_calls_start_fresh_executions() {
        let flights = Singleflight::<u32>::new();
        let executions = AtomicUsize::new(0);

        for expected in 1..=3 {
            let value = flights
                .run("k", async {
                    executions.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
            assert_eq!(executions.load(Ordering::SeqCst), expected);
        }
    }

    #[tokio::test]
    async fn errors_are_broadcast_verbatim() {
        let flights = Arc::new(Singleflight::<String>::new());
        let gate = Arc::new(TaskBarrier::new(2));

        let leader = {
            let flights = Arc::clone(&flights);
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                flights
                    .run("k", async {
                        gate.wait().await;
                        tokio::task::yield_now().await;
                        Err(CacheError::loader("source unavailable"))
                    })
                    .await
            })
        };
        // Wait until the leader's work is definitely in flight, then join it.
        gate.wait().await;
        let waiter = flights.run("k", async { Ok("unused".to_owned()) }).await;

        assert!(matches!(leader.await.unwrap(), Err(CacheError::Loader(_))));
        assert!(matches!(waiter, Err(CacheError::Loader(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_leader_releases_waiters_and_the_key() {
        let flights = Arc::new(Singleflight::<u32>::new());
        let executions = Arc::new(AtomicUsize::new(0));

        let leader = {
            let flights = Arc::clone(&flights);
            let executions = Arc::clone(&executions);
            tokio::spawn(async move {
                flights
                    .run("k", async {
                        executions.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        Ok(1)
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;

        let waiter = {
            let flights = Arc::clone(&flights);
            tokio::spawn(async move { flights.run("k", async { Ok(2) }).await })
        };
        tokio::task::yield_now().await;

        leader.abort();
        assert!(matches!(
            waiter.await.unwrap(),
            Err(CacheError::FlightDropped)
        ));

        // The record is gone: a new call executes fresh work.
        let value = flights.run("k", async { Ok(3) }).await.unwrap();
        assert_eq!(value, 3);
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }
}
