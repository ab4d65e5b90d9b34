//! Reaper Task
//!
//! Background loop that periodically removes expired entries from a store.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::cache::Store;
use crate::error::Result;

/// Stand-in start time for intervals too long to add to `Instant::now()`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Spawns [`Store::run`] on the current Tokio runtime.
///
/// The task holds a clone of `store`, so the store stays alive until the
/// reaper is cancelled. Dropping every handle to the store without sending
/// `true` on `shutdown` (or dropping its sender) leaks the task.
///
/// # Arguments
/// * `store` - Shared store to sweep; the task keeps one reference
/// * `shutdown` - Cancellation signal; `true` or a dropped sender stops the task
///
/// # Returns
/// A JoinHandle resolving to the result of [`Store::run`].
///
/// # Example
/// ```ignore
/// let store = Arc::new(Store::<String, String>::new());
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// let handle = spawn_reaper(store.clone(), shutdown_rx);
/// // Later, during shutdown:
/// shutdown_tx.send(true).ok();
/// handle.await??;
/// ```
pub fn spawn_reaper<K, V>(
    store: Arc<Store<K, V>>,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<Result<()>>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move { store.run(shutdown).await })
}

/// Sweeps `store` every `interval` until `shutdown` fires.
///
/// The first sweep happens one full interval after the call.
pub(crate) async fn sweep_until_cancelled<K, V>(
    store: &Store<K, V>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) where
    K: Eq + Hash + Clone,
    V: Clone,
{
    if *shutdown.borrow_and_update() {
        info!("Reaper cancelled before start");
        return;
    }

    info!(interval = ?interval, "Starting reaper");

    let now = Instant::now();
    let start = now
        .checked_add(interval)
        .unwrap_or_else(|| now + FAR_FUTURE);
    let mut ticker = time::interval_at(start, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow_and_update() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let removed = store.sweep_expired();

                if removed > 0 {
                    debug!(removed, remaining = store.count(), "Reaper evicted expired entries");
                } else {
                    trace!("Reaper found no expired entries");
                }
            }
        }
    }

    info!("Reaper stopped");
}
