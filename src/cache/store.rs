//! Cache Store Module
//!
//! Main cache engine: a hash table of entries plus the index of keys that
//! carry a TTL, both guarded by a single readers-writer lock.

use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::watch;

use crate::cache::{Clock, Entry, EntryOption};
use crate::config::{StoreBuilder, StoreConfig};
use crate::error::{CacheError, Result};
use crate::tasks::reaper;

// == Reaper State ==
/// Lifecycle of the background reaper attached to a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaperState {
    /// Not started yet
    Idle,
    /// `run` is in progress
    Running,
    /// Cancelled; cannot be restarted
    Stopped,
}

impl ReaperState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Running,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for ReaperState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Running => f.write_str("running"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

#[derive(Debug)]
struct Tables<K, V> {
    /// Key-value storage
    entries: HashMap<K, Entry<V>>,
    /// Keys whose entry has a nonzero TTL; always a subset of `entries`
    expiring: HashSet<K>,
}

// == Store ==
/// Generic in-process key/value store with per-entry TTL.
///
/// All operations are synchronous and total. Expired entries read as absent
/// straight away, but stay in the table (and in [`count`](Self::count)) until
/// the reaper sweeps them; see [`run`](Self::run).
#[derive(Debug)]
pub struct Store<K, V> {
    tables: RwLock<Tables<K, V>>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
    default_ttl_reset: bool,
    sweep_interval: Duration,
    reaper: AtomicU8,
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // == Constructors ==
    /// Creates an empty store with no default TTL and the default sweep interval.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts configuring a store.
    pub fn builder() -> StoreBuilder<K, V> {
        StoreBuilder::new()
    }

    /// Creates an empty store from a plain configuration.
    pub fn from_config(config: StoreConfig) -> Self {
        StoreBuilder::from_config(config).build()
    }

    pub(crate) fn from_parts(config: StoreConfig, values: HashMap<K, V>, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        let mut entries = HashMap::with_capacity(config.initial_capacity.max(values.len()));
        entries.extend(
            values
                .into_iter()
                .map(|(key, value)| (key, Entry::new(value, now, std::iter::empty()))),
        );

        Self {
            tables: RwLock::new(Tables {
                entries,
                expiring: HashSet::new(),
            }),
            clock,
            default_ttl: config.default_ttl,
            default_ttl_reset: config.default_ttl_reset && !config.default_ttl.is_zero(),
            sweep_interval: config.effective_sweep_interval(),
            reaper: AtomicU8::new(ReaperState::Idle as u8),
        }
    }

    // == Get ==
    /// Returns a clone of the value stored under `key`, if it is still alive.
    ///
    /// An expired entry is reported as absent but is not removed. For entries
    /// stored with reset-on-read, a hit restarts the TTL window at the time of
    /// the read.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        {
            let tables = self.read();
            let entry = tables.entries.get(key)?;
            if !entry.is_alive(self.clock.now()) {
                return None;
            }
            // Entries without a TTL have no window to restart.
            if !entry.ttl_reset || !entry.has_ttl() {
                return Some(entry.value.clone());
            }
        }

        // Refreshing the timestamp is a write; re-check under the exclusive lock.
        let mut tables = self.write();
        let now = self.clock.now();
        let entry = tables.entries.get_mut(key)?;
        if !entry.is_alive(now) {
            return None;
        }
        if entry.ttl_reset && entry.has_ttl() {
            entry.touch(now);
        }
        Some(entry.value.clone())
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// The store's default TTL, if any, applies.
    pub fn set(&self, key: K, value: V) {
        self.set_with(key, value, std::iter::empty());
    }

    /// Stores `value` under `key` with per-entry options, replacing any
    /// previous entry entirely.
    ///
    /// An explicit TTL always takes precedence over the store default.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `options` - Per-entry options, applied in order before the store defaults
    pub fn set_with<I>(&self, key: K, value: V, options: I)
    where
        I: IntoIterator<Item = EntryOption>,
    {
        let mut tables = self.write();

        let mut entry = Entry::new(value, self.clock.now(), options);
        self.apply_default_ttl(&mut entry);

        if entry.has_ttl() {
            tables.expiring.insert(key.clone());
        } else {
            tables.expiring.remove(&key);
        }
        tables.entries.insert(key, entry);
    }

    // == Delete ==
    /// Removes `key`. Removing a missing key is a no-op.
    pub fn delete<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut tables = self.write();
        tables.entries.remove(key);
        tables.expiring.remove(key);
    }

    // == Count ==
    /// Returns the raw number of entries in the table.
    ///
    /// Entries that have expired but not yet been swept are included.
    pub fn count(&self) -> usize {
        self.read().entries.len()
    }

    // == Is Empty ==
    /// Returns true if the table holds no entries, expired or not.
    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    // == Sweep Expired ==
    /// Removes every expired entry, visiting only keys that carry a TTL.
    ///
    /// Returns the number of entries removed.
    pub(crate) fn sweep_expired(&self) -> usize {
        let mut guard = self.write();
        let now = self.clock.now();
        let Tables { entries, expiring } = &mut *guard;
        let before = entries.len();

        expiring.retain(|key| match entries.get(key) {
            Some(entry) if entry.is_alive(now) => true,
            Some(_) => {
                entries.remove(key);
                false
            }
            // Stale index key; nothing to evict.
            None => false,
        });

        before - entries.len()
    }

    fn apply_default_ttl(&self, entry: &mut Entry<V>) {
        if !entry.has_ttl() && !self.default_ttl.is_zero() {
            entry.ttl = self.default_ttl;
        }
        if !entry.ttl_reset && self.default_ttl_reset {
            entry.ttl_reset = true;
        }
    }

    // == Run ==
    /// Runs the reaper until `shutdown` carries `true` or its sender is dropped.
    ///
    /// Every sweep interval, expired entries are physically removed. This
    /// future only completes on cancellation, so it is normally driven on its
    /// own task (see [`spawn_reaper`](crate::spawn_reaper)). A store has at most
    /// one reaper over its lifetime: calling `run` again, concurrently or after
    /// cancellation, returns [`CacheError::ReaperUnavailable`].
    ///
    /// # Arguments
    /// * `shutdown` - Cancellation signal; the reaper stops within one tick of
    ///   observing `true` or a dropped sender
    ///
    /// # Returns
    /// - `Ok(())` once cancelled
    /// - `Err(CacheError::ReaperUnavailable)` if this store's reaper already ran
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        if let Err(current) = self.reaper.compare_exchange(
            ReaperState::Idle as u8,
            ReaperState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            let state = ReaperState::from_u8(current);
            tracing::warn!(%state, "Reaper start refused");
            return Err(CacheError::ReaperUnavailable(state));
        }

        // Also marks the reaper stopped if this future is dropped mid-run.
        let _stopped = MarkStopped(&self.reaper);
        reaper::sweep_until_cancelled(self, self.sweep_interval, shutdown).await;
        Ok(())
    }

    /// Returns the current reaper lifecycle state.
    pub fn reaper_state(&self) -> ReaperState {
        ReaperState::from_u8(self.reaper.load(Ordering::Acquire))
    }

    /// Returns the interval the reaper sweeps at.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    // == Lock Helpers ==
    // Poisoning is ignored; the tables stay usable after a caller panics.
    fn read(&self) -> RwLockReadGuard<'_, Tables<K, V>> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables<K, V>> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }
}

struct MarkStopped<'a>(&'a AtomicU8);

impl Drop for MarkStopped<'_> {
    fn drop(&mut self) {
        self.0.store(ReaperState::Stopped as u8, Ordering::Release);
    }
}

impl<K, V> Default for Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub(crate) fn expiring_count(&self) -> usize {
        self.read().expiring.len()
    }

    pub(crate) fn is_expiring<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read().expiring.contains(key)
    }

    pub(crate) fn raw_entry<Q>(&self, key: &Q) -> Option<Entry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read().entries.get(key).cloned()
    }

    pub(crate) fn cached_at<Q>(&self, key: &Q) -> Option<chrono::DateTime<chrono::Utc>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.raw_entry(key).map(|entry| entry.cached_at)
    }

    /// Inserts an entry as-is, bypassing the index and default policy.
    pub(crate) fn insert_raw(&self, key: K, entry: Entry<V>) {
        self.write().entries.insert(key, entry);
    }

    pub(crate) fn index_raw(&self, key: K) {
        self.write().expiring.insert(key);
    }

    pub(crate) fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }
}
