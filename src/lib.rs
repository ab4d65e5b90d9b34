//! ttl_store - An in-process key/value store with TTL expiration
//!
//! Entries may carry a time-to-live, optionally refreshed on every read.
//! Expired entries read as absent immediately and are physically removed by
//! a cancellable background reaper.
//!
//! ```
//! use std::time::Duration;
//! use ttl_store::{EntryOption, Store};
//!
//! let store: Store<&str, u32> = Store::new();
//! store.set("answer", 42);
//! store.set_with("session", 7, [EntryOption::ttl(Duration::from_secs(60))]);
//!
//! assert_eq!(store.get("answer"), Some(42));
//! assert_eq!(store.count(), 2);
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{Clock, EntryOption, ManualClock, ReaperState, Store, SystemClock};
pub use config::{StoreBuilder, StoreConfig, DEFAULT_SWEEP_INTERVAL};
pub use error::{CacheError, Result};
pub use tasks::spawn_reaper;
