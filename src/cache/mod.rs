//! Cache Module
//!
//! Provides the in-memory store with per-entry TTL, lazy expiration on read
//! and eager expiration by the reaper.

mod clock;
mod entry;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub(crate) use entry::Entry;
pub use entry::EntryOption;
pub use store::{ReaperState, Store};
