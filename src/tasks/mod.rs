//! Background Tasks Module
//!
//! # Tasks
//! - Reaper: removes expired entries at the store's sweep interval

pub(crate) mod reaper;

pub use reaper::spawn_reaper;
