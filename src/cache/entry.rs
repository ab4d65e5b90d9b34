//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use chrono::{DateTime, Utc};

// == Entry Option ==
/// Per-entry option accepted by [`Store::set_with`](crate::cache::Store::set_with).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOption {
    /// Expire `ttl` after the entry was stored.
    Ttl(Duration),
    /// Expire `ttl` after the last successful read.
    TtlWithReset(Duration),
}

impl EntryOption {
    /// Shorthand for [`EntryOption::Ttl`].
    pub fn ttl(ttl: Duration) -> Self {
        Self::Ttl(ttl)
    }

    /// Shorthand for [`EntryOption::TtlWithReset`].
    pub fn ttl_with_reset(ttl: Duration) -> Self {
        Self::TtlWithReset(ttl)
    }

    fn apply<V>(self, entry: &mut Entry<V>) {
        match self {
            Self::Ttl(ttl) => entry.ttl = ttl,
            Self::TtlWithReset(ttl) => {
                entry.ttl = ttl;
                entry.ttl_reset = true;
            }
        }
    }
}

// == Entry ==
/// A single cached value and its expiration metadata.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Entry<V> {
    /// The stored value
    pub(crate) value: V,
    /// Creation or last refresh time
    pub(crate) cached_at: DateTime<Utc>,
    /// Zero = never expires
    pub(crate) ttl: Duration,
    /// Refresh `cached_at` on every successful read
    pub(crate) ttl_reset: bool,
}

impl<V> Entry<V> {
    // == Constructor ==
    /// Creates an entry stamped at `now`, then applies `options` in order.
    pub(crate) fn new<I>(value: V, now: DateTime<Utc>, options: I) -> Self
    where
        I: IntoIterator<Item = EntryOption>,
    {
        let mut entry = Self {
            value,
            cached_at: now,
            ttl: Duration::ZERO,
            ttl_reset: false,
        };

        for option in options {
            option.apply(&mut entry);
        }

        entry
    }

    // == Has TTL ==
    pub(crate) fn has_ttl(&self) -> bool {
        !self.ttl.is_zero()
    }

    // == Is Alive ==
    /// Checks whether the entry is still readable at `now`.
    ///
    /// Boundary condition: the entry is alive at exactly `cached_at + ttl` and
    /// dead only strictly after it. An expiry that overflows the calendar is
    /// treated as never reached.
    pub(crate) fn is_alive(&self, now: DateTime<Utc>) -> bool {
        if !self.has_ttl() {
            return true;
        }

        chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| self.cached_at.checked_add_signed(ttl))
            .map_or(true, |expires_at| now <= expires_at)
    }

    // == Touch ==
    /// Restarts the TTL window at `now`.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.cached_at = now;
    }
}
