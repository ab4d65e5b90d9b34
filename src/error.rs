//! Error types for the store
//!
//! Cache operations themselves are total; errors only surface at the edges
//! (reaper lifecycle and configuration loading).

use thiserror::Error;

use crate::cache::ReaperState;

// == Cache Error Enum ==
/// Unified error type for the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// `run` was called on a store whose reaper is not idle
    #[error("Reaper unavailable: already {0}")]
    ReaperUnavailable(ReaperState),

    /// An environment variable could not be parsed
    #[error("Invalid config: {var}={value:?} ({reason})")]
    InvalidConfig {
        var: &'static str,
        value: String,
        reason: String,
    },
}

// == Result Type Alias ==
/// Convenience Result type for the store.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaper_unavailable_message() {
        let err = CacheError::ReaperUnavailable(ReaperState::Stopped);
        assert_eq!(err.to_string(), "Reaper unavailable: already stopped");
    }

    #[test]
    fn test_invalid_config_message() {
        let err = CacheError::InvalidConfig {
            var: "CACHE_SWEEP_INTERVAL_MS",
            value: "soon".to_string(),
            reason: "invalid digit found in string".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid config: CACHE_SWEEP_INTERVAL_MS=\"soon\" (invalid digit found in string)"
        );
    }
}
