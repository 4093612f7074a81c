// SPDX-License-Identifier: GPL-3.0-only

//! Retention policies for the duplicate filter and the code cache
//!
//! Both settings are configured as milliseconds where `0` and `-1` carry
//! special meaning. They are parsed once into these enums so the session
//! never has to interpret sentinel values.

use crate::constants::{DEFAULT_CODE_CACHING_DURATION_MS, DEFAULT_CODE_DUPLICATE_FILTER_MS};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};

/// How long a recognized code stays in `all_recognized`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum CachingPolicy {
    /// Codes are discarded before the next frame is processed
    Discard,
    /// Codes expire this many milliseconds after they were last inserted
    Window(u64),
    /// Codes are kept until the session is cleared
    Session,
}

/// How long a recognized code is suppressed after it was last seen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum DuplicatePolicy {
    /// Every detection is reported, identical repeats included
    Off,
    /// Repeats closer than this many milliseconds are suppressed
    Window(u64),
    /// A code is reported at most once per session
    Session,
}

impl Default for CachingPolicy {
    fn default() -> Self {
        Self::try_from(DEFAULT_CODE_CACHING_DURATION_MS).unwrap_or(Self::Session)
    }
}

impl Default for DuplicatePolicy {
    fn default() -> Self {
        Self::try_from(DEFAULT_CODE_DUPLICATE_FILTER_MS).unwrap_or(Self::Off)
    }
}

impl TryFrom<i64> for CachingPolicy {
    type Error = ConfigError;

    fn try_from(ms: i64) -> Result<Self, Self::Error> {
        match ms {
            -1 => Ok(Self::Session),
            0 => Ok(Self::Discard),
            ms if ms > 0 => Ok(Self::Window(ms as u64)),
            ms => Err(ConfigError::InvalidDuration {
                setting: "code_caching_duration_ms",
                value: ms,
            }),
        }
    }
}

impl From<CachingPolicy> for i64 {
    fn from(policy: CachingPolicy) -> Self {
        match policy {
            CachingPolicy::Discard => 0,
            CachingPolicy::Window(ms) => ms as i64,
            CachingPolicy::Session => -1,
        }
    }
}

impl TryFrom<i64> for DuplicatePolicy {
    type Error = ConfigError;

    fn try_from(ms: i64) -> Result<Self, Self::Error> {
        match ms {
            -1 => Ok(Self::Session),
            0 => Ok(Self::Off),
            ms if ms > 0 => Ok(Self::Window(ms as u64)),
            ms => Err(ConfigError::InvalidDuration {
                setting: "code_duplicate_filter_ms",
                value: ms,
            }),
        }
    }
}

impl From<DuplicatePolicy> for i64 {
    fn from(policy: DuplicatePolicy) -> Self {
        match policy {
            DuplicatePolicy::Off => 0,
            DuplicatePolicy::Window(ms) => ms as i64,
            DuplicatePolicy::Session => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        assert_eq!(CachingPolicy::try_from(-1).unwrap(), CachingPolicy::Session);
        assert_eq!(CachingPolicy::try_from(0).unwrap(), CachingPolicy::Discard);
        assert_eq!(DuplicatePolicy::try_from(-1).unwrap(), DuplicatePolicy::Session);
        assert_eq!(DuplicatePolicy::try_from(0).unwrap(), DuplicatePolicy::Off);
        assert_eq!(DuplicatePolicy::try_from(500).unwrap(), DuplicatePolicy::Window(500));
    }

    #[test]
    fn test_other_negatives_rejected() {
        assert!(CachingPolicy::try_from(-2).is_err());
        assert!(DuplicatePolicy::try_from(-500).is_err());
    }

    #[test]
    fn test_serialized_as_milliseconds() {
        assert_eq!(serde_json::to_string(&CachingPolicy::Session).unwrap(), "-1");
        let policy: DuplicatePolicy = serde_json::from_str("250").unwrap();
        assert_eq!(policy, DuplicatePolicy::Window(250));
    }
}
