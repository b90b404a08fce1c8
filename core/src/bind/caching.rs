//! Entity caching decision

use serde::{Deserialize, Serialize};

/// Container-wide second-level cache mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SharedCacheMode {
    /// Every entity is cached
    All,
    /// Only entities explicitly marked cacheable
    EnableSelective,
    /// Every entity except those explicitly marked non-cacheable
    DisableSelective,
    /// Nothing is cached
    None,
    /// Behaves like `EnableSelective`
    #[default]
    Unspecified,
}

/// Whether an entity is cached given the mode and its explicit `@Cacheable` value
///
/// ```
/// use quarry_core::bind::{SharedCacheMode, should_cache};
///
/// assert!(should_cache(SharedCacheMode::DisableSelective, None));
/// assert!(!should_cache(SharedCacheMode::EnableSelective, None));
/// assert!(!should_cache(SharedCacheMode::None, Some(true)));
/// ```
#[must_use]
pub fn should_cache(mode: SharedCacheMode, explicit: Option<bool>) -> bool {
    match mode {
        SharedCacheMode::All => true,
        SharedCacheMode::EnableSelective | SharedCacheMode::Unspecified => explicit == Some(true),
        SharedCacheMode::DisableSelective => explicit != Some(false),
        SharedCacheMode::None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_table() {
        use SharedCacheMode::*;
        let cases = [
            (All, [true, true, true]),
            (EnableSelective, [false, true, false]),
            (Unspecified, [false, true, false]),
            (DisableSelective, [true, true, false]),
            (None, [false, false, false]),
        ];
        for (mode, expected) in cases {
            let actual = [
                should_cache(mode, Option::None),
                should_cache(mode, Some(true)),
                should_cache(mode, Some(false)),
            ];
            assert_eq!(actual, expected, "{mode:?}");
        }
    }
}
