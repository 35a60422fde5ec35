//! Handler priority.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Execution order of handlers for one event type. Earlier variants run first.
///
/// `AlwaysFirst` and `AlwaysLast` are exclusive slots: each event type has at
/// most one holder of each, and a later claimant is demoted with
/// [`HookPriority::demoted`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum HookPriority {
    /// Runs before every other handler. Exclusive.
    AlwaysFirst,
    /// Highest regular priority.
    Highest,
    /// Above normal.
    AboveNormal,
    /// Default priority.
    #[default]
    Normal,
    /// Below normal.
    BelowNormal,
    /// Lowest regular priority.
    Lowest,
    /// Runs after every other handler. Exclusive.
    AlwaysLast,
}

impl HookPriority {
    /// Returns whether this is one of the exclusive slots.
    pub fn is_exclusive(self) -> bool {
        matches!(self, Self::AlwaysFirst | Self::AlwaysLast)
    }

    /// Returns the priority used when an exclusive slot is already taken.
    pub fn demoted(self) -> Self {
        match self {
            Self::AlwaysFirst => Self::Highest,
            Self::AlwaysLast => Self::Lowest,
            other => other,
        }
    }

    /// Returns the string name of this priority.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AlwaysFirst => "always_first",
            Self::Highest => "highest",
            Self::AboveNormal => "above_normal",
            Self::Normal => "normal",
            Self::BelowNormal => "below_normal",
            Self::Lowest => "lowest",
            Self::AlwaysLast => "always_last",
        }
    }
}

impl fmt::Display for HookPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(HookPriority::AlwaysFirst < HookPriority::Highest);
        assert!(HookPriority::Highest < HookPriority::Normal);
        assert!(HookPriority::Lowest < HookPriority::AlwaysLast);
    }

    #[test]
    fn test_demotion() {
        assert_eq!(HookPriority::AlwaysFirst.demoted(), HookPriority::Highest);
        assert_eq!(HookPriority::AlwaysLast.demoted(), HookPriority::Lowest);
        assert_eq!(HookPriority::Normal.demoted(), HookPriority::Normal);
    }
}
