//! Three-valued verdict type
//!
//! Used wherever a check can be pending or indeterminate: DNS validity,
//! hash validity, individual signature outcomes. Deliberately not a bool.

use serde::{Deserialize, Serialize};

/// Ternary verdict: a check that has not run yet is neither true nor false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TriState {
    #[default]
    Unknown,
    True,
    False,
}

impl TriState {
    pub fn is_true(self) -> bool {
        self == TriState::True
    }

    pub fn is_false(self) -> bool {
        self == TriState::False
    }

    pub fn is_unknown(self) -> bool {
        self == TriState::Unknown
    }

    /// Display label for status output
    pub fn as_str(self) -> &'static str {
        match self {
            TriState::Unknown => "unknown",
            TriState::True => "true",
            TriState::False => "false",
        }
    }
}

impl From<bool> for TriState {
    fn from(b: bool) -> Self {
        if b {
            TriState::True
        } else {
            TriState::False
        }
    }
}
