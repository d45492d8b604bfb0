//! Redaction strategies applied to detected sensitive substrings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a detected sensitive substring is rewritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactionStrategy {
    /// Keep the first `preserve_length` characters, mask the rest.
    /// The redacted segment has the same length as the match.
    #[default]
    Mask,
    /// Delete the match.
    Remove,
    /// Replace the match with a fixed-width digest token.
    Hash,
    /// Replace the match with a configured literal.
    Placeholder,
}

impl fmt::Display for RedactionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedactionStrategy::Mask => write!(f, "mask"),
            RedactionStrategy::Remove => write!(f, "remove"),
            RedactionStrategy::Hash => write!(f, "hash"),
            RedactionStrategy::Placeholder => write!(f, "placeholder"),
        }
    }
}
