//! Command provenance and privilege types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Privilege a command needs (or a session holds).
///
/// Ordered: `Standard < Elevated < Root`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivilegeLevel {
    /// Regular user rights
    #[default]
    Standard,
    /// Needs `sudo` or an equivalent elevation step
    Elevated,
    /// Needs a root shell
    Root,
}

impl PrivilegeLevel {
    /// Whether this level is above [`PrivilegeLevel::Standard`].
    pub fn is_elevated(self) -> bool {
        self > PrivilegeLevel::Standard
    }
}

impl fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrivilegeLevel::Standard => write!(f, "standard"),
            PrivilegeLevel::Elevated => write!(f, "elevated"),
            PrivilegeLevel::Root => write!(f, "root"),
        }
    }
}

/// Where a command string came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandSource {
    /// Typed by the user into the terminal or chat
    #[default]
    User,
    /// Proposed by the LLM assistant
    AiSuggestion,
}

impl fmt::Display for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandSource::User => write!(f, "user"),
            CommandSource::AiSuggestion => write!(f, "ai_suggestion"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privilege_levels_are_ordered() {
        assert!(PrivilegeLevel::Standard < PrivilegeLevel::Elevated);
        assert!(PrivilegeLevel::Elevated < PrivilegeLevel::Root);
        assert!(!PrivilegeLevel::Standard.is_elevated());
        assert!(PrivilegeLevel::Root.is_elevated());
    }

    #[test]
    fn privilege_level_serializes_snake_case() {
        let json = serde_json::to_string(&PrivilegeLevel::Elevated).unwrap();
        assert_eq!(json, "\"elevated\"");
        let parsed: PrivilegeLevel = serde_json::from_str("\"root\"").unwrap();
        assert_eq!(parsed, PrivilegeLevel::Root);
    }

    #[test]
    fn command_source_display() {
        assert_eq!(CommandSource::AiSuggestion.to_string(), "ai_suggestion");
        assert_eq!(CommandSource::default(), CommandSource::User);
    }
}
