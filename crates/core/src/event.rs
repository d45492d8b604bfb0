//! Terminal events handed to the security core by the terminal layer.
//!
//! The terminal collaborator decodes raw bytes and classifies them; the
//! core only ever sees the decoded text and the "command-like" flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a terminal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalEventKind {
    /// Output received from the remote host
    Output,
    /// Input typed by the user
    Input,
}

/// A decoded chunk of terminal traffic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalEvent {
    pub kind: TerminalEventKind,
    pub timestamp: DateTime<Utc>,
    /// Length of the raw, undecoded payload in bytes
    pub byte_length: usize,
    pub text: String,
    /// Whether the terminal layer classified this text as a command line
    #[serde(default)]
    pub is_command: bool,
}

impl TerminalEvent {
    /// Output text from the remote host.
    pub fn output(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            kind: TerminalEventKind::Output,
            timestamp: Utc::now(),
            byte_length: text.len(),
            text,
            is_command: false,
        }
    }

    /// A command line entered by the user.
    pub fn command(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            kind: TerminalEventKind::Input,
            timestamp: Utc::now(),
            byte_length: text.len(),
            text,
            is_command: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_classification() {
        let out = TerminalEvent::output("total 0\n");
        assert_eq!(out.kind, TerminalEventKind::Output);
        assert!(!out.is_command);
        assert_eq!(out.byte_length, 8);

        let cmd = TerminalEvent::command("ls -la");
        assert_eq!(cmd.kind, TerminalEventKind::Input);
        assert!(cmd.is_command);
    }

    #[test]
    fn missing_command_flag_defaults_to_false() {
        let json = r#"{"kind":"output","timestamp":"2025-01-01T00:00:00Z","byte_length":2,"text":"hi"}"#;
        let event: TerminalEvent = serde_json::from_str(json).unwrap();
        assert!(!event.is_command);
    }
}
