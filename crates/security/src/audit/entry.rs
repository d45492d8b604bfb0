//! The persisted audit record and its event taxonomy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error returned when parsing a taxonomy value from a string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Generates a snake_case enum with `ALL`, `as_str`, `Display` and a
/// lenient `FromStr` (accepts `command_executed`, `command-executed`,
/// and `CommandExecuted`).
macro_rules! audit_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($label:literal) {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted: String = s
                    .trim()
                    .chars()
                    .filter(|c| *c != '_' && *c != '-')
                    .map(|c| c.to_ascii_lowercase())
                    .collect();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().replace('_', "") == wanted)
                    .ok_or_else(|| ParseEnumError {
                        kind: $label,
                        value: s.to_string(),
                    })
            }
        }
    };
}

audit_enum! {
    /// What happened.
    AuditEventType ("event type") {
        CommandExecuted => "command_executed",
        CommandSuggested => "command_suggested",
        CommandBlocked => "command_blocked",
        ValidationPassed => "validation_passed",
        ValidationFailed => "validation_failed",
        ConfirmationRequested => "confirmation_requested",
        SecurityViolation => "security_violation",
        PolicyChanged => "policy_changed",
        SensitiveDataDetected => "sensitive_data_detected",
        SensitiveDataFiltered => "sensitive_data_filtered",
        SessionStarted => "session_started",
        ApplicationStarted => "application_started",
        ApplicationStopped => "application_stopped",
        ConfigurationChanged => "configuration_changed",
        Error => "error",
    }
}

audit_enum! {
    /// Coarse grouping used for filtering.
    AuditCategory ("category") {
        Command => "command",
        Security => "security",
        Validation => "validation",
        SensitiveData => "sensitive_data",
        Application => "application",
        Error => "error",
    }
}

audit_enum! {
    /// Outcome of the audited operation.
    AuditResult ("result") {
        Success => "success",
        Failure => "failure",
        Denied => "denied",
        /// Awaiting user confirmation
        Pending => "pending",
    }
}

/// A single audit record, serialized as one JSON line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub category: AuditCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub result: AuditResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub session_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

impl AuditEntry {
    /// A fresh entry with a new id and the current time. The session id is
    /// left nil until the logger stamps it.
    pub fn new(event_type: AuditEventType, category: AuditCategory, result: AuditResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type,
            category,
            command: None,
            result,
            user: None,
            details: String::new(),
            duration_ms: 0,
            metadata: BTreeMap::new(),
            session_id: Uuid::nil(),
            ip_address: None,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_user(mut self, user: Option<impl Into<String>>) -> Self {
        self.user = user.map(Into::into);
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        let mut line = format!(
            "[{}] {} ({}) {}",
            self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            self.event_type,
            self.category,
            self.result
        );
        if let Some(command) = &self.command {
            line.push_str(&format!(": {command}"));
        }
        line
    }
}
