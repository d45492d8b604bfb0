//! Dangerous-command detection, independent of any policy.
//!
//! Matches the whole command line (not just the leading token),
//! case-insensitively, against signatures for universally destructive
//! idioms. Emptiness is not this module's concern: an empty command is
//! reported as allowed here and rejected by the validation service.

use regex_lite::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// Outcome of a dangerous-command check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DangerousCheck {
    Allowed,
    Blocked {
        /// Name of the signature that fired
        signature: &'static str,
        /// Human-readable explanation
        reason: String,
        /// A safer alternative, when one exists
        suggested_command: Option<String>,
    },
}

impl DangerousCheck {
    pub fn is_blocked(&self) -> bool {
        matches!(self, DangerousCheck::Blocked { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            DangerousCheck::Allowed => None,
            DangerousCheck::Blocked { reason, .. } => Some(reason),
        }
    }

    pub fn suggested_command(&self) -> Option<&str> {
        match self {
            DangerousCheck::Allowed => None,
            DangerousCheck::Blocked {
                suggested_command, ..
            } => suggested_command.as_deref(),
        }
    }
}

struct Signature {
    name: &'static str,
    regex: Regex,
    reason: &'static str,
    suggest: Option<fn(&str) -> Option<String>>,
}

type SignatureDef = (
    &'static str,
    &'static str,
    &'static str,
    Option<fn(&str) -> Option<String>>,
);

const SIGNATURE_DEFS: &[SignatureDef] = &[
    (
        "recursive_delete",
        r"(?i)\brm\s+(?:\S+\s+)*?-[a-z]*(?:r[a-z]*f|f[a-z]*r)[a-z]*(?:\s|$)",
        "Recursive forced delete",
        Some(suggest_interactive_rm),
    ),
    (
        "recursive_delete",
        r"(?i)\brm\s(?:.*\s)?(?:-r|-R|--recursive)\s(?:.*\s)?(?:-f|--force)(?:\s|$)",
        "Recursive forced delete",
        None,
    ),
    (
        "recursive_delete",
        r"(?i)\brm\s(?:.*\s)?(?:-f|--force)\s(?:.*\s)?(?:-r|-R|--recursive)(?:\s|$)",
        "Recursive forced delete",
        None,
    ),
    (
        "filesystem_format",
        r"(?i)\b(?:mkfs(?:\.[a-z0-9]+)?|mke2fs|mkswap|wipefs)(?:\s|$)",
        "Filesystem formatting",
        None,
    ),
    (
        "fork_bomb",
        r":\s*\(\s*\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:",
        "Fork bomb",
        None,
    ),
    (
        "permissive_chmod",
        r"(?i)\bchmod\s+(?:-[a-z]+\s+)*(?:0?777|a\+rwx|ugo\+rwx)(?:\s|$)",
        "World-writable permission grant",
        Some(suggest_restrictive_chmod),
    ),
    (
        "raw_device_write",
        r"(?i)\bdd\s(?:.*\s)?of=/dev/(?:sd[a-z]|hd[a-z]|vd[a-z]|xvd[a-z]|nvme[0-9]|mmcblk[0-9]|disk[0-9])",
        "Raw write to a block device",
        None,
    ),
    (
        "raw_device_write",
        r"(?i)>\s*/dev/(?:sd[a-z]|hd[a-z]|vd[a-z]|xvd[a-z]|nvme[0-9]|mmcblk[0-9]|disk[0-9])",
        "Output redirected onto a block device",
        None,
    ),
    (
        "remote_script_pipe",
        r"(?i)\b(?:curl|wget)\s.*\|\s*(?:sudo\s+)?(?:ba|z|k|da)?sh(?:\s|$)",
        "Remote script piped into a shell",
        None,
    ),
];

static SIGNATURES: LazyLock<Vec<Signature>> = LazyLock::new(|| {
    SIGNATURE_DEFS
        .iter()
        .map(|&(name, expression, reason, suggest)| Signature {
            name,
            regex: Regex::new(expression).expect("dangerous-command signature must compile"),
            reason,
            suggest,
        })
        .collect()
});

static ELEVATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[\s;&|(])(?:sudo|doas|pkexec)\s|\bsu\s(?:.*\s)?-c(?:\s|$)")
        .expect("elevation signature must compile")
});

static RM_FLAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\s)-[a-z]*(?:r[a-z]*f|f[a-z]*r)[a-z]*(\s|$)")
        .expect("rm flag expression must compile")
});

static CHMOD_MODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\bchmod\s+(?:-[a-z]+\s+)*)(?:0?777|a\+rwx|ugo\+rwx)")
        .expect("chmod mode expression must compile")
});

fn suggest_interactive_rm(command: &str) -> Option<String> {
    let suggested = RM_FLAGS.replace(command, "${1}-ri${2}").into_owned();
    (suggested != command).then_some(suggested)
}

fn suggest_restrictive_chmod(command: &str) -> Option<String> {
    let suggested = CHMOD_MODE.replace(command, "${1}755").into_owned();
    (suggested != command).then_some(suggested)
}

/// Detects universally destructive commands regardless of policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct DangerousCommandValidator;

impl DangerousCommandValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check a full command line. Never fails.
    pub fn validate(&self, command: &str) -> DangerousCheck {
        let command = command.trim();
        if command.is_empty() {
            return DangerousCheck::Allowed;
        }

        let Some(signature) = SIGNATURES.iter().find(|s| s.regex.is_match(command)) else {
            return DangerousCheck::Allowed;
        };

        let reason = if ELEVATION.is_match(command) {
            format!("{} with elevated privileges", signature.reason)
        } else {
            signature.reason.to_string()
        };
        let suggested_command = signature.suggest.and_then(|suggest| suggest(command));

        warn!(signature = signature.name, "Dangerous command detected: {}", reason);

        DangerousCheck::Blocked {
            signature: signature.name,
            reason,
            suggested_command,
        }
    }

    pub fn is_dangerous(&self, command: &str) -> bool {
        self.validate(command).is_blocked()
    }
}
