//! Command authorization against the active [`SecurityPolicy`].
//!
//! Rules:
//! - Empty or whitespace-only commands are forbidden in every mode
//! - `Disabled` allows every other command
//! - `Blacklist` denies blacklisted leading tokens and dangerous signatures
//! - `Whitelist` allows only whitelisted leading tokens (empty list denies all)
//!
//! Validation never fails: every input yields a definite verdict.

use crate::dangerous::{DangerousCheck, DangerousCommandValidator};
use pairadmin_config::{ConfigError, SecurityPolicy, ValidationMode};
use pairadmin_core::{CommandSource, PrivilegeLevel};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Prompt markers that may precede a command copied from a terminal.
const PROMPT_MARKERS: &[char] = &['$', '>', '!'];

/// Elevation commands whose target is also checked against the blacklist.
const ELEVATION_COMMANDS: &[&str] = &["sudo", "doas"];

/// `sudo`/`doas` options that consume the following argument.
const ELEVATION_ARG_FLAGS: &[&str] = &["-u", "-g", "-C", "-D", "-h", "-p", "-r", "-t", "-U"];

/// Who is asking for a command, and with what rights.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandContext {
    pub source: CommandSource,
    pub privilege: PrivilegeLevel,
    pub user: Option<String>,
}

impl CommandContext {
    /// A command typed by the user with standard privileges.
    pub fn user() -> Self {
        Self::default()
    }

    /// A command proposed by the assistant.
    pub fn ai_suggestion() -> Self {
        Self {
            source: CommandSource::AiSuggestion,
            ..Self::default()
        }
    }

    pub fn with_privilege(mut self, privilege: PrivilegeLevel) -> Self {
        self.privilege = privilege;
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

/// Verdict category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Allowed,
    Forbidden,
    RequiresConfirmation,
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationStatus::Allowed => write!(f, "allowed"),
            ValidationStatus::Forbidden => write!(f, "forbidden"),
            ValidationStatus::RequiresConfirmation => write!(f, "requires_confirmation"),
        }
    }
}

/// Result of validating a command.
///
/// `is_valid` is `true` only for [`ValidationStatus::Allowed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandValidationResult {
    pub is_valid: bool,
    pub status: ValidationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_command: Option<String>,
}

impl CommandValidationResult {
    pub fn allowed() -> Self {
        Self {
            is_valid: true,
            status: ValidationStatus::Allowed,
            reason: None,
            suggested_command: None,
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            status: ValidationStatus::Forbidden,
            reason: Some(reason.into()),
            suggested_command: None,
        }
    }

    pub fn requires_confirmation(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            status: ValidationStatus::RequiresConfirmation,
            reason: Some(reason.into()),
            suggested_command: None,
        }
    }

    pub fn with_suggestion(mut self, suggested: Option<String>) -> Self {
        self.suggested_command = suggested;
        self
    }

    pub fn is_forbidden(&self) -> bool {
        self.status == ValidationStatus::Forbidden
    }
}

/// Errors raised when constructing or reconfiguring the validation service.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("Invalid security policy: {0}")]
    Invalid(#[from] ConfigError),
}

impl From<PolicyError> for pairadmin_core::Error {
    fn from(err: PolicyError) -> Self {
        pairadmin_core::Error::Policy(err.to_string())
    }
}

/// The command tokens a policy decision is based on.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CommandTokens {
    /// First token, marker-stripped, reduced to its basename. Case is kept
    /// so reasons echo what was typed; policy lookups ignore case.
    leading: String,
    /// The command run by `sudo`/`doas`, when the leading token is one
    elevated: Option<String>,
}

impl CommandTokens {
    fn parse(command: &str) -> Option<Self> {
        let trimmed = command.trim().trim_start_matches(PROMPT_MARKERS);
        let mut words = trimmed.split_whitespace();
        let leading = normalize_token(words.next()?);

        let elevated = if ELEVATION_COMMANDS
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&leading))
        {
            elevation_target(words)
        } else {
            None
        };

        Some(Self { leading, elevated })
    }

    fn iter(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.leading.as_str()).chain(self.elevated.as_deref())
    }
}

fn normalize_token(token: &str) -> String {
    token
        .rsplit('/')
        .find(|part| !part.is_empty())
        .unwrap_or(token)
        .to_string()
}

fn elevation_target<'a>(mut words: impl Iterator<Item = &'a str>) -> Option<String> {
    while let Some(word) = words.next() {
        if word == "--" {
            return words.next().map(normalize_token);
        }
        if word.starts_with('-') {
            if ELEVATION_ARG_FLAGS.contains(&word) {
                words.next();
            }
            continue;
        }
        return Some(normalize_token(word));
    }
    None
}

/// Decides allow / forbid / confirm for commands.
///
/// Stateless per call; change the policy only during setup.
#[derive(Debug, Clone)]
pub struct CommandValidationService {
    policy: SecurityPolicy,
    dangerous: DangerousCommandValidator,
}

impl CommandValidationService {
    /// Create a service. An invalid policy is rejected.
    pub fn new(policy: SecurityPolicy) -> Result<Self, PolicyError> {
        policy.validate()?;
        Ok(Self {
            policy,
            dangerous: DangerousCommandValidator::new(),
        })
    }

    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    /// Replace the whole policy.
    pub fn set_policy(&mut self, policy: SecurityPolicy) -> Result<(), PolicyError> {
        policy.validate()?;
        self.policy = policy;
        Ok(())
    }

    /// Switch mode. Neither command list is touched.
    pub fn set_mode(&mut self, mode: ValidationMode) {
        self.policy.mode = mode;
    }

    pub fn dangerous_validator(&self) -> &DangerousCommandValidator {
        &self.dangerous
    }

    /// Validate a command for the given context.
    pub fn validate(&self, command: &str, context: &CommandContext) -> CommandValidationResult {
        let result = self.evaluate(command, context);
        debug!(
            status = %result.status,
            source = %context.source,
            "Command validated"
        );
        result
    }

    fn evaluate(&self, command: &str, context: &CommandContext) -> CommandValidationResult {
        if command.trim().is_empty() {
            return CommandValidationResult::forbidden("Empty command");
        }

        if self.policy.mode == ValidationMode::Disabled {
            return CommandValidationResult::allowed();
        }

        let length = command.chars().count();
        if length > self.policy.max_command_length {
            return CommandValidationResult::forbidden(format!(
                "Command is {} characters long (maximum {})",
                length, self.policy.max_command_length
            ));
        }

        let Some(tokens) = CommandTokens::parse(command) else {
            return CommandValidationResult::forbidden("Command contains no executable token");
        };

        match self.policy.mode {
            ValidationMode::Blacklist => {
                if let Some(token) = tokens.iter().find(|t| self.policy.blacklist_contains(t)) {
                    return CommandValidationResult::forbidden(format!(
                        "Command '{token}' is blacklisted"
                    ));
                }
            }
            ValidationMode::Whitelist => {
                if let Some(token) = tokens.iter().find(|t| !self.policy.whitelist_contains(t)) {
                    return CommandValidationResult::forbidden(format!(
                        "Command '{}' is not in the whitelist ({} commands configured)",
                        token,
                        self.policy.whitelisted_commands.len()
                    ));
                }
            }
            ValidationMode::Disabled => {}
        }

        if let DangerousCheck::Blocked {
            reason,
            suggested_command,
            ..
        } = self.dangerous.validate(command)
        {
            if self.policy.block_dangerous_commands {
                return CommandValidationResult::forbidden(reason).with_suggestion(suggested_command);
            }
            if self.policy.require_confirmation_for_destructive {
                return CommandValidationResult::requires_confirmation(reason)
                    .with_suggestion(suggested_command);
            }
        }

        let required = self.privilege_for(&tokens);
        if required > context.privilege {
            return CommandValidationResult::requires_confirmation(format!(
                "Command requires {} privileges (context has {})",
                required, context.privilege
            ));
        }

        CommandValidationResult::allowed()
    }

    fn privilege_for(&self, tokens: &CommandTokens) -> PrivilegeLevel {
        tokens
            .iter()
            .map(|t| self.policy.required_privilege(t))
            .max()
            .unwrap_or_default()
    }

    /// Privilege the command's leading token (or elevation target) needs.
    pub fn required_privilege(&self, command: &str) -> PrivilegeLevel {
        CommandTokens::parse(command)
            .map(|tokens| self.privilege_for(&tokens))
            .unwrap_or_default()
    }

    /// Whether the privilege map marks this command as needing elevation.
    pub fn requires_elevated_privilege(&self, command: &str) -> bool {
        self.required_privilege(command).is_elevated()
    }

    /// Blacklist lookup that ignores the active mode.
    pub fn is_blacklisted(&self, command: &str) -> bool {
        CommandTokens::parse(command)
            .is_some_and(|tokens| tokens.iter().any(|t| self.policy.blacklist_contains(t)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn service(mode: ValidationMode) -> CommandValidationService {
        let mut policy = SecurityPolicy {
            mode,
            ..SecurityPolicy::default()
        };
        policy.blacklisted_commands.insert("rm".into());
        CommandValidationService::new(policy).unwrap()
    }

    fn ctx() -> CommandContext {
        CommandContext::user()
    }

    #[test]
    fn empty_command_forbidden_in_every_mode() {
        for mode in [
            ValidationMode::Disabled,
            ValidationMode::Blacklist,
            ValidationMode::Whitelist,
        ] {
            let svc = service(mode);
            for cmd in ["", "   ", "\t\n"] {
                let result = svc.validate(cmd, &ctx());
                assert_eq!(result.status, ValidationStatus::Forbidden, "mode {mode:?}");
                assert!(!result.is_valid);
            }
        }
    }

    #[test]
    fn disabled_mode_allows_everything_non_empty() {
        let svc = service(ValidationMode::Disabled);
        let long = "x".repeat(10_000);
        for cmd in ["rm -rf /", ":(){ :|:& };:", "mkfs.ext4 /dev/sda1", "$", long.as_str()] {
            let result = svc.validate(cmd, &ctx());
            assert_eq!(result, CommandValidationResult::allowed(), "{cmd}");
        }
    }

    #[test]
    fn blacklist_is_case_insensitive() {
        let svc = service(ValidationMode::Blacklist);
        for cmd in ["rm -rf /tmp", "RM -RF /TMP", "/bin/rm file", "$ rm file"] {
            let result = svc.validate(cmd, &ctx());
            assert_eq!(result.status, ValidationStatus::Forbidden, "{cmd}");
            assert!(result.reason.unwrap().contains("blacklisted"));
        }
    }

    #[test]
    fn blacklist_checks_elevation_target() {
        let svc = service(ValidationMode::Blacklist);
        assert!(svc.is_blacklisted("sudo rm notes.txt"));
        assert!(svc.is_blacklisted("sudo -u admin rm notes.txt"));
        assert!(svc.is_blacklisted("doas -- reboot"));
        assert!(!svc.is_blacklisted("sudo ls"));
        assert!(svc.validate("sudo -u admin rm notes.txt", &ctx()).is_forbidden());
    }

    #[test]
    fn blacklist_allows_ordinary_commands() {
        let svc = service(ValidationMode::Blacklist);
        for cmd in ["ls -la", "git status", "cat /etc/hostname"] {
            assert_eq!(svc.validate(cmd, &ctx()), CommandValidationResult::allowed());
        }
    }

    #[test]
    fn dangerous_signature_is_forbidden_with_suggestion() {
        let mut policy = SecurityPolicy::default();
        policy.blacklisted_commands = BTreeSet::new();
        let svc = CommandValidationService::new(policy).unwrap();

        let result = svc.validate("rm -rf /tmp/build", &ctx());
        assert_eq!(result.status, ValidationStatus::Forbidden);
        assert_eq!(result.suggested_command.as_deref(), Some("rm -ri /tmp/build"));
    }

    #[test]
    fn dangerous_signature_requires_confirmation_when_not_blocking() {
        let mut policy = SecurityPolicy::default();
        policy.block_dangerous_commands = false;
        let svc = CommandValidationService::new(policy).unwrap();

        let result = svc.validate("chmod 777 /srv/www", &ctx());
        assert_eq!(result.status, ValidationStatus::RequiresConfirmation);
        assert!(!result.is_valid);
        assert_eq!(result.suggested_command.as_deref(), Some("chmod 755 /srv/www"));

        let mut policy = SecurityPolicy::default();
        policy.block_dangerous_commands = false;
        policy.require_confirmation_for_destructive = false;
        let svc = CommandValidationService::new(policy).unwrap();
        assert!(svc.validate("chmod 777 /srv/www", &ctx()).is_valid);
    }

    #[test]
    fn whitelist_allows_only_listed_tokens() {
        let svc = service(ValidationMode::Whitelist);
        assert!(svc.validate("ls -la /var", &ctx()).is_valid);
        assert!(svc.validate("LS", &ctx()).is_valid);

        let result = svc.validate("git status", &ctx());
        assert_eq!(result.status, ValidationStatus::Forbidden);
        assert!(result.reason.unwrap().contains("whitelist"));
    }

    #[test]
    fn empty_whitelist_denies_everything() {
        let policy = SecurityPolicy {
            mode: ValidationMode::Whitelist,
            whitelisted_commands: BTreeSet::new(),
            ..SecurityPolicy::default()
        };
        let svc = CommandValidationService::new(policy).unwrap();
        for cmd in ["ls", "pwd", "echo hi"] {
            assert!(svc.validate(cmd, &ctx()).is_forbidden(), "{cmd}");
        }
    }

    #[test]
    fn switching_mode_keeps_both_lists() {
        let mut svc = service(ValidationMode::Blacklist);
        let blacklist = svc.policy().blacklisted_commands.clone();
        let whitelist = svc.policy().whitelisted_commands.clone();

        svc.set_mode(ValidationMode::Whitelist);
        svc.set_mode(ValidationMode::Disabled);
        svc.set_mode(ValidationMode::Blacklist);

        assert_eq!(svc.policy().blacklisted_commands, blacklist);
        assert_eq!(svc.policy().whitelisted_commands, whitelist);
    }

    #[test]
    fn is_blacklisted_ignores_mode() {
        let svc = service(ValidationMode::Disabled);
        assert!(svc.is_blacklisted("rm -rf /"));
        assert!(svc.validate("rm -rf /", &ctx()).is_valid);
    }

    #[test]
    fn over_length_command_is_forbidden() {
        let policy = SecurityPolicy {
            max_command_length: 10,
            ..SecurityPolicy::default()
        };
        let svc = CommandValidationService::new(policy).unwrap();
        assert!(svc.validate("echo short", &ctx()).is_valid);
        let result = svc.validate("echo a bit longer", &ctx());
        assert!(result.is_forbidden());
        assert!(result.reason.unwrap().contains("maximum 10"));
    }

    #[test]
    fn marker_only_command_is_forbidden() {
        let svc = service(ValidationMode::Blacklist);
        assert!(svc.validate("$", &ctx()).is_forbidden());
        assert!(svc.validate(" > ", &ctx()).is_forbidden());
    }

    #[test]
    fn privilege_requirements() {
        let svc = service(ValidationMode::Blacklist);
        assert!(svc.requires_elevated_privilege("systemctl restart nginx"));
        assert!(svc.requires_elevated_privilege("sudo useradd bob"));
        assert!(!svc.requires_elevated_privilege("ls"));
        assert!(!svc.requires_elevated_privilege(""));
        assert_eq!(svc.required_privilege("iptables -L"), PrivilegeLevel::Root);

        let result = svc.validate("systemctl restart nginx", &ctx());
        assert_eq!(result.status, ValidationStatus::RequiresConfirmation);

        let elevated = ctx().with_privilege(PrivilegeLevel::Elevated);
        assert!(svc.validate("systemctl restart nginx", &elevated).is_valid);
        assert_eq!(
            svc.validate("useradd bob", &elevated).status,
            ValidationStatus::RequiresConfirmation
        );
    }

    #[test]
    fn invalid_policy_is_rejected() {
        let policy = SecurityPolicy {
            max_command_length: 0,
            ..SecurityPolicy::default()
        };
        assert!(CommandValidationService::new(policy).is_err());
    }

    #[test]
    fn whitelist_reason_keeps_typed_case() {
        let policy = SecurityPolicy {
            mode: ValidationMode::Whitelist,
            ..SecurityPolicy::default()
        };
        let svc = CommandValidationService::new(policy).unwrap();
        let result = svc.validate("/opt/tools/Deploy.sh --prod", &ctx());
        assert!(result.is_forbidden());
        assert!(result.reason.unwrap().contains("'Deploy.sh'"));
    }

    #[test]
    fn token_parsing() {
        let tokens = CommandTokens::parse("  $ /usr/bin/SUDO -u root -- /sbin/Reboot now").unwrap();
        assert_eq!(tokens.leading, "SUDO");
        assert_eq!(tokens.elevated.as_deref(), Some("Reboot"));
        assert_eq!(CommandTokens::parse("!!"), None);
    }
}
