//! The security pipeline: filter, validate, and audit in one place.
//!
//! Terminal and chat layers hand raw text here and get back text that is
//! safe to display or transmit, plus a verdict for command lines. Only
//! filtered text ever reaches the audit log.

use crate::audit::{AuditEventType, AuditLogger, AuditResult};
use crate::filter::SensitiveDataFilter;
use crate::validation::{CommandContext, CommandValidationResult, CommandValidationService, PolicyError};
use pairadmin_config::{AppConfig, SecurityPolicy};
use pairadmin_core::{TerminalEvent, TerminalEventKind};
use std::sync::Arc;
use tracing::{debug, info};

/// Filtered terminal text, plus a verdict when the event was a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedEvent {
    pub text: String,
    pub validation: Option<CommandValidationResult>,
}

/// Outcome of [`SecurityPipeline::check_command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCheck {
    /// The command with sensitive data redacted, safe to display
    pub filtered_command: String,
    pub result: CommandValidationResult,
}

/// Wires the filter and validator to the audit logger.
#[derive(Debug)]
pub struct SecurityPipeline {
    filter: SensitiveDataFilter,
    validator: CommandValidationService,
    logger: Arc<AuditLogger>,
}

impl SecurityPipeline {
    /// Assemble a pipeline. The policy is validated first.
    pub fn new(
        filter: SensitiveDataFilter,
        policy: SecurityPolicy,
        logger: Arc<AuditLogger>,
    ) -> Result<Self, PolicyError> {
        Ok(Self {
            filter,
            validator: CommandValidationService::new(policy)?,
            logger,
        })
    }

    /// Build the filter, validator, and a fresh audit logger from
    /// configuration. Must run inside a tokio runtime.
    pub fn from_config(config: &AppConfig) -> pairadmin_core::Result<Self> {
        let logger = Arc::new(AuditLogger::new(&config.audit)?);
        let filter = SensitiveDataFilter::from_config(&config.filter);
        let pipeline = Self::new(filter, config.security.clone(), logger)?;
        info!(
            mode = ?config.security.mode,
            patterns = pipeline.filter.patterns().len(),
            "Security pipeline ready"
        );
        Ok(pipeline)
    }

    pub fn filter(&self) -> &SensitiveDataFilter {
        &self.filter
    }

    /// Setup-time access for adding or toggling patterns.
    pub fn filter_mut(&mut self) -> &mut SensitiveDataFilter {
        &mut self.filter
    }

    pub fn validator(&self) -> &CommandValidationService {
        &self.validator
    }

    pub fn logger(&self) -> &Arc<AuditLogger> {
        &self.logger
    }

    pub fn policy(&self) -> &SecurityPolicy {
        self.validator.policy()
    }

    /// Replace the policy and record the change.
    pub fn set_policy(&mut self, policy: SecurityPolicy) -> Result<(), PolicyError> {
        let details = format!("Validation mode set to {:?}", policy.mode);
        self.validator.set_policy(policy)?;
        self.logger.log_security(
            AuditEventType::PolicyChanged,
            AuditResult::Success,
            &details,
            None,
        );
        Ok(())
    }

    /// Redact `text` when filtering is enabled, auditing what was found.
    fn redact(&self, text: &str, origin: &str) -> String {
        if !self.policy().filter_sensitive_data {
            return text.to_string();
        }
        let statistics = self.filter.statistics(text);
        if !statistics.has_sensitive_data {
            return text.to_string();
        }

        let filtered = self.filter.filter(text);
        self.logger.log_sensitive_data(
            AuditEventType::SensitiveDataFiltered,
            &statistics,
            origin,
        );
        debug!(origin, count = statistics.detection_count, "Sensitive data redacted");
        filtered
    }

    /// Filter a terminal event; command-like events are also validated.
    pub fn process_terminal_event(
        &self,
        event: &TerminalEvent,
        context: &CommandContext,
    ) -> ProcessedEvent {
        if event.is_command {
            let check = self.check_command(&event.text, context);
            return ProcessedEvent {
                text: check.filtered_command,
                validation: Some(check.result),
            };
        }

        let origin = match event.kind {
            TerminalEventKind::Output => "terminal_output",
            TerminalEventKind::Input => "terminal_input",
        };
        ProcessedEvent {
            text: self.redact(&event.text, origin),
            validation: None,
        }
    }

    /// Validate a command and audit the verdict.
    ///
    /// The verdict is computed on the raw command; everything recorded or
    /// returned for display is filtered.
    pub fn check_command(&self, command: &str, context: &CommandContext) -> CommandCheck {
        let mut result = self.validator.validate(command, context);
        let filtered_command = self.redact(command, "command");
        if self.policy().filter_sensitive_data {
            result.reason = self.filter.filter_optional(result.reason.as_deref());
            result.suggested_command = self.filter.filter_optional(result.suggested_command.as_deref());
        }

        self.logger.log_validation(&filtered_command, &result, context);
        if result.is_forbidden() {
            self.logger.log_security(
                AuditEventType::CommandBlocked,
                AuditResult::Denied,
                result.reason.as_deref().unwrap_or("Command blocked"),
                Some(&filtered_command),
            );
        }

        CommandCheck {
            filtered_command,
            result,
        }
    }

    /// Filter text before it is sent to an LLM provider.
    pub fn prepare_outbound(&self, text: &str) -> String {
        self.redact(text, "outbound_message")
    }
}
