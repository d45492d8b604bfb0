//! Security core for PairAdmin: redaction, command authorization, and audit.
//!
//! Provides:
//! - **Patterns**: Regex and keyword detectors with mask/remove/hash/placeholder redaction
//! - **Filter**: Ordered application of patterns to terminal and chat text
//! - **Validation**: Blacklist/whitelist command policy with privilege checks
//! - **Dangerous commands**: Policy-independent detection of destructive idioms
//! - **Audit logging**: Bounded in-memory history persisted as JSON Lines
//! - **Pipeline**: The filter → validate → audit data flow in one type

pub mod audit;
pub mod dangerous;
pub mod filter;
pub mod pattern;
pub mod pipeline;
pub mod validation;

pub use audit::{
    AuditCategory, AuditEntry, AuditError, AuditEventType, AuditLogger, AuditQuery, AuditResult,
    AuditStats, ExportFormat, read_log,
};
pub use dangerous::{DangerousCheck, DangerousCommandValidator};
pub use filter::{DetectionStatistics, PatternMatch, SensitiveDataFilter};
pub use pattern::{KeywordPattern, Pattern, PatternError, RegexPattern, default_patterns};
pub use pipeline::{CommandCheck, ProcessedEvent, SecurityPipeline};
pub use validation::{
    CommandContext, CommandValidationResult, CommandValidationService, PolicyError,
    ValidationStatus,
};
