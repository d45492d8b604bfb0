//! Audit logging: structured, persisted, queryable security events.
//!
//! - [`AuditEntry`] and its taxonomy ([`AuditEventType`], [`AuditCategory`], [`AuditResult`])
//! - [`AuditLogger`]: bounded in-memory history plus an append-only JSON-Lines file
//! - [`AuditQuery`]: filtering and pagination shared by queries and exports
//! - [`ExportFormat`]: JSON, CSV, and plain-text exports
//! - [`read_log`]: tolerant reader for existing log files

mod entry;
mod export;
mod logger;
mod query;
mod reader;

pub use entry::{AuditCategory, AuditEntry, AuditEventType, AuditResult, ParseEnumError};
pub use export::{AuditExport, ExportFormat, render, write_export};
pub use logger::{AuditLogger, AuditStats};
pub use query::AuditQuery;
pub use reader::{parse_log, read_log};

use pairadmin_config::ConfigError;
use std::path::{Path, PathBuf};

/// Audit errors.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Invalid audit configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Audit logger must be created inside a tokio runtime")]
    NoRuntime,

    #[error("Audit I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Audit serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Audit writer is not running")]
    WriterStopped,
}

impl AuditError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        AuditError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<AuditError> for pairadmin_core::Error {
    fn from(err: AuditError) -> Self {
        pairadmin_core::Error::Audit(err.to_string())
    }
}
