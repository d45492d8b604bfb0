//! Tolerant reader for JSON-Lines audit logs.
//!
//! A crash can leave a partially written final line, possibly cut inside a
//! multi-byte character. The log is read as bytes and each line decoded on
//! its own; blank and corrupt lines are skipped with a warning instead of
//! failing the whole read.

use super::AuditError;
use super::entry::AuditEntry;
use std::path::Path;
use tracing::{debug, warn};

/// Parse JSON-Lines content, skipping blank and unparseable lines.
pub fn parse_log(content: &[u8]) -> Vec<AuditEntry> {
    content
        .split(|&byte| byte == b'\n')
        .enumerate()
        .map(|(index, line)| (index, line.trim_ascii()))
        .filter(|(_, line)| !line.is_empty())
        .filter_map(|(index, line)| match serde_json::from_slice(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(line = index + 1, error = %e, "Skipping corrupt audit log line");
                None
            }
        })
        .collect()
}

/// Read an audit log file. A missing file yields no entries.
pub async fn read_log(path: &Path) -> Result<Vec<AuditEntry>, AuditError> {
    let content = match tokio::fs::read(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Audit log does not exist yet");
            return Ok(Vec::new());
        }
        Err(source) => return Err(AuditError::io(path, source)),
    };

    let entries = parse_log(&content);
    debug!(path = %path.display(), count = entries.len(), "Audit log read");
    Ok(entries)
}
