//! Rendering audit entries as JSON, CSV, or plain text.

use super::AuditError;
use super::entry::AuditEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

/// Export file format, chosen explicitly by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Text,
}

impl ExportFormat {
    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Text => "txt",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Text => write!(f, "text"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = super::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "text" | "txt" => Ok(ExportFormat::Text),
            _ => Err(super::ParseEnumError {
                kind: "export format",
                value: s.to_string(),
            }),
        }
    }
}

/// The single JSON document written by a JSON export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditExport {
    pub exported_at: DateTime<Utc>,
    pub session_id: Uuid,
    pub count: usize,
    pub entries: Vec<AuditEntry>,
}

const CSV_HEADER: [&str; 12] = [
    "id",
    "timestamp",
    "event_type",
    "category",
    "result",
    "command",
    "user",
    "details",
    "duration_ms",
    "session_id",
    "ip_address",
    "metadata",
];

/// Render entries (already in export order) to bytes.
pub fn render(
    entries: &[AuditEntry],
    format: ExportFormat,
    session_id: Uuid,
) -> Result<Vec<u8>, AuditError> {
    match format {
        ExportFormat::Json => render_json(entries, session_id),
        ExportFormat::Csv => render_csv(entries),
        ExportFormat::Text => Ok(render_text(entries, session_id).into_bytes()),
    }
}

fn render_json(entries: &[AuditEntry], session_id: Uuid) -> Result<Vec<u8>, AuditError> {
    let document = AuditExport {
        exported_at: Utc::now(),
        session_id,
        count: entries.len(),
        entries: entries.to_vec(),
    };
    Ok(serde_json::to_vec_pretty(&document)?)
}

fn render_csv(entries: &[AuditEntry]) -> Result<Vec<u8>, AuditError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for entry in entries {
        let metadata = if entry.metadata.is_empty() {
            String::new()
        } else {
            serde_json::to_string(&entry.metadata)?
        };
        writer.write_record([
            entry.id.to_string(),
            entry.timestamp.to_rfc3339(),
            entry.event_type.to_string(),
            entry.category.to_string(),
            entry.result.to_string(),
            entry.command.clone().unwrap_or_default(),
            entry.user.clone().unwrap_or_default(),
            entry.details.clone(),
            entry.duration_ms.to_string(),
            entry.session_id.to_string(),
            entry.ip_address.clone().unwrap_or_default(),
            metadata,
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| AuditError::Csv(csv::Error::from(e.into_error())))
}

fn render_text(entries: &[AuditEntry], session_id: Uuid) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "PairAdmin audit export: {} entries (session {}, exported {})",
        entries.len(),
        session_id,
        Utc::now().to_rfc3339()
    );

    for entry in entries {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", entry.summary());
        if let Some(user) = &entry.user {
            let _ = writeln!(out, "    user: {user}");
        }
        if !entry.details.is_empty() {
            let _ = writeln!(out, "    details: {}", entry.details);
        }
        if entry.duration_ms > 0 {
            let _ = writeln!(out, "    duration: {} ms", entry.duration_ms);
        }
        if let Some(ip) = &entry.ip_address {
            let _ = writeln!(out, "    ip address: {ip}");
        }
        for (key, value) in &entry.metadata {
            let _ = writeln!(out, "    {key}: {value}");
        }
        let _ = writeln!(out, "    id: {}", entry.id);
    }
    out
}

/// Render and write an export file, creating parent directories.
pub async fn write_export(
    path: &Path,
    format: ExportFormat,
    entries: &[AuditEntry],
    session_id: Uuid,
) -> Result<(), AuditError> {
    let bytes = render(entries, format, session_id)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| AuditError::io(parent, source))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| AuditError::io(path, source))
}
