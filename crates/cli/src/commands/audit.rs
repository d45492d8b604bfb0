//! `pairadmin audit`: Query or export the audit log.
//!
//! The log file is loaded into a fresh logger (the most recent
//! `audit.max_entries` entries) and queried the same way a running
//! session would be.

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use pairadmin_config::AppConfig;
use pairadmin_security::{
    AuditCategory, AuditEventType, AuditLogger, AuditQuery, AuditResult, ExportFormat, read_log,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Subcommand)]
pub enum AuditAction {
    /// Print matching entries, newest first
    Query {
        #[command(flatten)]
        filters: QueryArgs,

        /// Print entries as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Write matching entries to a file, oldest first
    Export {
        /// json, csv, or text
        #[arg(short, long)]
        format: ExportFormat,

        /// Destination file
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        filters: QueryArgs,
    },
}

#[derive(Args, Debug, Default)]
pub struct QueryArgs {
    /// Only entries at or after this RFC 3339 timestamp
    #[arg(long)]
    since: Option<DateTime<Utc>>,

    /// Only entries at or before this RFC 3339 timestamp
    #[arg(long)]
    until: Option<DateTime<Utc>>,

    /// Event type to include (repeatable)
    #[arg(long = "event-type")]
    event_types: Vec<AuditEventType>,

    #[arg(long)]
    category: Option<AuditCategory>,

    #[arg(long)]
    result: Option<AuditResult>,

    /// Case-insensitive substring of the command
    #[arg(long)]
    command: Option<String>,

    #[arg(long, default_value_t = 0)]
    offset: usize,

    #[arg(long)]
    limit: Option<usize>,
}

impl QueryArgs {
    fn to_query(&self) -> AuditQuery {
        let mut query = AuditQuery::new().offset(self.offset);
        if let Some(since) = self.since {
            query = query.since(since);
        }
        if let Some(until) = self.until {
            query = query.until(until);
        }
        for event_type in &self.event_types {
            query = query.event_type(*event_type);
        }
        if let Some(category) = self.category {
            query = query.category(category);
        }
        if let Some(result) = self.result {
            query = query.result(result);
        }
        if let Some(command) = &self.command {
            query = query.command(command.clone());
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        query
    }
}

pub async fn run(config: &AppConfig, action: AuditAction) -> anyhow::Result<ExitCode> {
    let logger = AuditLogger::new(&config.audit)?;
    let persisted = read_log(logger.log_path()).await?;
    let restored = logger.restore(persisted);
    tracing::debug!(
        path = %logger.log_path().display(),
        restored,
        resident = logger.entry_count(),
        "Audit log loaded"
    );

    match action {
        AuditAction::Query { filters, json } => {
            let entries = logger.query(&filters.to_query());
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No matching audit entries in {}", logger.log_path().display());
            } else {
                for entry in &entries {
                    println!("{}", entry.summary());
                    if !entry.details.is_empty() {
                        println!("    {}", entry.details);
                    }
                }
                println!("\n{} entries", entries.len());
            }
        }
        AuditAction::Export {
            format,
            output,
            filters,
        } => {
            let query = filters.to_query();
            let query = (query != AuditQuery::default()).then_some(&query);
            let count = logger.export(&output, format, query).await?;
            println!("✅ Exported {count} entries to {} ({format})", output.display());
        }
    }

    logger.shutdown().await?;
    Ok(ExitCode::SUCCESS)
}
