//! The audit logger: in-memory ring plus a background JSON-Lines writer.
//!
//! Emitters never wait on disk. Each entry is pushed onto a bounded
//! in-memory FIFO and handed to a single drain worker through a bounded
//! channel. The worker appends batches under the write permit, which
//! exports also take, so an export never observes a half-written line.

use super::AuditError;
use super::entry::{AuditCategory, AuditEntry, AuditEventType, AuditResult};
use super::export::{ExportFormat, write_export};
use super::query::AuditQuery;
use crate::filter::DetectionStatistics;
use crate::validation::{CommandContext, CommandValidationResult, ValidationStatus};
use chrono::Utc;
use pairadmin_config::AuditConfig;
use pairadmin_core::CommandSource;
use serde::Serialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Maximum commands drained by the writer per batch.
const WRITE_BATCH: usize = 256;

enum WriterCommand {
    Append(Box<AuditEntry>),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

#[derive(Debug, Default)]
struct Counters {
    persisted: AtomicU64,
    dropped: AtomicU64,
    write_failures: AtomicU64,
}

/// Snapshot of logger health counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditStats {
    /// Entries currently held in memory
    pub resident_entries: usize,
    /// Entries appended to the log file
    pub persisted_entries: u64,
    /// Entries that never reached the writer (channel full or closed)
    pub dropped_entries: u64,
    /// Entries lost to serialization or disk errors
    pub write_failures: u64,
}

/// Durable, queryable audit trail.
///
/// Must be created inside a tokio runtime. Share it behind an `Arc`;
/// every method takes `&self`.
pub struct AuditLogger {
    session_id: Uuid,
    log_path: PathBuf,
    max_entries: usize,
    entries: Mutex<VecDeque<AuditEntry>>,
    sender: mpsc::Sender<WriterCommand>,
    write_permit: Arc<tokio::sync::Mutex<()>>,
    counters: Arc<Counters>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("session_id", &self.session_id)
            .field("log_path", &self.log_path)
            .field("entry_count", &self.entry_count())
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

impl AuditLogger {
    /// Create a logger and start its writer task on the current runtime.
    pub fn new(config: &AuditConfig) -> Result<Self, AuditError> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| AuditError::NoRuntime)?;

        let session_id = Uuid::new_v4();
        let log_path = config.resolved_log_path();
        let (sender, receiver) = mpsc::channel(config.channel_capacity);
        let write_permit = Arc::new(tokio::sync::Mutex::new(()));
        let counters = Arc::new(Counters::default());

        let worker = runtime.spawn(run_writer(
            log_path.clone(),
            receiver,
            write_permit.clone(),
            counters.clone(),
        ));

        info!(
            session = %session_id,
            path = %log_path.display(),
            max_entries = config.max_entries,
            "Audit logger started"
        );

        Ok(Self {
            session_id,
            log_path,
            max_entries: config.max_entries,
            entries: Mutex::new(VecDeque::new()),
            sender,
            write_permit,
            counters,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    fn lock_entries(&self) -> MutexGuard<'_, VecDeque<AuditEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stamp, retain and queue an entry for persistence. Returns its id.
    ///
    /// The timestamp and session id are overwritten with the enqueue time
    /// and this logger's session, so memory order, file order and
    /// timestamp order agree.
    pub fn record(&self, mut entry: AuditEntry) -> Uuid {
        let id = entry.id;
        let mut entries = self.lock_entries();

        entry.timestamp = Utc::now();
        entry.session_id = self.session_id;

        match self
            .sender
            .try_send(WriterCommand::Append(Box::new(entry.clone())))
        {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(id = %id, "Audit channel full, entry will not be persisted");
            }
            Err(TrySendError::Closed(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(id = %id, "Audit writer stopped, entry will not be persisted");
            }
        }

        entries.push_back(entry);
        while entries.len() > self.max_entries {
            entries.pop_front();
        }
        id
    }

    /// A command that ran (user) or was proposed (assistant).
    pub fn log_command(
        &self,
        command: &str,
        result: AuditResult,
        context: &CommandContext,
        duration_ms: u64,
    ) -> Uuid {
        let event_type = match context.source {
            CommandSource::User => AuditEventType::CommandExecuted,
            CommandSource::AiSuggestion => AuditEventType::CommandSuggested,
        };
        self.record(
            AuditEntry::new(event_type, AuditCategory::Command, result)
                .with_command(command)
                .with_user(context.user.as_deref())
                .with_duration_ms(duration_ms)
                .with_metadata("source", context.source.to_string())
                .with_metadata("privilege", context.privilege.to_string()),
        )
    }

    /// A security-relevant event such as a blocked command.
    pub fn log_security(
        &self,
        event_type: AuditEventType,
        result: AuditResult,
        details: &str,
        command: Option<&str>,
    ) -> Uuid {
        let mut entry =
            AuditEntry::new(event_type, AuditCategory::Security, result).with_details(details);
        if let Some(command) = command {
            entry = entry.with_command(command);
        }
        self.record(entry)
    }

    /// The verdict of a command validation.
    pub fn log_validation(
        &self,
        command: &str,
        validation: &CommandValidationResult,
        context: &CommandContext,
    ) -> Uuid {
        let (event_type, result) = match validation.status {
            ValidationStatus::Allowed => (AuditEventType::ValidationPassed, AuditResult::Success),
            ValidationStatus::Forbidden => (AuditEventType::ValidationFailed, AuditResult::Denied),
            ValidationStatus::RequiresConfirmation => {
                (AuditEventType::ConfirmationRequested, AuditResult::Pending)
            }
        };

        let mut entry = AuditEntry::new(event_type, AuditCategory::Validation, result)
            .with_command(command)
            .with_user(context.user.as_deref())
            .with_details(validation.reason.clone().unwrap_or_default())
            .with_metadata("status", validation.status.to_string())
            .with_metadata("source", context.source.to_string());
        if let Some(suggested) = &validation.suggested_command {
            entry = entry.with_metadata("suggested_command", suggested.as_str());
        }
        self.record(entry)
    }

    /// Detection or redaction of sensitive data. Only pattern names and
    /// counts are recorded, never the matched text.
    pub fn log_sensitive_data(
        &self,
        event_type: AuditEventType,
        statistics: &DetectionStatistics,
        origin: &str,
    ) -> Uuid {
        let patterns: Vec<&str> = statistics
            .detected_patterns
            .iter()
            .map(String::as_str)
            .collect();
        self.record(
            AuditEntry::new(event_type, AuditCategory::SensitiveData, AuditResult::Success)
                .with_details(format!(
                    "{} sensitive value(s) in {}",
                    statistics.detection_count, origin
                ))
                .with_metadata("origin", origin)
                .with_metadata("detection_count", statistics.detection_count as u64)
                .with_metadata("patterns", patterns),
        )
    }

    /// Lifecycle or configuration events of the application.
    pub fn log_application_event(&self, event_type: AuditEventType, details: &str) -> Uuid {
        self.record(
            AuditEntry::new(event_type, AuditCategory::Application, AuditResult::Success)
                .with_details(details),
        )
    }

    /// An error worth keeping in the trail.
    pub fn log_error(&self, details: &str, command: Option<&str>) -> Uuid {
        let mut entry = AuditEntry::new(
            AuditEventType::Error,
            AuditCategory::Error,
            AuditResult::Failure,
        )
        .with_details(details);
        if let Some(command) = command {
            entry = entry.with_command(command);
        }
        self.record(entry)
    }

    /// Seed memory with previously persisted entries without writing them
    /// again. Entries keep their own timestamps and session ids.
    pub fn restore(&self, restored: impl IntoIterator<Item = AuditEntry>) -> usize {
        let mut entries = self.lock_entries();
        let mut count = 0;
        for entry in restored {
            entries.push_back(entry);
            count += 1;
        }
        while entries.len() > self.max_entries {
            entries.pop_front();
        }
        debug!(restored = count, resident = entries.len(), "Audit entries restored");
        count
    }

    /// Matching in-memory entries, newest-first, paginated.
    pub fn query(&self, query: &AuditQuery) -> Vec<AuditEntry> {
        let matched: Vec<AuditEntry> = self
            .lock_entries()
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();
        query.sort_and_paginate(matched)
    }

    /// Every resident entry, oldest-first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.lock_entries().iter().cloned().collect()
    }

    /// Entries currently resident in memory (not the lifetime total).
    pub fn entry_count(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn stats(&self) -> AuditStats {
        AuditStats {
            resident_entries: self.entry_count(),
            persisted_entries: self.counters.persisted.load(Ordering::Relaxed),
            dropped_entries: self.counters.dropped.load(Ordering::Relaxed),
            write_failures: self.counters.write_failures.load(Ordering::Relaxed),
        }
    }

    /// Write the filtered (or full) resident set to `path`, oldest-first.
    ///
    /// Holds the write permit for the whole export. Returns the number of
    /// entries written.
    pub async fn export(
        &self,
        path: &Path,
        format: ExportFormat,
        query: Option<&AuditQuery>,
    ) -> Result<usize, AuditError> {
        let _permit = self.write_permit.lock().await;

        // Restored entries can be older than live ones, so memory order is
        // not timestamp order.
        let mut entries = match query {
            Some(query) => self.query(query),
            None => self.query(&AuditQuery::default()),
        };
        entries.reverse();

        write_export(path, format, &entries, self.session_id).await?;
        info!(
            path = %path.display(),
            format = %format,
            count = entries.len(),
            "Audit log exported"
        );
        Ok(entries.len())
    }

    /// Wait until everything queued before this call has been handled by
    /// the writer.
    pub async fn flush(&self) -> Result<(), AuditError> {
        let (ack, done) = oneshot::channel();
        self.sender
            .send(WriterCommand::Flush(ack))
            .await
            .map_err(|_| AuditError::WriterStopped)?;
        done.await.map_err(|_| AuditError::WriterStopped)
    }

    /// Drain queued entries and stop the writer. Later entries stay in
    /// memory but are not persisted. Calling this twice is a no-op.
    pub async fn shutdown(&self) -> Result<(), AuditError> {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(worker) = worker else {
            return Ok(());
        };

        if self.sender.send(WriterCommand::Shutdown).await.is_err() {
            debug!("Audit writer already stopped");
        }
        worker.await.map_err(|e| {
            error!(error = %e, "Audit writer task failed");
            AuditError::WriterStopped
        })?;

        info!(session = %self.session_id, stats = ?self.stats(), "Audit logger stopped");
        Ok(())
    }
}

async fn run_writer(
    path: PathBuf,
    mut receiver: mpsc::Receiver<WriterCommand>,
    write_permit: Arc<tokio::sync::Mutex<()>>,
    counters: Arc<Counters>,
) {
    let mut batch = Vec::with_capacity(WRITE_BATCH);
    let mut parent_ready = false;

    loop {
        if receiver.recv_many(&mut batch, WRITE_BATCH).await == 0 {
            break;
        }

        let mut lines = String::new();
        let mut pending = 0u64;
        let mut acks = Vec::new();
        let mut stop = false;

        for command in batch.drain(..) {
            match command {
                WriterCommand::Append(entry) => match serde_json::to_string(&entry) {
                    Ok(line) => {
                        lines.push_str(&line);
                        lines.push('\n');
                        pending += 1;
                    }
                    Err(e) => {
                        counters.write_failures.fetch_add(1, Ordering::Relaxed);
                        error!(id = %entry.id, error = %e, "Failed to serialize audit entry");
                    }
                },
                WriterCommand::Flush(ack) => acks.push(ack),
                WriterCommand::Shutdown => stop = true,
            }
        }

        if pending > 0 {
            let _permit = write_permit.lock().await;
            match append_lines(&path, &lines, &mut parent_ready).await {
                Ok(()) => {
                    counters.persisted.fetch_add(pending, Ordering::Relaxed);
                }
                Err(e) => {
                    counters.write_failures.fetch_add(pending, Ordering::Relaxed);
                    error!(
                        path = %path.display(),
                        error = %e,
                        dropped = pending,
                        "Failed to append audit entries"
                    );
                }
            }
        }

        for ack in acks {
            let _ = ack.send(());
        }
        if stop {
            break;
        }
    }

    // Anything queued behind Shutdown is not persisted. Closing first makes
    // later `try_send` calls fail, so every such entry is counted once.
    receiver.close();
    let mut abandoned = 0u64;
    while let Ok(command) = receiver.try_recv() {
        if let WriterCommand::Append(_) = command {
            abandoned += 1;
        }
    }
    if abandoned > 0 {
        counters.dropped.fetch_add(abandoned, Ordering::Relaxed);
        warn!(dropped = abandoned, "Audit entries queued after shutdown were not persisted");
    }

    debug!(path = %path.display(), "Audit writer finished");
}

async fn append_lines(path: &Path, lines: &str, parent_ready: &mut bool) -> std::io::Result<()> {
    if !*parent_ready {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        *parent_ready = true;
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(lines.as_bytes()).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditExport, read_log};
    use chrono::Duration;
    use pairadmin_core::PrivilegeLevel;
    use std::collections::BTreeSet;

    fn config(dir: &tempfile::TempDir, max_entries: usize, channel_capacity: usize) -> AuditConfig {
        AuditConfig {
            log_path: Some(dir.path().join("logs/audit.jsonl")),
            max_entries,
            channel_capacity,
        }
    }

    #[test]
    fn requires_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let err = AuditLogger::new(&config(&dir, 10, 10)).unwrap_err();
        assert!(matches!(err, AuditError::NoRuntime));
    }

    #[tokio::test]
    async fn rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = AuditLogger::new(&config(&dir, 0, 10)).unwrap_err();
        assert!(matches!(err, AuditError::Config(_)));
    }

    #[tokio::test]
    async fn entries_are_persisted_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(&config(&dir, 100, 16)).unwrap();
        let ctx = CommandContext::user().with_user("ops");

        logger.log_application_event(AuditEventType::SessionStarted, "session opened");
        let id = logger.log_command("uptime", AuditResult::Success, &ctx, 3);
        logger.flush().await.unwrap();

        let persisted = read_log(logger.log_path()).await.unwrap();
        assert_eq!(persisted.len(), 2);
        assert_eq!(persisted[1].id, id);
        assert_eq!(persisted[1].user.as_deref(), Some("ops"));
        assert!(persisted.iter().all(|e| e.session_id == logger.session_id()));
        assert_eq!(persisted, logger.entries());
        assert_eq!(logger.stats().persisted_entries, 2);
    }

    #[tokio::test]
    async fn emitters_set_taxonomy() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(&config(&dir, 100, 16)).unwrap();
        let ai = CommandContext::ai_suggestion().with_privilege(PrivilegeLevel::Elevated);

        logger.log_command("df -h", AuditResult::Pending, &ai, 0);
        logger.log_validation(
            "rm -rf /",
            &CommandValidationResult::forbidden("Recursive forced delete")
                .with_suggestion(Some("rm -ri /".into())),
            &ai,
        );
        logger.log_security(
            AuditEventType::CommandBlocked,
            AuditResult::Denied,
            "Recursive forced delete",
            Some("rm -rf /"),
        );
        logger.log_sensitive_data(
            AuditEventType::SensitiveDataFiltered,
            &DetectionStatistics {
                has_sensitive_data: true,
                detection_count: 2,
                detected_patterns: BTreeSet::from(["email_address".to_string()]),
            },
            "terminal_output",
        );
        logger.log_error("ssh connection lost", None);

        let entries = logger.entries();
        let kinds: Vec<_> = entries.iter().map(|e| (e.event_type, e.category, e.result)).collect();
        assert_eq!(
            kinds,
            vec![
                (AuditEventType::CommandSuggested, AuditCategory::Command, AuditResult::Pending),
                (AuditEventType::ValidationFailed, AuditCategory::Validation, AuditResult::Denied),
                (AuditEventType::CommandBlocked, AuditCategory::Security, AuditResult::Denied),
                (
                    AuditEventType::SensitiveDataFiltered,
                    AuditCategory::SensitiveData,
                    AuditResult::Success
                ),
                (AuditEventType::Error, AuditCategory::Error, AuditResult::Failure),
            ]
        );
        assert_eq!(entries[0].metadata["privilege"], "elevated");
        assert_eq!(entries[1].metadata["suggested_command"], "rm -ri /");
        assert_eq!(entries[3].metadata["patterns"], serde_json::json!(["email_address"]));
        logger.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn memory_cap_holds_under_concurrent_producers() {
        const PRODUCERS: usize = 8;
        const PER_PRODUCER: usize = 250;
        const CAP: usize = 300;

        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(
            AuditLogger::new(&config(&dir, CAP, PRODUCERS * PER_PRODUCER)).unwrap(),
        );

        let threads: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let logger = logger.clone();
                std::thread::spawn(move || {
                    let ctx = CommandContext::user();
                    for i in 0..PER_PRODUCER {
                        logger.log_command(&format!("echo {p}-{i}"), AuditResult::Success, &ctx, 0);
                        assert!(logger.entry_count() <= CAP);
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }
        logger.flush().await.unwrap();

        assert_eq!(logger.entry_count(), CAP);
        assert_eq!(logger.stats().dropped_entries, 0);

        let persisted = read_log(logger.log_path()).await.unwrap();
        assert_eq!(persisted.len(), PRODUCERS * PER_PRODUCER);

        // Resident entries are exactly the most recent CAP by timestamp.
        let resident = logger.entries();
        assert_eq!(resident, persisted[persisted.len() - CAP..]);
        assert!(resident.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        let oldest_resident = resident[0].timestamp;
        assert!(
            persisted[..persisted.len() - CAP]
                .iter()
                .all(|e| e.timestamp <= oldest_resident)
        );
    }

    #[tokio::test]
    async fn full_channel_drops_persistence_not_memory() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(&config(&dir, 100, 1)).unwrap();
        let ctx = CommandContext::user();

        // The current-thread runtime cannot run the writer until we yield.
        for i in 0..5 {
            logger.log_command(&format!("echo {i}"), AuditResult::Success, &ctx, 0);
        }
        assert_eq!(logger.entry_count(), 5);
        assert_eq!(logger.stats().dropped_entries, 4);

        logger.flush().await.unwrap();
        assert_eq!(read_log(logger.log_path()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn json_export_round_trips_query() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(&config(&dir, 100, 64)).unwrap();
        let ctx = CommandContext::user();
        for cmd in ["ls", "rm -rf /", "cat /etc/hosts", "rm notes"] {
            logger.log_command(cmd, AuditResult::Success, &ctx, 0);
        }

        let query = AuditQuery::new().command("rm");
        let out = dir.path().join("export/audit.json");
        let written = logger
            .export(&out, ExportFormat::Json, Some(&query))
            .await
            .unwrap();
        assert_eq!(written, 2);

        let doc: AuditExport =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        let mut queried = logger.query(&query);
        queried.reverse();
        assert_eq!(doc.count, queried.len());
        assert_eq!(doc.entries, queried);
        assert_eq!(doc.session_id, logger.session_id());
    }

    #[tokio::test]
    async fn query_by_time_range() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(&config(&dir, 100, 64)).unwrap();
        let ctx = CommandContext::user();

        let before = Utc::now() - Duration::seconds(1);
        logger.log_command("first", AuditResult::Success, &ctx, 0);
        let t0 = Utc::now();
        logger.log_command("second", AuditResult::Success, &ctx, 0);
        logger.log_command("third", AuditResult::Success, &ctx, 0);
        let t1 = Utc::now();
        logger.log_command("fourth", AuditResult::Success, &ctx, 0);

        let results = logger.query(&AuditQuery::new().between(t0, t1));
        assert!(results.iter().all(|e| t0 <= e.timestamp && e.timestamp <= t1));
        let commands: Vec<_> = results.iter().filter_map(|e| e.command.as_deref()).collect();
        assert!(commands.contains(&"second") && commands.contains(&"third"));
        assert!(results.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

        assert_eq!(logger.query(&AuditQuery::new().since(before)).len(), 4);
    }

    #[tokio::test]
    async fn restore_respects_cap_and_does_not_persist() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(&config(&dir, 3, 16)).unwrap();
        let old: Vec<AuditEntry> = (0..5)
            .map(|i| {
                AuditEntry::new(
                    AuditEventType::CommandExecuted,
                    AuditCategory::Command,
                    AuditResult::Success,
                )
                .with_command(format!("old {i}"))
            })
            .collect();

        assert_eq!(logger.restore(old.clone()), 5);
        assert_eq!(logger.entries(), old[2..]);

        logger.flush().await.unwrap();
        assert!(read_log(logger.log_path()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn shutdown_drains_and_stops_writer() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(&config(&dir, 100, 16)).unwrap();
        logger.log_application_event(AuditEventType::ApplicationStopped, "bye");
        logger.shutdown().await.unwrap();
        logger.shutdown().await.unwrap();

        assert_eq!(read_log(logger.log_path()).await.unwrap().len(), 1);
        assert!(matches!(logger.flush().await, Err(AuditError::WriterStopped)));

        logger.log_error("after shutdown", None);
        assert_eq!(logger.entry_count(), 2);
        assert_eq!(logger.stats().dropped_entries, 1);
    }

    #[tokio::test]
    async fn entries_queued_behind_shutdown_are_counted_as_dropped() {
        const QUEUED: usize = WRITE_BATCH + 44;

        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(&config(&dir, QUEUED, 1024)).unwrap();

        // The writer cannot run until we yield, so these all sit behind the
        // Shutdown command and more than one batch deep.
        logger.sender.send(WriterCommand::Shutdown).await.unwrap();
        for i in 0..QUEUED {
            logger.log_error(&format!("late {i}"), None);
        }
        logger.shutdown().await.unwrap();

        let stats = logger.stats();
        assert!(stats.dropped_entries > 0);
        assert_eq!(stats.persisted_entries + stats.dropped_entries, QUEUED as u64);
        let persisted = read_log(logger.log_path()).await.unwrap();
        assert_eq!(persisted.len() as u64, stats.persisted_entries);
        assert_eq!(logger.entry_count(), QUEUED);
    }

    #[tokio::test]
    async fn full_export_is_oldest_first_after_restore() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AuditLogger::new(&config(&dir, 100, 16)).unwrap();
        logger.log_command("live", AuditResult::Success, &CommandContext::user(), 0);

        let mut earlier = AuditEntry::new(
            AuditEventType::CommandExecuted,
            AuditCategory::Command,
            AuditResult::Success,
        )
        .with_command("restored");
        earlier.timestamp = Utc::now() - Duration::hours(1);
        logger.restore([earlier]);

        let out = dir.path().join("all.json");
        assert_eq!(logger.export(&out, ExportFormat::Json, None).await.unwrap(), 2);
        let doc: AuditExport =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        let commands: Vec<_> = doc.entries.iter().filter_map(|e| e.command.as_deref()).collect();
        assert_eq!(commands, vec!["restored", "live"]);
    }

    #[tokio::test]
    async fn write_failure_is_counted() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the log file should be makes every append fail.
        let path = dir.path().join("audit.jsonl");
        std::fs::create_dir_all(&path).unwrap();
        let logger = AuditLogger::new(&AuditConfig::with_path(&path)).unwrap();

        logger.log_error("cannot persist", None);
        logger.flush().await.unwrap();

        let stats = logger.stats();
        assert_eq!(stats.write_failures, 1);
        assert_eq!(stats.persisted_entries, 0);
        assert_eq!(stats.resident_entries, 1);
    }
}
