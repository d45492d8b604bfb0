//! Query parameters over audit entries.

use super::entry::{AuditCategory, AuditEntry, AuditEventType, AuditResult};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Filter, ordering and pagination for audit entries.
///
/// All filters are optional and combine with AND. Results are ordered
/// newest-first; `offset` and `limit` apply after filtering and sorting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditQuery {
    /// Inclusive lower bound
    pub start_time: Option<DateTime<Utc>>,
    /// Inclusive upper bound
    pub end_time: Option<DateTime<Utc>>,
    /// Empty means every event type
    pub event_types: HashSet<AuditEventType>,
    /// Case-insensitive substring of the entry's command
    pub command: Option<String>,
    pub category: Option<AuditCategory>,
    pub result: Option<AuditResult>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn since(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self
    }

    pub fn until(mut self, end: DateTime<Utc>) -> Self {
        self.end_time = Some(end);
        self
    }

    pub fn between(self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.since(start).until(end)
    }

    pub fn event_type(mut self, event_type: AuditEventType) -> Self {
        self.event_types.insert(event_type);
        self
    }

    pub fn command(mut self, needle: impl Into<String>) -> Self {
        self.command = Some(needle.into());
        self
    }

    pub fn category(mut self, category: AuditCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn result(mut self, result: AuditResult) -> Self {
        self.result = Some(result);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether an entry passes every filter.
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if self.start_time.is_some_and(|start| entry.timestamp < start) {
            return false;
        }
        if self.end_time.is_some_and(|end| entry.timestamp > end) {
            return false;
        }
        if !self.event_types.is_empty() && !self.event_types.contains(&entry.event_type) {
            return false;
        }
        if self.category.is_some_and(|c| c != entry.category) {
            return false;
        }
        if self.result.is_some_and(|r| r != entry.result) {
            return false;
        }
        if let Some(needle) = &self.command {
            let needle = needle.to_lowercase();
            match &entry.command {
                Some(command) if command.to_lowercase().contains(&needle) => {}
                _ => return false,
            }
        }
        true
    }

    /// Order already-filtered entries newest-first and apply pagination.
    ///
    /// `entries` must be in insertion order (oldest first); entries with
    /// equal timestamps keep the later-inserted one first.
    pub fn sort_and_paginate(&self, mut entries: Vec<AuditEntry>) -> Vec<AuditEntry> {
        entries.reverse();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }

    /// Filter, sort and paginate entries given in insertion order.
    pub fn apply(&self, entries: impl IntoIterator<Item = AuditEntry>) -> Vec<AuditEntry> {
        let matched = entries.into_iter().filter(|e| self.matches(e)).collect();
        self.sort_and_paginate(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry_at(
        seconds: i64,
        event_type: AuditEventType,
        category: AuditCategory,
        result: AuditResult,
        command: Option<&str>,
    ) -> AuditEntry {
        let base = DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut entry = AuditEntry::new(event_type, category, result);
        entry.timestamp = base + Duration::seconds(seconds);
        if let Some(command) = command {
            entry = entry.with_command(command);
        }
        entry
    }

    fn sample() -> Vec<AuditEntry> {
        use AuditCategory as C;
        use AuditEventType as E;
        use AuditResult as R;
        vec![
            entry_at(0, E::ApplicationStarted, C::Application, R::Success, None),
            entry_at(10, E::CommandExecuted, C::Command, R::Success, Some("ls -la")),
            entry_at(20, E::CommandBlocked, C::Security, R::Denied, Some("rm -rf /")),
            entry_at(30, E::ValidationFailed, C::Validation, R::Denied, Some("RM notes")),
            entry_at(40, E::CommandExecuted, C::Command, R::Failure, Some("cat missing")),
        ]
    }

    #[test]
    fn empty_query_returns_all_newest_first() {
        let results = AuditQuery::new().apply(sample());
        assert_eq!(results.len(), 5);
        assert!(results.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        assert_eq!(results[0].command.as_deref(), Some("cat missing"));
    }

    #[test]
    fn time_range_is_inclusive() {
        let entries = sample();
        let t0 = entries[1].timestamp;
        let t1 = entries[3].timestamp;
        let results = AuditQuery::new().between(t0, t1).apply(entries);
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|e| t0 <= e.timestamp && e.timestamp <= t1));
        assert_eq!(results[0].timestamp, t1);
        assert_eq!(results[2].timestamp, t0);
    }

    #[test]
    fn command_filter_is_case_insensitive_substring() {
        let results = AuditQuery::new().command("rm").apply(sample());
        assert_eq!(results.len(), 2);

        // Entries without a command never match a command filter.
        let results = AuditQuery::new().command("").apply(sample());
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn filters_combine() {
        let results = AuditQuery::new()
            .event_type(AuditEventType::CommandExecuted)
            .event_type(AuditEventType::CommandBlocked)
            .result(AuditResult::Success)
            .apply(sample());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].command.as_deref(), Some("ls -la"));

        let results = AuditQuery::new()
            .category(AuditCategory::Security)
            .apply(sample());
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn pagination_applies_after_sorting() {
        let page = AuditQuery::new().offset(1).limit(2).apply(sample());
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].command.as_deref(), Some("RM notes"));
        assert_eq!(page[1].command.as_deref(), Some("rm -rf /"));

        assert!(AuditQuery::new().offset(10).apply(sample()).is_empty());
        assert!(AuditQuery::new().limit(0).apply(sample()).is_empty());
    }

    #[test]
    fn equal_timestamps_keep_latest_insert_first() {
        let mut first = entry_at(5, AuditEventType::Error, AuditCategory::Error, AuditResult::Failure, Some("a"));
        let mut second = first.clone();
        second.command = Some("b".into());
        first.id = uuid::Uuid::new_v4();
        let results = AuditQuery::new().apply(vec![first, second]);
        assert_eq!(results[0].command.as_deref(), Some("b"));
    }
}
