//! Sensitive-data filter: redacts secrets before text leaves the process.
//!
//! Patterns run in registration order. Each pattern rewrites all of its
//! matches in one pass, and the next pattern scans the already-redacted
//! text, so an earlier pattern can hide a match from a later one.

use crate::pattern::{KeywordPattern, Pattern, PatternError, RegexPattern, default_patterns};
use pairadmin_config::{FilterConfig, PatternConfig, PatternKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Range;
use tracing::{debug, warn};

/// What the filter found in a piece of text.
///
/// A pure function of the input text and the enabled pattern set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionStatistics {
    pub has_sensitive_data: bool,
    pub detection_count: usize,
    pub detected_patterns: BTreeSet<String>,
}

/// A single match reported by [`SensitiveDataFilter::find_matches`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub pattern: String,
    pub range: Range<usize>,
}

/// Applies an ordered list of patterns to text.
///
/// Read-only evaluation needs no locking; mutate the pattern list only
/// during setup.
#[derive(Debug, Clone)]
pub struct SensitiveDataFilter {
    patterns: Vec<Pattern>,
}

impl Default for SensitiveDataFilter {
    fn default() -> Self {
        Self::new(default_patterns())
    }
}

impl SensitiveDataFilter {
    /// Create a filter with the given patterns, in order.
    pub fn new(patterns: Vec<Pattern>) -> Self {
        Self { patterns }
    }

    /// Build a filter from configuration.
    ///
    /// Custom patterns that fail to compile are logged and skipped.
    pub fn from_config(config: &FilterConfig) -> Self {
        let mut patterns = if config.use_default_patterns {
            default_patterns()
        } else {
            Vec::new()
        };

        for pattern in &mut patterns {
            if config.disabled_patterns.iter().any(|n| n == pattern.name()) {
                pattern.set_enabled(false);
            }
        }

        for custom in &config.patterns {
            match build_pattern(custom) {
                Ok(p) => patterns.push(p),
                Err(e) => warn!(error = %e, "Skipping invalid filter pattern"),
            }
        }

        debug!(count = patterns.len(), "Sensitive data filter configured");
        Self { patterns }
    }

    /// Append a pattern; it runs after every pattern already registered.
    pub fn add_pattern(&mut self, pattern: impl Into<Pattern>) {
        self.patterns.push(pattern.into());
    }

    /// Enable or disable a pattern by name. Returns `false` if not found.
    pub fn set_pattern_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.patterns.iter_mut().find(|p| p.name() == name) {
            Some(p) => {
                p.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    fn enabled(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter().filter(|p| p.enabled())
    }

    /// Redact every enabled pattern's matches, in registration order.
    pub fn filter(&self, text: &str) -> String {
        let mut filtered = text.to_string();
        for pattern in self.enabled() {
            if pattern.is_match(&filtered) {
                filtered = pattern.redact(&filtered);
                debug!(pattern = pattern.name(), "Redacted sensitive data");
            }
        }
        filtered
    }

    /// [`filter`](Self::filter) for optional text: `None` stays `None`.
    pub fn filter_optional(&self, text: Option<&str>) -> Option<String> {
        text.map(|t| self.filter(t))
    }

    /// Whether any enabled pattern matches. Stops at the first match.
    pub fn contains_sensitive_data(&self, text: &str) -> bool {
        !text.is_empty() && self.enabled().any(|p| p.is_match(text))
    }

    /// Count matches of every enabled pattern against the original text.
    pub fn statistics(&self, text: &str) -> DetectionStatistics {
        let mut stats = DetectionStatistics::default();
        for pattern in self.enabled() {
            let count = pattern.count_matches(text);
            if count > 0 {
                stats.detection_count += count;
                stats.detected_patterns.insert(pattern.name().to_string());
            }
        }
        stats.has_sensitive_data = stats.detection_count > 0;
        stats
    }

    /// Every match of every enabled pattern against the original text.
    pub fn find_matches(&self, text: &str) -> Vec<PatternMatch> {
        self.enabled()
            .flat_map(|p| {
                p.find_matches(text).into_iter().map(move |range| PatternMatch {
                    pattern: p.name().to_string(),
                    range,
                })
            })
            .collect()
    }
}

fn build_pattern(config: &PatternConfig) -> Result<Pattern, PatternError> {
    let mut pattern: Pattern = match config.kind {
        PatternKind::Regex => {
            let mut p = RegexPattern::new(&config.name, &config.value)?
                .strategy(config.strategy)
                .preserve_length(config.preserve_length);
            if let Some(placeholder) = &config.placeholder {
                p = p.placeholder(placeholder);
            }
            p.into()
        }
        PatternKind::Keyword => {
            let mut p = KeywordPattern::new(&config.name, &config.value)?
                .method(config.strategy)
                .preserve_length(config.preserve_length);
            if let Some(placeholder) = &config.placeholder {
                p = p.placeholder(placeholder);
            }
            p.into()
        }
    };
    pattern.set_enabled(config.enabled);
    Ok(pattern)
}
