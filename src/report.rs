//! Violation reporting types shared across validators and the walker.

use std::fmt;

/// The position of a feed in the SDShare hierarchy. Determines which
/// structural rules and outgoing link relations apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Overview,
    Collection,
    Fragments,
    Snapshots,
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeedKind::Overview => "overview feed",
            FeedKind::Collection => "collection feed",
            FeedKind::Fragments => "fragments feed",
            FeedKind::Snapshots => "snapshots feed",
        };
        f.write_str(name)
    }
}

/// A single conformance failure, attributed to the document it occurred in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub feed_kind: FeedKind,
    /// URI of the document (or probed resource) the failure belongs to.
    pub uri: String,
    pub detail: String,
}

impl Violation {
    pub fn new(feed_kind: FeedKind, uri: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            feed_kind,
            uri: uri.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.feed_kind, self.uri, self.detail)
    }
}

/// Outcome of one crawl: every violation found, plus degenerate cases that
/// are worth surfacing but not fatal (empty feeds, zero snapshot links).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    pub violations: Vec<Violation>,
    pub warnings: Vec<String>,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn push(&mut self, violation: Violation) {
        tracing::debug!(uri = %violation.uri, detail = %violation.detail, "violation recorded");
        self.violations.push(violation);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn extend(&mut self, violations: impl IntoIterator<Item = Violation>) {
        for v in violations {
            self.push(v);
        }
    }

    /// Folds the findings for one document into the crawl-wide report.
    pub fn merge(&mut self, other: Report) {
        self.violations.extend(other.violations);
        self.warnings.extend(other.warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_display_names_kind_and_uri() {
        let v = Violation::new(
            FeedKind::Collection,
            "http://example.org/coll1",
            "expected exactly one fragmentsfeed link, got 0",
        );
        assert_eq!(
            v.to_string(),
            "[collection feed] http://example.org/coll1: expected exactly one fragmentsfeed link, got 0"
        );
    }

    #[test]
    fn test_report_clean_until_violation() {
        let mut report = Report::default();
        assert!(report.is_clean());
        report.warn("no entries found");
        assert!(report.is_clean());
        report.push(Violation::new(FeedKind::Overview, "http://x", "missing atom:id"));
        assert!(!report.is_clean());
    }

    #[test]
    fn test_merge_carries_both_lists() {
        let mut a = Report::default();
        let mut b = Report::default();
        b.push(Violation::new(FeedKind::Fragments, "http://x", "bad"));
        b.warn("empty feed");
        a.merge(b);
        assert_eq!(a.violations.len(), 1);
        assert_eq!(a.warnings.len(), 1);
    }
}
