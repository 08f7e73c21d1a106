//! Source Ledger
//!
//! Deduplicates corpus sources across turns and records an append-only
//! log of discovery events. Publication is delegated to a [`ReportSink`].

mod report;

pub use report::{escape_html, HtmlReportRenderer};

use crate::config::LedgerConfig;
use crate::errors::Result;
use crate::metrics;
use crate::sources::SourceRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};
use uuid::Uuid;

/// A source seen for the first time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceDiscovered {
    pub id: Uuid,
    pub title: String,
    pub link: String,
    pub discovered_at: DateTime<Utc>,
}

impl SourceDiscovered {
    pub fn new(source: &SourceRef) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: source.title.clone(),
            link: source.link.clone(),
            discovered_at: Utc::now(),
        }
    }
}

/// Destination for discovery events
pub trait ReportSink: Send + Sync {
    fn publish(&self, event: &SourceDiscovered) -> Result<()>;
}

/// Sink that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn publish(&self, _event: &SourceDiscovered) -> Result<()> {
        Ok(())
    }
}

/// Known-source set plus discovery log
pub struct SourceLedger {
    known: HashSet<String>,
    events: Vec<SourceDiscovered>,
    sink: Box<dyn ReportSink>,
}

impl SourceLedger {
    pub fn new(sink: Box<dyn ReportSink>) -> Self {
        Self {
            known: HashSet::new(),
            events: Vec::new(),
            sink,
        }
    }

    /// HTML report when a report path is configured, otherwise no publication
    pub fn from_config(config: &LedgerConfig) -> Self {
        let sink: Box<dyn ReportSink> = match &config.report_path {
            Some(path) => Box::new(HtmlReportRenderer::new(path, &config.marker)),
            None => Box::new(NullSink),
        };
        Self::new(sink)
    }

    /// Keep only candidates whose link has not been seen, in input order.
    ///
    /// Every new source is logged and published; a failed publication is
    /// logged and does not affect deduplication.
    pub fn add_sources(&mut self, candidates: &[SourceRef]) -> Vec<SourceRef> {
        let mut added = Vec::new();

        for candidate in candidates {
            if !self.known.insert(candidate.link.clone()) {
                continue;
            }

            let event = SourceDiscovered::new(candidate);
            if let Err(e) = self.sink.publish(&event) {
                warn!(link = %event.link, error = %e, "Source report not published");
            }
            self.events.push(event);
            added.push(candidate.clone());
        }

        debug!(
            candidates = candidates.len(),
            added = added.len(),
            known = self.known.len(),
            "Ledger updated"
        );
        metrics::record_sources_published(added.len());
        added
    }

    /// Forget known sources. The event log is kept.
    pub fn clear(&mut self) {
        self.known.clear();
    }

    pub fn events(&self) -> &[SourceDiscovered] {
        &self.events
    }

    pub fn known_len(&self) -> usize {
        self.known.len()
    }

    pub fn is_known(&self, link: &str) -> bool {
        self.known.contains(link)
    }
}

impl Default for SourceLedger {
    fn default() -> Self {
        Self::new(Box::new(NullSink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingSink {
        published: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl ReportSink for RecordingSink {
        fn publish(&self, event: &SourceDiscovered) -> Result<()> {
            if self.fail {
                return Err(AppError::Report {
                    message: "marker missing".into(),
                });
            }
            self.published.lock().unwrap().push(event.link.clone());
            Ok(())
        }
    }

    fn source(title: &str, link: &str) -> SourceRef {
        SourceRef {
            title: title.into(),
            link: link.into(),
        }
    }

    #[test]
    fn test_add_sources_is_idempotent() {
        let sink = RecordingSink::default();
        let mut ledger = SourceLedger::new(Box::new(sink.clone()));
        let batch = vec![source("A", "https://x/PMC1"), source("B", "https://x/PMC2")];

        assert_eq!(ledger.add_sources(&batch), batch);
        assert!(ledger.add_sources(&batch).is_empty());
        assert_eq!(ledger.known_len(), 2);
        assert_eq!(*sink.published.lock().unwrap(), vec!["https://x/PMC1", "https://x/PMC2"]);
    }

    #[test]
    fn test_duplicates_within_batch() {
        let mut ledger = SourceLedger::default();
        let added = ledger.add_sources(&[
            source("A", "https://x/PMC1"),
            source("A again", "https://x/PMC1"),
        ]);
        assert_eq!(added, vec![source("A", "https://x/PMC1")]);
        assert_eq!(ledger.events().len(), 1);
    }

    #[test]
    fn test_clear_allows_rediscovery() {
        let mut ledger = SourceLedger::default();
        let batch = vec![source("A", "https://x/PMC1")];
        ledger.add_sources(&batch);
        ledger.clear();

        assert_eq!(ledger.known_len(), 0);
        assert_eq!(ledger.add_sources(&batch), batch);
        assert_eq!(ledger.events().len(), 2);
        assert_ne!(ledger.events()[0].id, ledger.events()[1].id);
    }

    #[test]
    fn test_failed_publication_still_dedups() {
        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let mut ledger = SourceLedger::new(Box::new(sink));
        let batch = vec![source("A", "https://x/PMC1")];

        assert_eq!(ledger.add_sources(&batch).len(), 1);
        assert!(ledger.is_known("https://x/PMC1"));
        assert!(ledger.add_sources(&batch).is_empty());
    }

    #[test]
    fn test_from_config_without_report() {
        let mut ledger = SourceLedger::from_config(&LedgerConfig::default());
        assert_eq!(ledger.add_sources(&[source("A", "https://x/PMC1")]).len(), 1);
    }
}
