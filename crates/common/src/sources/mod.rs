//! Literature sources
//!
//! Two provenances with independent scoring:
//! - Local title/link corpus (integer keyword match score)
//! - Remote study index (native relevance score)
//!
//! plus the literature client that resolves corpus links to metadata and
//! full-text sections.

mod corpus;
mod literature;
mod study_index;
mod xml;

pub use corpus::{Corpus, CorpusEntry, CorpusHit};
pub use literature::{extract_pmcid, LiteratureSource, PaperMetadata, PmcClient};
pub use study_index::{OsdrClient, StudyHit, StudyIndex, StudyQuery};
pub use xml::{find_section, XmlElement, XmlNode};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which source produced a hit. Scores are never compared across provenances.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Corpus,
    StudyIndex,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Corpus => "corpus",
            Provenance::StudyIndex => "study_index",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized view shared by every hit type
pub trait SourceHit {
    /// Native score type of this provenance
    type Score: PartialOrd + Copy;

    fn provenance(&self) -> Provenance;
    fn id(&self) -> &str;
    fn title(&self) -> &str;
    /// Link or accession identifying the source
    fn locator(&self) -> &str;
    fn score(&self) -> Self::Score;
}

/// Hits attaining the batch's maximum score, in their original order.
/// Ties are all kept; an empty batch selects nothing.
pub fn select_top<H: SourceHit + Clone>(hits: &[H]) -> Vec<H> {
    let Some(max) = hits.iter().map(|h| h.score()).reduce(|a, b| if b > a { b } else { a }) else {
        return Vec::new();
    };
    hits.iter().filter(|h| h.score() == max).cloned().collect()
}

/// Title and link of a corpus source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SourceRef {
    pub title: String,
    pub link: String,
}

/// Result of looking up a named section of a paper
#[derive(Debug, Clone, PartialEq)]
pub enum SectionOutcome {
    Found(String),
    NotFound,
    /// The source could not be reached or its document could not be read
    Unavailable(String),
}

impl SectionOutcome {
    pub fn found(&self) -> Option<&str> {
        match self {
            SectionOutcome::Found(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, SectionOutcome::Found(_))
    }

    /// Plain-text rendering for callers that want a string in every case
    pub fn sentinel(&self, section: &str) -> String {
        match self {
            SectionOutcome::Found(text) => text.clone(),
            SectionOutcome::NotFound => {
                format!("No section found with heading matching or similar to '{}'.", section)
            }
            SectionOutcome::Unavailable(reason) => {
                format!("Section '{}' unavailable: {}", section, reason)
            }
        }
    }
}
