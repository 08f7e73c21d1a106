//! Corpus Source Client - fuzzy title search over a local CSV of
//! publication titles and links

use super::{Provenance, SourceHit};
use crate::errors::{AppError, Result};
use crate::text::is_word_char;
use serde::{Deserialize, Serialize};
use similar::TextDiff;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// One corpus row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorpusEntry {
    pub title: String,
    pub link: String,
}

/// Corpus row matched by at least one keyword
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorpusHit {
    pub title: String,
    pub link: String,
    /// Number of keywords matching the title, `1..=keywords.len()`
    pub match_score: u32,
}

impl SourceHit for CorpusHit {
    type Score = u32;

    fn provenance(&self) -> Provenance {
        Provenance::Corpus
    }

    fn id(&self) -> &str {
        &self.link
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn locator(&self) -> &str {
        &self.link
    }

    fn score(&self) -> u32 {
        self.match_score
    }
}

/// Title/link corpus loaded once from CSV
#[derive(Debug, Clone)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
    fuzzy_threshold: f32,
}

impl Corpus {
    /// Load a corpus file. Missing `Title`/`Link` headers are a configuration error.
    pub fn from_path(path: impl AsRef<Path>, fuzzy_threshold: f32) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| AppError::Configuration {
            message: format!("Cannot open corpus file {}: {}", path.display(), e),
        })?;
        let corpus = Self::from_reader(file, fuzzy_threshold)?;
        info!(path = %path.display(), entries = corpus.len(), "Corpus loaded");
        Ok(corpus)
    }

    /// Parse CSV with case-insensitive `Title` and `Link` headers
    pub fn from_reader<R: Read>(reader: R, fuzzy_threshold: f32) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect();
        let column = |name: &str| normalized.iter().position(|h| h == name);

        let (title_col, link_col) = match (column("title"), column("link")) {
            (Some(t), Some(l)) => (t, l),
            _ => return Err(AppError::CorpusHeaders { found: headers }),
        };

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record?;
            entries.push(CorpusEntry {
                title: record.get(title_col).unwrap_or_default().trim().to_string(),
                link: record.get(link_col).unwrap_or_default().trim().to_string(),
            });
        }

        Ok(Self {
            entries,
            fuzzy_threshold,
        })
    }

    pub fn from_entries(entries: Vec<CorpusEntry>, fuzzy_threshold: f32) -> Self {
        Self {
            entries,
            fuzzy_threshold,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Score every title against the keywords; highest score first,
    /// then title ascending, truncated to `max_results`.
    pub fn search(&self, keywords: &[String], max_results: usize) -> Vec<CorpusHit> {
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

        let mut hits: Vec<CorpusHit> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let match_score = self.match_score(&entry.title, &keywords);
                (match_score > 0).then(|| CorpusHit {
                    title: entry.title.clone(),
                    link: entry.link.clone(),
                    match_score,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.match_score
                .cmp(&a.match_score)
                .then_with(|| a.title.cmp(&b.title))
        });
        hits.truncate(max_results);
        hits
    }

    /// One point per keyword that is a substring of the title or close
    /// enough to one of its words
    fn match_score(&self, title: &str, keywords: &[String]) -> u32 {
        let title_lower = title.to_lowercase();
        let words: Vec<&str> = title_lower
            .split(|c: char| !is_word_char(c))
            .filter(|w| !w.is_empty())
            .collect();

        keywords
            .iter()
            .filter(|kw| {
                title_lower.contains(kw.as_str())
                    || words
                        .iter()
                        .map(|w| similarity_ratio(kw, w))
                        .fold(0.0f32, f32::max)
                        > self.fuzzy_threshold
            })
            .count() as u32
    }
}

/// Edit-based similarity in `[0, 1]`: `2 * matches / (len(a) + len(b))`
fn similarity_ratio(a: &str, b: &str) -> f32 {
    TextDiff::from_chars(a, b).ratio()
}
