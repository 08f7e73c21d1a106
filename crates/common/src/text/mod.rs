//! Keyword extraction and scoring
//!
//! Turns free text into ranked search terms:
//! - RAKE candidate phrases (local co-occurrence ranking)
//! - Term-frequency re-scoring over the whole input
//! - TF-IDF cosine similarity for topic comparison

mod rake;
pub mod stopwords;
mod weighting;

pub(crate) use rake::is_word_char;
pub use rake::{Rake, RankedPhrase};
pub use weighting::{term_frequencies, terms, tfidf_cosine};

use serde::{Deserialize, Serialize};

/// Scored search phrase. `phrase` is always lower-cased.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Keyword {
    pub phrase: String,
    pub score: f64,
}

/// Extracts ranked keywords from raw text. Stateless.
#[derive(Default)]
pub struct PhraseExtractor {
    rake: Rake,
}

impl PhraseExtractor {
    pub fn new() -> Self {
        Self { rake: Rake::new() }
    }

    /// Candidate phrases re-scored by the sum of their words' term
    /// frequencies, highest first. Equal scores keep RAKE rank order.
    pub fn extract(&self, text: &str) -> Vec<Keyword> {
        let tf = term_frequencies(text);

        let mut keywords: Vec<Keyword> = self
            .rake
            .ranked_phrases(text)
            .into_iter()
            .map(|phrase| {
                let score = phrase
                    .words
                    .iter()
                    .map(|w| tf.get(w).copied().unwrap_or(0.0))
                    .sum();
                Keyword {
                    phrase: phrase.text(),
                    score,
                }
            })
            .collect();

        keywords.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        keywords
    }

    /// Phrases only, in ranked order
    pub fn extract_phrases(&self, text: &str) -> Vec<String> {
        self.extract(text).into_iter().map(|k| k.phrase).collect()
    }
}
