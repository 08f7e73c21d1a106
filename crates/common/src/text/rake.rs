//! RAKE candidate phrase extraction
//!
//! Splits text into candidate phrases at stopwords and punctuation, then
//! ranks each phrase by the sum of its words' degree/frequency ratios.

use super::stopwords::PHRASE_DELIMITERS;
use std::collections::{HashMap, HashSet};

/// Phrase ranked by co-occurrence degree
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPhrase {
    pub words: Vec<String>,
    pub score: f64,
}

impl RankedPhrase {
    pub fn text(&self) -> String {
        self.words.join(" ")
    }
}

/// Rapid automatic keyword extraction
pub struct Rake {
    delimiters: HashSet<&'static str>,
}

impl Default for Rake {
    fn default() -> Self {
        Self::new()
    }
}

impl Rake {
    pub fn new() -> Self {
        Self {
            delimiters: PHRASE_DELIMITERS.iter().copied().collect(),
        }
    }

    /// Ranked distinct phrases, highest score first, ties by phrase text
    /// in reverse lexical order
    pub fn ranked_phrases(&self, text: &str) -> Vec<RankedPhrase> {
        let phrases = self.candidate_phrases(text);

        let mut frequency: HashMap<&str, f64> = HashMap::new();
        let mut degree: HashMap<&str, f64> = HashMap::new();
        for phrase in &phrases {
            for word in phrase {
                *frequency.entry(word.as_str()).or_default() += 1.0;
                *degree.entry(word.as_str()).or_default() += phrase.len() as f64;
            }
        }

        let mut seen = HashSet::new();
        let mut ranked: Vec<RankedPhrase> = Vec::new();
        for phrase in &phrases {
            if !seen.insert(phrase.join(" ")) {
                continue;
            }
            let score = phrase
                .iter()
                .map(|w| degree[w.as_str()] / frequency[w.as_str()])
                .sum();
            ranked.push(RankedPhrase {
                words: phrase.clone(),
                score,
            });
        }

        // equal scores: phrase text descending
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.text().cmp(&a.text()))
        });
        ranked
    }

    /// Runs of non-delimiter words, lower-cased, in text order
    fn candidate_phrases(&self, text: &str) -> Vec<Vec<String>> {
        let mut phrases = Vec::new();
        let mut current: Vec<String> = Vec::new();

        for token in word_punct_tokens(&text.to_lowercase()) {
            let is_word = token.chars().all(is_word_char);
            if is_word && !self.delimiters.contains(token.as_str()) {
                current.push(token);
            } else if !current.is_empty() {
                phrases.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            phrases.push(current);
        }
        phrases
    }
}

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Tokens of either word characters or other non-space characters.
/// Apostrophes split words: "don't" becomes "don", "'", "t".
fn word_punct_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_is_word = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }
        let word = is_word_char(c);
        if !current.is_empty() && word != current_is_word {
            tokens.push(std::mem::take(&mut current));
        }
        current_is_word = word;
        current.push(c);
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
