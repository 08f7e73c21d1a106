//! Term weighting: term frequencies and TF-IDF cosine similarity

use super::rake::is_word_char;
use super::stopwords::is_term_stopword;
use std::collections::{BTreeMap, HashMap};

/// Lower-cased terms of two or more word characters, stopwords removed
pub fn terms(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !is_word_char(c))
        .filter(|w| w.chars().count() >= 2)
        .filter(|w| !is_term_stopword(w))
        .map(str::to_string)
        .collect()
}

/// `count(term) / total_terms` for every distinct term; empty when no terms remain
pub fn term_frequencies(text: &str) -> HashMap<String, f64> {
    let terms = terms(text);
    if terms.is_empty() {
        return HashMap::new();
    }

    let total = terms.len() as f64;
    let mut counts: HashMap<String, f64> = HashMap::new();
    for term in terms {
        *counts.entry(term).or_default() += 1.0;
    }
    counts.values_mut().for_each(|c| *c /= total);
    counts
}

/// Cosine similarity of the TF-IDF vectors of two texts, fitted on the
/// two-document corpus `{a, b}`.
///
/// Uses raw counts, smoothed idf `ln((1 + n) / (1 + df)) + 1` and L2
/// normalization. Returns `None` when neither text has any terms.
pub fn tfidf_cosine(a: &str, b: &str) -> Option<f64> {
    let docs = [count_terms(a), count_terms(b)];

    let mut doc_freq: BTreeMap<&str, f64> = BTreeMap::new();
    for doc in &docs {
        for term in doc.keys() {
            *doc_freq.entry(term.as_str()).or_default() += 1.0;
        }
    }
    if doc_freq.is_empty() {
        return None;
    }

    let n = docs.len() as f64;
    let idf: HashMap<&str, f64> = doc_freq
        .iter()
        .map(|(term, df)| (*term, ((1.0 + n) / (1.0 + df)).ln() + 1.0))
        .collect();

    let vectors: Vec<HashMap<&str, f64>> = docs
        .iter()
        .map(|doc| {
            let mut v: HashMap<&str, f64> = doc
                .iter()
                .map(|(term, count)| (term.as_str(), count * idf[term.as_str()]))
                .collect();
            let norm = v.values().map(|x| x * x).sum::<f64>().sqrt();
            if norm > f64::EPSILON {
                v.values_mut().for_each(|x| *x /= norm);
            }
            v
        })
        .collect();

    let dot: f64 = vectors[0]
        .iter()
        .filter_map(|(term, x)| vectors[1].get(term).map(|y| x * y))
        .sum();
    Some(dot.clamp(0.0, 1.0))
}

fn count_terms(text: &str) -> HashMap<String, f64> {
    let mut counts = HashMap::new();
    for term in terms(text) {
        *counts.entry(term).or_default() += 1.0;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms_drop_stopwords_and_short_tokens() {
        assert_eq!(
            terms("What plants grow best in microgravity? A 3D study"),
            vec!["plants", "grow", "best", "microgravity", "3d", "study"]
        );
    }

    #[test]
    fn test_term_frequencies() {
        let tf = term_frequencies("microgravity effects on plants in microgravity");
        assert!((tf["microgravity"] - 0.5).abs() < 1e-9);
        assert!((tf["effects"] - 0.25).abs() < 1e-9);
        assert!(!tf.contains_key("on"));
    }

    #[test]
    fn test_term_frequencies_empty() {
        assert!(term_frequencies("it is what it is").is_empty());
        assert!(term_frequencies("").is_empty());
    }

    #[test]
    fn test_cosine_identical_and_disjoint() {
        let same = tfidf_cosine("plant growth in orbit", "plant growth in orbit").unwrap();
        assert!((same - 1.0).abs() < 1e-9);

        let disjoint = tfidf_cosine("plant growth", "radiation astronauts").unwrap();
        assert!(disjoint.abs() < 1e-9);
    }

    #[test]
    fn test_cosine_partial_overlap() {
        // shared "plants" has idf 1, unshared terms idf ln(1.5) + 1
        let sim = tfidf_cosine("plants microgravity", "plants roots").unwrap();
        let u = (1.5f64).ln() + 1.0;
        let expected = 1.0 / (1.0 + u * u);
        assert!((sim - expected).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_empty_vocabulary() {
        assert!(tfidf_cosine("what is it", "and then?").is_none());
        assert_eq!(tfidf_cosine("what is it", "plants"), Some(0.0));
    }
}
