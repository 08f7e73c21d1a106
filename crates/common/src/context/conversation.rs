//! Conversation Context Manager - decides when a query continues the
//! previous topic and keeps a bounded log of recent turns.

use crate::config::ConversationConfig;
use crate::text::tfidf_cosine;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

/// Leading phrases that mark a query as a follow-up
const FOLLOWUP_INDICATORS: &[&str] = &[
    "what about", "how about", "and", "also", "additionally",
    "furthermore", "more", "tell me more", "elaborate", "explain",
    "why", "how", "when", "where", "can you", "could you",
    "what if", "suppose", "in that case", "regarding", "about that",
];

/// Pronouns that refer back to earlier turns
const CONTEXT_PRONOUNS: &[&str] = &["it", "this", "that", "these", "those", "they", "them"];

/// One recorded user turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub user_text: String,
    pub keywords: Vec<String>,
    pub sequence_index: u64,
}

/// Outcome of the per-turn context decision
#[derive(Debug, Clone, PartialEq)]
pub struct ContextDecision {
    pub use_context: bool,
    pub effective_text: String,
}

/// Tracks recent turns and merges history into follow-up queries
pub struct ContextManager {
    config: ConversationConfig,
    history: VecDeque<ConversationTurn>,
    last_topic: Option<String>,
    last_keywords: Vec<String>,
    next_index: u64,
}

impl ContextManager {
    pub fn new(config: ConversationConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(config.max_history),
            config,
            last_topic: None,
            last_keywords: Vec::new(),
            next_index: 0,
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.history.iter()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn last_topic(&self) -> Option<&str> {
        self.last_topic.as_deref()
    }

    pub fn last_keywords(&self) -> &[String] {
        &self.last_keywords
    }

    /// Cheap follow-up heuristics, checked in order: short query,
    /// leading indicator phrase, pronoun among the first three tokens.
    pub fn is_followup(&self, text: &str) -> bool {
        let lower = text.trim().to_lowercase();
        let tokens: Vec<&str> = lower.split_whitespace().collect();

        if tokens.len() <= self.config.followup_max_tokens {
            return true;
        }

        if FOLLOWUP_INDICATORS
            .iter()
            .any(|indicator| lower.starts_with(indicator))
        {
            return true;
        }

        // whole tokens only, punctuation included: "it?" is not "it"
        tokens
            .iter()
            .take(3)
            .any(|token| CONTEXT_PRONOUNS.contains(token))
    }

    /// TF-IDF cosine similarity between the last topic and `text`,
    /// 0.0 without a prior topic or shared vocabulary
    pub fn topic_similarity(&self, text: &str) -> f64 {
        self.last_topic
            .as_deref()
            .and_then(|topic| tfidf_cosine(topic, text))
            .unwrap_or(0.0)
    }

    /// Decide whether `text` continues the conversation. Never clears history.
    pub fn should_use_context(&self, text: &str) -> ContextDecision {
        if self.history.is_empty() {
            return ContextDecision {
                use_context: false,
                effective_text: text.to_string(),
            };
        }

        let followup = self.is_followup(text);
        let use_context =
            followup || self.topic_similarity(text) > self.config.similarity_threshold;

        if use_context {
            let merged = self.merge(text, self.config.merge_window);
            debug!(merged = %merged, followup, "Merged query with conversation history");
            ContextDecision {
                use_context: true,
                effective_text: merged,
            }
        } else {
            info!(turns = self.history.len(), "Topic shift detected, processing as new topic");
            ContextDecision {
                use_context: false,
                effective_text: text.to_string(),
            }
        }
    }

    /// Prefix `text` with the user text of the last `window` turns, oldest first
    pub fn merge(&self, text: &str, window: usize) -> String {
        let start = self.history.len().saturating_sub(window);
        let parts: Vec<&str> = self
            .history
            .iter()
            .skip(start)
            .map(|turn| turn.user_text.as_str())
            .filter(|t| !t.is_empty())
            .collect();

        if parts.is_empty() {
            return text.to_string();
        }
        format!("{} {}", parts.join(" "), text)
    }

    /// Append the top previous-turn keywords not already present
    pub fn blend_keywords(&self, mut keywords: Vec<String>) -> Vec<String> {
        for previous in self.last_keywords.iter().take(self.config.blend_keywords) {
            if !keywords.contains(previous) {
                keywords.push(previous.clone());
            }
        }
        keywords
    }

    /// Append a turn, evicting the oldest past the history bound
    pub fn record(&mut self, text: &str, keywords: Vec<String>) {
        self.history.push_back(ConversationTurn {
            user_text: text.to_string(),
            keywords: keywords.clone(),
            sequence_index: self.next_index,
        });
        self.next_index += 1;

        while self.history.len() > self.config.max_history {
            self.history.pop_front();
        }

        self.last_topic = Some(text.to_string());
        self.last_keywords = keywords;
    }

    /// Forget all turns. Only called on explicit request.
    pub fn reset(&mut self) {
        self.history.clear();
        self.last_topic = None;
        self.last_keywords.clear();
        info!("Conversation context cleared");
    }
}
