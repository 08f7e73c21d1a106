//! Configuration management for astrolit
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Local title/link corpus
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Literature metadata and full-text endpoints
    #[serde(default)]
    pub literature: LiteratureConfig,

    /// Remote study index
    #[serde(default)]
    pub study_index: StudyIndexConfig,

    /// Conversation context tracking
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Grounding text assembly
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Source ledger and report publication
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorpusConfig {
    /// Path to the CSV corpus with Title and Link columns
    #[serde(default = "default_corpus_path")]
    pub path: String,

    /// Maximum corpus hits per search
    #[serde(default = "default_corpus_max_results")]
    pub max_results: usize,

    /// Word similarity ratio a keyword must exceed to count as a fuzzy match
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LiteratureConfig {
    /// E-utilities base URL (trailing slash expected)
    #[serde(default = "default_literature_url")]
    pub base_url: String,

    /// Contact email sent with summary requests
    pub email: Option<String>,

    /// API key for higher rate limits
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StudyIndexConfig {
    /// Search endpoint URL
    #[serde(default = "default_study_index_url")]
    pub base_url: String,

    /// Value of the `type` query parameter
    #[serde(default = "default_data_source")]
    pub data_source: String,

    /// Hits requested per keyword
    #[serde(default = "default_study_max_results")]
    pub max_results: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Keyword searches allowed in flight at once
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversationConfig {
    /// Turns kept in history
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Turns merged into a follow-up query
    #[serde(default = "default_merge_window")]
    pub merge_window: usize,

    /// Topic similarity above which context is kept
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Queries with at most this many tokens count as follow-ups
    #[serde(default = "default_followup_max_tokens")]
    pub followup_max_tokens: usize,

    /// Previous-turn keywords blended into a follow-up's keywords
    #[serde(default = "default_blend_keywords")]
    pub blend_keywords: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Append a "Results" block after each abstract block when available
    #[serde(default = "default_enabled")]
    pub include_results_section: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
    /// HTML report that receives newly discovered sources
    pub report_path: Option<String>,

    /// Marker before which new source blocks are inserted
    #[serde(default = "default_report_marker")]
    pub marker: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default)]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_corpus_path() -> String { "data/csv/SB_publication_PMC.csv".to_string() }
fn default_corpus_max_results() -> usize { 10 }
fn default_fuzzy_threshold() -> f32 { 0.75 }
fn default_literature_url() -> String { "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/".to_string() }
fn default_timeout() -> u64 { 10 }
fn default_study_index_url() -> String { "https://osdr.nasa.gov/osdr/data/search".to_string() }
fn default_data_source() -> String { "cgene".to_string() }
fn default_study_max_results() -> usize { 2 }
fn default_max_concurrent_requests() -> usize { 4 }
fn default_max_history() -> usize { 10 }
fn default_merge_window() -> usize { 2 }
fn default_similarity_threshold() -> f64 { 0.3 }
fn default_followup_max_tokens() -> usize { 5 }
fn default_blend_keywords() -> usize { 3 }
fn default_enabled() -> bool { true }
fn default_report_marker() -> String { "<!-- END REPORTS -->".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_service_name() -> String { "astrolit".to_string() }

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: default_corpus_path(),
            max_results: default_corpus_max_results(),
            fuzzy_threshold: default_fuzzy_threshold(),
        }
    }
}

impl Default for LiteratureConfig {
    fn default() -> Self {
        Self {
            base_url: default_literature_url(),
            email: None,
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for StudyIndexConfig {
    fn default() -> Self {
        Self {
            base_url: default_study_index_url(),
            data_source: default_data_source(),
            max_results: default_study_max_results(),
            timeout_secs: default_timeout(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            merge_window: default_merge_window(),
            similarity_threshold: default_similarity_threshold(),
            followup_max_tokens: default_followup_max_tokens(),
            blend_keywords: default_blend_keywords(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            include_results_section: default_enabled(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            report_path: None,
            marker: default_report_marker(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
            metrics_port: 0,
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__CORPUS__PATH=/data/corpus.csv
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific config file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl LiteratureConfig {
    /// Timeout applied to literature requests
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl StudyIndexConfig {
    /// Timeout applied to study index requests
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
