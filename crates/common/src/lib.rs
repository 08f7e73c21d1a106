//! Astrolit Common Library
//!
//! Context-aware literature retrieval for space-biology research questions:
//! - Keyword extraction and scoring
//! - Conversation context tracking
//! - Corpus, study index and full-text literature sources
//! - Retrieval orchestration and grounding assembly
//! - Source deduplication and report publication
//! - Error types, configuration and metrics

pub mod config;
pub mod context;
pub mod errors;
pub mod ledger;
pub mod metrics;
pub mod retrieval;
pub mod session;
pub mod sources;
pub mod text;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use session::{ResearchSession, SharedSession, TurnOutput};
pub use sources::SourceRef;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
