//! Research session - the per-conversation entry point
//!
//! Owns the conversation context, the orchestrator and the ledger, and
//! runs one turn at a time: context decision, keyword extraction,
//! retrieval, then source deduplication.

use crate::config::AppConfig;
use crate::context::ContextManager;
use crate::errors::Result;
use crate::ledger::{ReportSink, SourceLedger};
use crate::metrics;
use crate::retrieval::Orchestrator;
use crate::sources::{Corpus, LiteratureSource, OsdrClient, PmcClient, SourceRef, StudyHit, StudyIndex};
use crate::text::PhraseExtractor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Result of one conversation turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutput {
    /// The question as the user asked it
    pub question: String,
    /// Instruction plus paper excerpts for the language model
    pub grounding_text: String,
    /// Corpus sources not surfaced by any earlier turn
    pub new_sources: Vec<SourceRef>,
    /// Search keywords after any context blending
    pub keywords: Vec<String>,
    pub used_context: bool,
    /// Remote studies retained for this turn
    pub studies: Vec<StudyHit>,
}

impl TurnOutput {
    /// Prompt for the language model: the unmerged question, then grounding
    pub fn llm_prompt(&self) -> String {
        format!("{}\n{}", self.question, self.grounding_text)
    }
}

/// One conversation with its own history and known sources
pub struct ResearchSession {
    context: ContextManager,
    extractor: PhraseExtractor,
    orchestrator: Orchestrator,
    ledger: SourceLedger,
}

impl ResearchSession {
    pub fn new(
        config: &AppConfig,
        corpus: Corpus,
        study_index: Arc<dyn StudyIndex>,
        literature: Arc<dyn LiteratureSource>,
        sink: Box<dyn ReportSink>,
    ) -> Self {
        Self {
            context: ContextManager::new(config.conversation.clone()),
            extractor: PhraseExtractor::new(),
            orchestrator: Orchestrator::new(corpus, study_index, literature, config),
            ledger: SourceLedger::new(sink),
        }
    }

    /// Session backed by the configured corpus file and remote clients
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let corpus = Corpus::from_path(&config.corpus.path, config.corpus.fuzzy_threshold)?;
        let study_index: Arc<dyn StudyIndex> = Arc::new(OsdrClient::new(&config.study_index)?);
        let literature: Arc<dyn LiteratureSource> = Arc::new(PmcClient::new(&config.literature)?);

        Ok(Self {
            context: ContextManager::new(config.conversation.clone()),
            extractor: PhraseExtractor::new(),
            orchestrator: Orchestrator::new(corpus, study_index, literature, config),
            ledger: SourceLedger::from_config(&config.ledger),
        })
    }

    /// Run one turn to completion
    #[instrument(skip(self), fields(history = self.context.len()))]
    pub async fn process_turn(&mut self, raw: &str, category: Option<&str>) -> Result<TurnOutput> {
        let decision = self.context.should_use_context(raw);

        let mut keywords = self.extractor.extract_phrases(&decision.effective_text);
        if decision.use_context {
            keywords = self.context.blend_keywords(keywords);
            info!(merged = %decision.effective_text, "Follow-up question, using conversation context");
        } else {
            info!("Processing as new topic");
        }
        debug!(keywords = ?keywords, "Keywords extracted");

        self.context.record(raw, keywords.clone());

        let grounding_text = self.orchestrator.query_search(&keywords, category).await?;
        let new_sources = self.ledger.add_sources(&self.orchestrator.sources());

        metrics::record_turn(decision.use_context);
        info!(
            chars = grounding_text.len(),
            new_sources = new_sources.len(),
            "Turn complete"
        );

        Ok(TurnOutput {
            question: raw.to_string(),
            grounding_text,
            new_sources,
            keywords,
            used_context: decision.use_context,
            studies: self.orchestrator.studies().to_vec(),
        })
    }

    /// Start a new topic; known sources are kept
    pub fn reset_context(&mut self) {
        self.context.reset();
    }

    /// Forget known sources; conversation history is kept
    pub fn clear_ledger(&mut self) {
        self.ledger.clear();
        info!("Source ledger cleared");
    }

    pub fn context(&self) -> &ContextManager {
        &self.context
    }

    pub fn ledger(&self) -> &SourceLedger {
        &self.ledger
    }
}

/// Session shared between tasks; each turn holds the lock throughout
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<ResearchSession>>,
}

impl SharedSession {
    pub fn new(session: ResearchSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub async fn process_turn(&self, raw: &str, category: Option<&str>) -> Result<TurnOutput> {
        self.inner.lock().await.process_turn(raw, category).await
    }

    pub async fn reset_context(&self) {
        self.inner.lock().await.reset_context();
    }

    pub async fn clear_ledger(&self) {
        self.inner.lock().await.clear_ledger();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GROUNDING_INSTRUCTION;
    use crate::ledger::NullSink;
    use crate::retrieval::testing::*;

    fn session_with(index: MockStudyIndex, literature: MockLiterature) -> ResearchSession {
        ResearchSession::new(
            &AppConfig::default(),
            Corpus::from_entries(entries(), 0.75),
            Arc::new(index),
            Arc::new(literature),
            Box::new(NullSink),
        )
    }

    fn session() -> ResearchSession {
        let literature = MockLiterature::default()
            .with(&pmc(1), "Abstract", "Mice abstract.")
            .with(&pmc(2), "Abstract", "Plant abstract.")
            .with(&pmc(3), "Abstract", "Bone abstract.");
        session_with(MockStudyIndex::default(), literature)
    }

    #[tokio::test]
    async fn test_first_turn_is_new_topic() {
        let mut session = session();
        let out = session
            .process_turn("mice gene expression in microgravity", None)
            .await
            .unwrap();

        assert!(!out.used_context);
        assert_eq!(out.keywords, vec!["mice gene expression", "microgravity"]);
        assert!(out.grounding_text.starts_with(GROUNDING_INSTRUCTION));
        assert_eq!(out.new_sources.len(), out.grounding_text.matches("Possible Relevant Paper").count());
        assert_eq!(session.context().len(), 1);
    }

    #[tokio::test]
    async fn test_followup_blends_previous_keywords() {
        let mut session = session();
        session.process_turn("bone loss in spaceflight", None).await.unwrap();
        let out = session.process_turn("what about mice?", None).await.unwrap();

        assert!(out.used_context);
        assert!(out.keywords.contains(&"mice".to_string()));
        assert!(out.keywords.contains(&"bone loss".to_string()));
        assert_eq!(session.context().len(), 2);
        assert_eq!(session.context().last_topic(), Some("what about mice?"));
    }

    #[tokio::test]
    async fn test_sources_reported_once() {
        let mut session = session();
        let first = tokio_test::assert_ok!(session.process_turn("bone loss", None).await);
        assert_eq!(first.new_sources.len(), 1);
        assert_eq!(first.new_sources[0].link, pmc(3));

        session.reset_context();
        let second = session.process_turn("bone loss", None).await.unwrap();
        assert!(second.new_sources.is_empty());
        assert!(second.grounding_text.contains("Bone abstract."));

        session.clear_ledger();
        let third = session.process_turn("bone loss", None).await.unwrap();
        assert_eq!(third.new_sources.len(), 1);
    }

    #[tokio::test]
    async fn test_reset_context_forces_new_topic() {
        let mut session = session();
        session.process_turn("mice", None).await.unwrap();
        session.reset_context();
        assert!(session.context().is_empty());

        let out = session.process_turn("tell me more", None).await.unwrap();
        assert!(!out.used_context);
        assert_eq!(session.ledger().known_len(), 2);
    }

    #[tokio::test]
    async fn test_all_sources_down() {
        let literature = MockLiterature::default().down(&pmc(1)).down(&pmc(2)).down(&pmc(3));
        let mut session = session_with(MockStudyIndex::default(), literature);

        let out = tokio_test::assert_ok!(session.process_turn("mice", None).await);
        assert_eq!(out.grounding_text, GROUNDING_INSTRUCTION);
        assert!(out.studies.is_empty());
        assert_eq!(out.llm_prompt(), format!("mice\n{}", GROUNDING_INSTRUCTION));
    }

    #[tokio::test]
    async fn test_studies_exposed() {
        let index = MockStudyIndex::default().with("bone loss", vec![("OSD-9", 3.0)]);
        let mut session = session_with(index, MockLiterature::default());

        let out = session.process_turn("bone loss", None).await.unwrap();
        assert_eq!(out.studies.len(), 1);
        assert_eq!(out.studies[0].accession, "OSD-9");
        assert!(!out.grounding_text.contains("OSD-9"));
    }

    #[tokio::test]
    async fn test_shared_session_serializes_turns() {
        let shared = SharedSession::new(session());
        let a = shared.clone();
        let b = shared.clone();

        let (ra, rb) = tokio::join!(
            a.process_turn("bone loss", None),
            b.process_turn("plants in microgravity", None)
        );
        let total = ra.unwrap().new_sources.len() + rb.unwrap().new_sources.len();
        {
            let session = shared.inner.lock().await;
            assert_eq!(session.context().len(), 2);
            assert_eq!(session.ledger().known_len(), total);
        }

        shared.clear_ledger().await;
        shared.reset_context().await;
        let out = shared.process_turn("bone loss", None).await.unwrap();
        assert!(!out.used_context);
        assert_eq!(out.new_sources.len(), 1);
    }
}
