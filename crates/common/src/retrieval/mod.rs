//! Retrieval Orchestrator
//!
//! Fans a keyword set out to the corpus and the remote study index, keeps
//! the top-scoring hits of each response, and assembles grounding text from
//! the abstracts of the retained corpus papers.

mod category;

pub use category::{label_for, normalize_category, section_for};

use crate::config::AppConfig;
use crate::context::{GroundingBuilder, PaperExcerpt};
use crate::errors::Result;
use crate::metrics::{self, RetrievalTimer};
use crate::sources::{
    select_top, Corpus, CorpusHit, LiteratureSource, Provenance, SectionOutcome, SourceRef,
    StudyHit, StudyIndex,
};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

const ABSTRACT: &str = "Abstract";
const RESULTS: &str = "Results";

/// Coordinates the sources for one session
pub struct Orchestrator {
    corpus: Corpus,
    study_index: Arc<dyn StudyIndex>,
    literature: Arc<dyn LiteratureSource>,
    corpus_max_results: usize,
    study_max_results: usize,
    study_concurrency: usize,
    include_results_section: bool,
    corpus_hits: Vec<CorpusHit>,
    studies: Vec<StudyHit>,
}

impl Orchestrator {
    pub fn new(
        corpus: Corpus,
        study_index: Arc<dyn StudyIndex>,
        literature: Arc<dyn LiteratureSource>,
        config: &AppConfig,
    ) -> Self {
        Self {
            corpus,
            study_index,
            literature,
            corpus_max_results: config.corpus.max_results,
            study_max_results: config.study_index.max_results,
            study_concurrency: config.study_index.max_concurrent_requests.max(1),
            include_results_section: config.retrieval.include_results_section,
            corpus_hits: Vec::new(),
            studies: Vec::new(),
        }
    }

    /// Search every source and build grounding text.
    ///
    /// Remote failures degrade to missing excerpts; a corpus link without
    /// a resolvable identifier is an error.
    pub async fn query_search(
        &mut self,
        keywords: &[String],
        category: Option<&str>,
    ) -> Result<String> {
        let timer = RetrievalTimer::start();

        let hits = self.corpus.search(keywords, self.corpus_max_results);
        self.corpus_hits = select_top(&hits);
        metrics::record_source_hits(Provenance::Corpus.as_str(), self.corpus_hits.len());

        let index = &self.study_index;
        let max_results = self.study_max_results;
        // buffered yields in keyword order with a bounded number in flight
        let responses: Vec<Vec<StudyHit>> = stream::iter(keywords)
            .map(|keyword| index.search_studies(keyword, max_results))
            .buffered(self.study_concurrency)
            .collect()
            .await;
        self.studies = responses.iter().flat_map(|batch| select_top(batch)).collect();
        metrics::record_source_hits(Provenance::StudyIndex.as_str(), self.studies.len());

        info!(
            corpus_hits = self.corpus_hits.len(),
            studies = self.studies.len(),
            "Sources searched"
        );

        let grounding = self.ground(category).await;
        timer.finish();
        grounding
    }

    async fn ground(&self, category: Option<&str>) -> Result<String> {
        let category_section = category.map(section_for);

        let mut wanted = vec![ABSTRACT];
        if self.include_results_section {
            wanted.push(RESULTS);
        }
        if let Some(section) = &category_section {
            wanted.push(section.as_str());
        }

        let mut builder = GroundingBuilder::new();
        for hit in &self.corpus_hits {
            let mut outcomes = self
                .literature
                .fetch_sections(&hit.link, &wanted)
                .await?
                .into_iter();

            let abstract_text = match outcomes.next() {
                Some(SectionOutcome::Found(text)) => text,
                other => {
                    debug!(title = %hit.title, outcome = ?other, "Skipping paper without abstract");
                    continue;
                }
            };
            let results = if self.include_results_section {
                outcomes.next()
            } else {
                None
            };
            let category_line = category_section.as_deref().map(|section| {
                let outcome = outcomes.next().unwrap_or(SectionOutcome::NotFound);
                (label_for(section), outcome.sentinel(section))
            });

            builder.push(PaperExcerpt {
                title: hit.title.clone(),
                category: category_line.clone(),
                content: abstract_text,
            });
            if let Some(SectionOutcome::Found(text)) = results {
                builder.push(PaperExcerpt {
                    title: hit.title.clone(),
                    category: category_line,
                    content: text,
                });
            }
        }

        debug!(excerpts = builder.len(), "Grounding assembled");
        Ok(builder.build())
    }

    /// Distinct corpus sources of the last search, first occurrence wins
    pub fn sources(&self) -> Vec<SourceRef> {
        let mut seen = HashSet::new();
        self.corpus_hits
            .iter()
            .filter(|hit| seen.insert(hit.link.as_str()))
            .map(|hit| SourceRef {
                title: hit.title.clone(),
                link: hit.link.clone(),
            })
            .collect()
    }

    /// Corpus hits retained by the last search
    pub fn corpus_hits(&self) -> &[CorpusHit] {
        &self.corpus_hits
    }

    /// Remote studies retained by the last search, in keyword order
    pub fn studies(&self) -> &[StudyHit] {
        &self.studies
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory sources shared by orchestrator and session tests

    use crate::errors::Result;
    use crate::sources::{
        extract_pmcid, CorpusEntry, LiteratureSource, PaperMetadata, SectionOutcome, StudyHit,
        StudyIndex,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Study index answering from a keyword table
    #[derive(Default)]
    pub struct MockStudyIndex {
        pub responses: HashMap<String, Vec<StudyHit>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl MockStudyIndex {
        pub fn with(mut self, keyword: &str, hits: Vec<(&str, f64)>) -> Self {
            let hits = hits
                .into_iter()
                .map(|(accession, score)| {
                    let mut hit = StudyHit::placeholder(accession);
                    hit.score = score;
                    hit
                })
                .collect();
            self.responses.insert(keyword.to_string(), hits);
            self
        }
    }

    #[async_trait]
    impl StudyIndex for MockStudyIndex {
        async fn search_studies(&self, keyword: &str, max_results: usize) -> Vec<StudyHit> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(keyword.to_string());
            }
            let mut hits = self.responses.get(keyword).cloned().unwrap_or_default();
            hits.truncate(max_results);
            hits
        }
    }

    /// Literature source serving sections from a table keyed by link
    #[derive(Default)]
    pub struct MockLiterature {
        pub sections: HashMap<String, HashMap<String, String>>,
        pub unavailable: Vec<String>,
    }

    impl MockLiterature {
        pub fn with(mut self, link: &str, section: &str, text: &str) -> Self {
            self.sections
                .entry(link.to_string())
                .or_default()
                .insert(section.to_lowercase(), text.to_string());
            self
        }

        pub fn down(mut self, link: &str) -> Self {
            self.unavailable.push(link.to_string());
            self
        }
    }

    #[async_trait]
    impl LiteratureSource for MockLiterature {
        async fn fetch_section(&self, link: &str, section: &str) -> Result<SectionOutcome> {
            extract_pmcid(link)?;
            if self.unavailable.iter().any(|l| l == link) {
                return Ok(SectionOutcome::Unavailable("connection refused".into()));
            }
            Ok(self
                .sections
                .get(link)
                .and_then(|s| s.get(&section.to_lowercase()))
                .map(|text| SectionOutcome::Found(text.clone()))
                .unwrap_or(SectionOutcome::NotFound))
        }

        async fn fetch_info(&self, link: &str) -> Result<PaperMetadata> {
            let pmcid = extract_pmcid(link)?;
            Ok(PaperMetadata {
                title: None,
                authors: Vec::new(),
                journal: None,
                pubdate: None,
                doi: None,
                pmcid: format!("PMC{}", pmcid),
            })
        }
    }

    pub fn pmc(n: u32) -> String {
        format!("https://www.ncbi.nlm.nih.gov/pmc/articles/PMC{}/", n)
    }

    pub fn entries() -> Vec<CorpusEntry> {
        vec![
            CorpusEntry {
                title: "Microgravity alters gene expression in mice".into(),
                link: pmc(1),
            },
            CorpusEntry {
                title: "Gene expression of plants in microgravity".into(),
                link: pmc(2),
            },
            CorpusEntry {
                title: "Bone loss in spaceflight mice".into(),
                link: pmc(3),
            },
        ]
    }
}
