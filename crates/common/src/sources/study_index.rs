//! Remote Study Index Client - keyword and filtered search over the OSDR
//! study metadata endpoint

use super::{Provenance, SourceHit};
use crate::config::StudyIndexConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

const SERVICE: &str = "study_index";
const MISSING: &str = "N/A";

/// Study record returned by the remote index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudyHit {
    pub id: String,
    pub accession: String,
    pub title: String,
    pub description: String,
    pub organism: Vec<String>,
    pub project_type: String,
    pub assay_type: Vec<String>,
    pub factor_name: Vec<String>,
    pub managing_center: String,
    pub release_date: String,
    /// Native relevance score of the index
    pub score: f64,
}

impl SourceHit for StudyHit {
    type Score = f64;

    fn provenance(&self) -> Provenance {
        Provenance::StudyIndex
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn locator(&self) -> &str {
        &self.accession
    }

    fn score(&self) -> f64 {
        self.score
    }
}

#[cfg(test)]
impl StudyHit {
    pub(crate) fn placeholder(accession: &str) -> StudyHit {
        StudyHit {
            id: accession.to_lowercase(),
            accession: accession.to_string(),
            title: format!("Study {}", accession),
            description: MISSING.to_string(),
            organism: Vec::new(),
            project_type: MISSING.to_string(),
            assay_type: Vec::new(),
            factor_name: Vec::new(),
            managing_center: MISSING.to_string(),
            release_date: MISSING.to_string(),
            score: 0.0,
        }
    }
}

/// Search request with optional field filters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudyQuery {
    pub keyword: Option<String>,
    pub max_results: usize,
    pub organism: Option<String>,
    pub assay_type: Option<String>,
    pub project_type: Option<String>,
}

impl StudyQuery {
    pub fn keyword(keyword: impl Into<String>, max_results: usize) -> Self {
        Self {
            keyword: Some(keyword.into()),
            max_results,
            ..Default::default()
        }
    }

    pub fn with_organism(mut self, organism: impl Into<String>) -> Self {
        self.organism = Some(organism.into());
        self
    }

    pub fn with_assay_type(mut self, assay_type: impl Into<String>) -> Self {
        self.assay_type = Some(assay_type.into());
        self
    }

    pub fn with_project_type(mut self, project_type: impl Into<String>) -> Self {
        self.project_type = Some(project_type.into());
        self
    }

    /// Query string pairs; each filter adds one `ffield`/`fvalue` pair
    pub fn params(&self, data_source: &str) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(keyword) = self.keyword.as_deref().filter(|k| !k.is_empty()) {
            params.push(("term", keyword.to_string()));
        }
        params.push(("from", "0".to_string()));
        params.push(("size", self.max_results.to_string()));
        params.push(("type", data_source.to_string()));

        let filters = [
            ("organism", &self.organism),
            ("Study Assay Technology Type", &self.assay_type),
            ("Project Type", &self.project_type),
        ];
        for (field, value) in filters {
            if let Some(value) = value {
                params.push(("ffield", field.to_string()));
                params.push(("fvalue", value.clone()));
            }
        }
        params
    }
}

/// Remote index of study metadata
#[async_trait]
pub trait StudyIndex: Send + Sync {
    /// Up to `max_results` studies for one keyword; empty on any failure
    async fn search_studies(&self, keyword: &str, max_results: usize) -> Vec<StudyHit>;
}

/// HTTP client for the OSDR search endpoint
pub struct OsdrClient {
    client: reqwest::Client,
    base_url: String,
    data_source: String,
}

impl OsdrClient {
    pub fn new(config: &StudyIndexConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            data_source: config.data_source.clone(),
        })
    }

    /// Run a filtered query; empty on any failure
    pub async fn search_filtered(&self, query: &StudyQuery) -> Vec<StudyHit> {
        match self.request(query).await {
            Ok(hits) => {
                debug!(keyword = ?query.keyword, hits = hits.len(), "Study index search");
                hits
            }
            Err(e) => {
                warn!(keyword = ?query.keyword, error = %e, "Study index search failed");
                metrics::record_upstream_failure(SERVICE);
                Vec::new()
            }
        }
    }

    async fn request(&self, query: &StudyQuery) -> Result<Vec<StudyHit>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&query.params(&self.data_source))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamStatus {
                service: SERVICE.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body: Value = response.json().await?;
        Ok(parse_hits(&body))
    }
}

#[async_trait]
impl StudyIndex for OsdrClient {
    async fn search_studies(&self, keyword: &str, max_results: usize) -> Vec<StudyHit> {
        self.search_filtered(&StudyQuery::keyword(keyword, max_results))
            .await
    }
}

/// Studies from a search response body. A body without `hits.hits` has none.
pub(crate) fn parse_hits(body: &Value) -> Vec<StudyHit> {
    let Some(hits) = body
        .get("hits")
        .and_then(|h| h.get("hits"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    hits.iter().map(parse_hit).collect()
}

fn parse_hit(hit: &Value) -> StudyHit {
    let source = hit.get("_source").unwrap_or(&Value::Null);
    let text = |key: &str| match source.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => MISSING.to_string(),
        Some(other) => other.to_string(),
    };
    let list = |key: &str| -> Vec<String> {
        match source.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    };

    StudyHit {
        id: match hit.get("_id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        },
        accession: text("Accession"),
        title: text("Study Title"),
        description: text("Study Description"),
        organism: list("organism"),
        project_type: text("Project Type"),
        assay_type: list("Study Assay Technology Type"),
        factor_name: list("Study Factor Name"),
        managing_center: text("Managing NASA Center"),
        release_date: text("Study Public Release Date"),
        score: hit.get("_score").and_then(Value::as_f64).unwrap_or(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_hits() {
        let body = json!({
            "hits": {
                "total": 2,
                "hits": [
                    {
                        "_id": "abc",
                        "_score": 12.5,
                        "_source": {
                            "Accession": "OSD-48",
                            "Study Title": "Rodent Research-1",
                            "Study Description": "Mice flown on the ISS",
                            "organism": ["Mus musculus"],
                            "Project Type": "Spaceflight Study",
                            "Study Assay Technology Type": ["RNA Sequencing"],
                            "Study Factor Name": ["Spaceflight"],
                            "Managing NASA Center": "Ames Research Center",
                            "Study Public Release Date": "2015-06-05"
                        }
                    },
                    {"_id": "def", "_source": {"Study Title": "Partial record"}}
                ]
            }
        });

        let hits = parse_hits(&body);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].accession, "OSD-48");
        assert_eq!(hits[0].organism, vec!["Mus musculus"]);
        assert_eq!(hits[0].score, 12.5);

        assert_eq!(hits[1].title, "Partial record");
        assert_eq!(hits[1].accession, "N/A");
        assert!(hits[1].assay_type.is_empty());
        assert_eq!(hits[1].score, 0.0);
    }

    #[test]
    fn test_parse_hits_single_string_list() {
        let body = json!({"hits": {"hits": [{"_id": "x", "_source": {"organism": "Arabidopsis thaliana"}}]}});
        let hits = parse_hits(&body);
        assert_eq!(hits[0].organism, vec!["Arabidopsis thaliana"]);
    }

    #[test]
    fn test_parse_hits_missing_envelope() {
        assert!(parse_hits(&json!({})).is_empty());
        assert!(parse_hits(&json!({"hits": {}})).is_empty());
    }

    #[test]
    fn test_keyword_params() {
        let params = StudyQuery::keyword("mouse", 2).params("cgene");
        assert_eq!(
            params,
            vec![
                ("term", "mouse".to_string()),
                ("from", "0".to_string()),
                ("size", "2".to_string()),
                ("type", "cgene".to_string()),
            ]
        );
    }

    #[test]
    fn test_filter_params() {
        let query = StudyQuery {
            max_results: 5,
            ..Default::default()
        }
        .with_organism("Mus musculus")
        .with_project_type("Spaceflight Study");
        let params = query.params("cgene");

        assert!(!params.iter().any(|(k, _)| *k == "term"));
        let fields: Vec<&str> = params
            .iter()
            .filter(|(k, _)| *k == "ffield")
            .map(|(_, v)| v.as_str())
            .collect();
        let values: Vec<&str> = params
            .iter()
            .filter(|(k, _)| *k == "fvalue")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(fields, vec!["organism", "Project Type"]);
        assert_eq!(values, vec!["Mus musculus", "Spaceflight Study"]);
    }

    #[tokio::test]
    async fn test_unreachable_index_is_empty() {
        let config = StudyIndexConfig {
            base_url: "http://127.0.0.1:9/search".to_string(),
            timeout_secs: 2,
            ..StudyIndexConfig::default()
        };
        let client = OsdrClient::new(&config).unwrap();
        assert!(client.search_studies("mouse", 2).await.is_empty());
    }
}
