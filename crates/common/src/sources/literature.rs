//! Literature client - resolves PMC links to summary metadata and
//! full-text sections through the E-utilities endpoints.

use super::xml::{find_section, XmlElement};
use super::SectionOutcome;
use crate::config::LiteratureConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, warn};

const SERVICE: &str = "literature";

/// Bibliographic summary of a paper
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaperMetadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub journal: Option<String>,
    pub pubdate: Option<String>,
    pub doi: Option<String>,
    pub pmcid: String,
}

/// Source of paper metadata and full-text sections
#[async_trait]
pub trait LiteratureSource: Send + Sync {
    /// Text of a named section. Unresolvable links are an error; an
    /// unreachable source is `SectionOutcome::Unavailable`.
    async fn fetch_section(&self, link: &str, section: &str) -> Result<SectionOutcome>;

    /// Several sections of one paper, in the order requested
    async fn fetch_sections(&self, link: &str, sections: &[&str]) -> Result<Vec<SectionOutcome>> {
        let mut outcomes = Vec::with_capacity(sections.len());
        for section in sections {
            outcomes.push(self.fetch_section(link, section).await?);
        }
        Ok(outcomes)
    }

    /// Summary metadata for a paper
    async fn fetch_info(&self, link: &str) -> Result<PaperMetadata>;
}

static PMCID: OnceLock<Regex> = OnceLock::new();

fn pmcid_pattern() -> Result<&'static Regex> {
    if let Some(re) = PMCID.get() {
        return Ok(re);
    }
    let re = Regex::new(r"PMC(\d+)").map_err(|e| AppError::Internal {
        message: format!("Invalid PMCID pattern: {}", e),
    })?;
    Ok(PMCID.get_or_init(|| re))
}

/// Numeric part of the PMC identifier embedded in a link
pub fn extract_pmcid(url: &str) -> Result<String> {
    pmcid_pattern()?
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| AppError::InvalidIdentifier {
            url: url.to_string(),
        })
}

/// E-utilities client for PubMed Central
pub struct PmcClient {
    client: reqwest::Client,
    base_url: String,
    email: Option<String>,
    api_key: Option<String>,
}

impl PmcClient {
    pub fn new(config: &LiteratureConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            email: config.email.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), name)
    }

    async fn fetch_full_text(&self, pmcid: &str) -> Result<String> {
        let mut params = vec![("db", "pmc"), ("id", pmcid), ("retmode", "xml")];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.as_str()));
        }

        let response = self
            .client
            .get(self.endpoint("efetch.fcgi"))
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamStatus {
                service: SERVICE.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl LiteratureSource for PmcClient {
    async fn fetch_section(&self, link: &str, section: &str) -> Result<SectionOutcome> {
        let pmcid = extract_pmcid(link)?;

        let outcome = match self.fetch_full_text(&pmcid).await {
            Ok(xml) => section_from_document(&xml, section),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(outcome) => {
                debug!(pmcid = %pmcid, section, found = outcome.is_found(), "Section lookup");
                Ok(outcome)
            }
            Err(e) => {
                warn!(pmcid = %pmcid, section, error = %e, "Full-text fetch failed");
                metrics::record_upstream_failure(SERVICE);
                Ok(SectionOutcome::Unavailable(e.to_string()))
            }
        }
    }

    /// One full-text download shared by every requested section
    async fn fetch_sections(&self, link: &str, sections: &[&str]) -> Result<Vec<SectionOutcome>> {
        let pmcid = extract_pmcid(link)?;

        let root = match self.fetch_full_text(&pmcid).await {
            Ok(xml) => XmlElement::parse(&xml),
            Err(e) => Err(e),
        };

        match root {
            Ok(root) => Ok(sections
                .iter()
                .map(|section| match find_section(&root, section) {
                    Some(text) => SectionOutcome::Found(text),
                    None => SectionOutcome::NotFound,
                })
                .collect()),
            Err(e) => {
                warn!(pmcid = %pmcid, error = %e, "Full-text fetch failed");
                metrics::record_upstream_failure(SERVICE);
                Ok(sections
                    .iter()
                    .map(|_| SectionOutcome::Unavailable(e.to_string()))
                    .collect())
            }
        }
    }

    async fn fetch_info(&self, link: &str) -> Result<PaperMetadata> {
        let pmcid = extract_pmcid(link)?;

        let mut params = vec![("db", "pmc"), ("id", pmcid.as_str()), ("retmode", "json")];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.as_str()));
        }
        if let Some(email) = &self.email {
            params.push(("email", email.as_str()));
        }

        let response = self
            .client
            .get(self.endpoint("esummary.fcgi"))
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamStatus {
                service: SERVICE.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body: Value = response.json().await?;
        parse_summary(&pmcid, &body)
    }
}

/// Locate `section` in a full-text XML document
pub(crate) fn section_from_document(xml: &str, section: &str) -> Result<SectionOutcome> {
    let root = XmlElement::parse(xml)?;
    Ok(match find_section(&root, section) {
        Some(text) => SectionOutcome::Found(text),
        None => SectionOutcome::NotFound,
    })
}

/// Build metadata from an esummary JSON body
pub(crate) fn parse_summary(pmcid: &str, body: &Value) -> Result<PaperMetadata> {
    let results = body
        .get("result")
        .and_then(Value::as_object)
        .ok_or_else(|| AppError::Internal {
            message: "summary response has no result object".to_string(),
        })?;

    let uid = results
        .get("uids")
        .and_then(Value::as_array)
        .and_then(|uids| uids.first())
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| results.keys().find(|k| k.as_str() != "uids").cloned())
        .ok_or_else(|| AppError::Internal {
            message: "summary response has no records".to_string(),
        })?;

    let record = results.get(&uid).ok_or_else(|| AppError::Internal {
        message: format!("summary response has no record for {}", uid),
    })?;

    let text = |key: &str| record.get(key).and_then(Value::as_str).map(str::to_string);

    let authors = record
        .get("authors")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|a| a.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let doi = record
        .get("articleids")
        .and_then(Value::as_array)
        .and_then(|ids| {
            ids.iter()
                .find(|id| id.get("idtype").and_then(Value::as_str) == Some("doi"))
        })
        .and_then(|id| id.get("value").and_then(Value::as_str))
        .map(str::to_string);

    Ok(PaperMetadata {
        title: text("title"),
        authors,
        journal: text("fulljournalname"),
        pubdate: text("pubdate"),
        doi,
        pmcid: format!("PMC{}", pmcid),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_pmcid() {
        assert_eq!(
            extract_pmcid("https://www.ncbi.nlm.nih.gov/pmc/articles/PMC4136787/").unwrap(),
            "4136787"
        );
        let err = extract_pmcid("https://doi.org/10.1000/xyz").unwrap_err();
        assert!(matches!(err, AppError::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_pmcid_pattern_is_shared() {
        let first = pmcid_pattern().unwrap();
        let second = pmcid_pattern().unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(extract_pmcid("PMC42").unwrap(), "42");

        let err = extract_pmcid("PMC").unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, AppError::InvalidIdentifier { url } if url == "PMC"));
    }

    #[test]
    fn test_section_from_document() {
        let xml = "<article><abstract><p>Seedlings grew.</p></abstract></article>";
        assert_eq!(
            section_from_document(xml, "Abstract").unwrap(),
            SectionOutcome::Found("Seedlings grew.".into())
        );
        assert_eq!(section_from_document(xml, "Results").unwrap(), SectionOutcome::NotFound);
        assert!(section_from_document("<article>", "Abstract").is_err());
    }

    #[test]
    fn test_parse_summary() {
        let body = json!({
            "header": {"type": "esummary"},
            "result": {
                "uids": ["4136787"],
                "4136787": {
                    "title": "Spaceflight and root growth",
                    "authors": [{"name": "Paul AL"}, {"name": "Ferl RJ"}],
                    "fulljournalname": "BMC Plant Biology",
                    "pubdate": "2013 Aug 21",
                    "articleids": [
                        {"idtype": "pmid", "value": "23957891"},
                        {"idtype": "doi", "value": "10.1186/1471-2229-13-112"}
                    ]
                }
            }
        });

        let meta = parse_summary("4136787", &body).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Spaceflight and root growth"));
        assert_eq!(meta.authors, vec!["Paul AL", "Ferl RJ"]);
        assert_eq!(meta.journal.as_deref(), Some("BMC Plant Biology"));
        assert_eq!(meta.doi.as_deref(), Some("10.1186/1471-2229-13-112"));
        assert_eq!(meta.pmcid, "PMC4136787");
    }

    #[test]
    fn test_parse_summary_without_uids() {
        let body = json!({"result": {"42": {"title": "T"}}});
        let meta = parse_summary("42", &body).unwrap();
        assert_eq!(meta.title.as_deref(), Some("T"));
        assert!(meta.authors.is_empty());
        assert!(meta.doi.is_none());

        assert!(parse_summary("42", &json!({"error": "bad"})).is_err());
    }

    #[tokio::test]
    async fn test_invalid_link_is_fatal() {
        let client = PmcClient::new(&LiteratureConfig::default()).unwrap();
        let err = client.fetch_section("https://example.org/no-id", "Abstract").await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_unreachable_source_is_unavailable() {
        let config = LiteratureConfig {
            base_url: "http://127.0.0.1:9/".to_string(),
            timeout_secs: 2,
            ..LiteratureConfig::default()
        };
        let client = PmcClient::new(&config).unwrap();
        let outcome = client
            .fetch_section("https://www.ncbi.nlm.nih.gov/pmc/articles/PMC1/", "Abstract")
            .await
            .unwrap();
        assert!(matches!(outcome, SectionOutcome::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_fetch_sections_unreachable_source() {
        let config = LiteratureConfig {
            base_url: "http://127.0.0.1:9/".to_string(),
            timeout_secs: 2,
            ..LiteratureConfig::default()
        };
        let client = PmcClient::new(&config).unwrap();
        let outcomes = client
            .fetch_sections(
                "https://www.ncbi.nlm.nih.gov/pmc/articles/PMC1/",
                &["Abstract", "Results", "Methods"],
            )
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes
            .iter()
            .all(|outcome| matches!(outcome, SectionOutcome::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_fetch_sections_invalid_link_is_fatal() {
        let client = PmcClient::new(&LiteratureConfig::default()).unwrap();
        let err = client
            .fetch_sections("https://example.org/no-id", &["Abstract", "Results"])
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
