//! PubMed E-utilities client.
//!
//! Search (`esearch`), batch summaries (`esummary`), and per-record
//! abstracts (`efetch`). Every request goes through [`with_retry`].

use super::retry::{with_retry, RetryPolicy};
use crate::config::SearchConfig;
use crate::error::PipelineError;
use crate::models::Record;
use indicatif::ProgressBar;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Abstract texts this short are treated as missing.
const MIN_ABSTRACT_LEN: usize = 10;

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    esearchresult: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(default, rename = "ERROR")]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryEnvelope {
    #[serde(default)]
    result: HashMap<String, Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SummaryEntry {
    #[serde(default)]
    uid: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    authors: Vec<SummaryAuthor>,
    #[serde(default)]
    fulljournalname: String,
    #[serde(default)]
    pubdate: String,
    #[serde(default)]
    articleids: Vec<ArticleId>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SummaryAuthor {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ArticleId {
    #[serde(default)]
    idtype: String,
    #[serde(default)]
    value: String,
}

impl SummaryEntry {
    fn into_record(self, pmid: &str) -> Record {
        let doi = self
            .articleids
            .iter()
            .find(|id| id.idtype == "doi")
            .map(|id| id.value.clone())
            .unwrap_or_default();

        Record {
            pmid: if self.uid.is_empty() {
                pmid.to_string()
            } else {
                self.uid
            },
            title: self.title,
            abstract_text: String::new(),
            authors: self
                .authors
                .into_iter()
                .map(|a| a.name)
                .filter(|n| !n.is_empty())
                .collect(),
            journal: Record::journal_or_placeholder(&self.fulljournalname),
            year: Record::year_from_date(&self.pubdate),
            doi,
        }
    }
}

/// Parse an `esearch` JSON response into PMIDs.
pub fn parse_search_response(body: &str) -> Result<Vec<String>, PipelineError> {
    let envelope: SearchEnvelope = serde_json::from_str(body)
        .map_err(|e| PipelineError::Api(format!("Malformed search response: {}", e)))?;

    if let Some(error) = envelope.esearchresult.error {
        return Err(PipelineError::Api(error));
    }

    Ok(envelope.esearchresult.idlist)
}

/// Parse an `esummary` JSON response into records, in `batch` order.
///
/// PMIDs absent from the response, or flagged with an error, are skipped.
pub fn parse_summary_response(body: &str, batch: &[String]) -> Result<Vec<Record>, PipelineError> {
    let envelope: SummaryEnvelope = serde_json::from_str(body)
        .map_err(|e| PipelineError::Api(format!("Malformed summary response: {}", e)))?;

    if let Some(error) = envelope.error {
        return Err(PipelineError::Api(error));
    }

    let mut records = Vec::with_capacity(batch.len());
    for pmid in batch {
        let Some(value) = envelope.result.get(pmid) else {
            debug!("PMID {} missing from summary response", pmid);
            continue;
        };

        let entry: SummaryEntry = match serde_json::from_value(value.clone()) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping PMID {}: unreadable summary ({})", pmid, e);
                continue;
            }
        };

        if let Some(ref error) = entry.error {
            warn!("Skipping PMID {}: {}", pmid, error);
            continue;
        }

        records.push(entry.into_record(pmid));
    }

    Ok(records)
}

/// Client for the PubMed E-utilities endpoints.
pub struct PubMedClient {
    http: reqwest::Client,
    config: SearchConfig,
    retry: RetryPolicy,
}

impl PubMedClient {
    /// Create a client from search settings.
    pub fn new(config: &SearchConfig) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| PipelineError::Http {
                url: config.base_url.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            retry: RetryPolicy::new(
                config.max_attempts,
                Duration::from_millis(config.retry_delay_ms),
            ),
            config: config.clone(),
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), name)
    }

    fn common_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("db", "pubmed".to_string())];
        if !self.config.email.is_empty() {
            params.push(("email", self.config.email.clone()));
        }
        params
    }

    /// GET `url` with `params` and return the body, retrying on failure.
    async fn get_text(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<String, PipelineError> {
        with_retry(self.retry, url, || async move {
            let response = self
                .http
                .get(url)
                .query(params)
                .send()
                .await
                .map_err(|e| {
                    let message = if e.is_timeout() {
                        format!("timed out after {}s", self.config.timeout_seconds)
                    } else if e.is_connect() {
                        "cannot connect".to_string()
                    } else {
                        e.to_string()
                    };
                    PipelineError::Http {
                        url: url.to_string(),
                        message,
                    }
                })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(PipelineError::Http {
                    url: url.to_string(),
                    message: format!("HTTP {}: {}", status, body.trim()),
                });
            }

            response.text().await.map_err(|e| PipelineError::Http {
                url: url.to_string(),
                message: e.to_string(),
            })
        })
        .await
    }

    /// Search PubMed and return matching PMIDs.
    pub async fn search(&self) -> Result<Vec<String>, PipelineError> {
        let mut params = self.common_params();
        params.extend([
            ("term", self.config.query.clone()),
            ("retmax", self.config.max_results.to_string()),
            ("retmode", "json".to_string()),
            ("datetype", "pdat".to_string()),
            ("mindate", self.config.date_from.clone()),
            ("maxdate", self.config.date_to.clone()),
        ]);

        let body = self.get_text(&self.endpoint("esearch.fcgi"), &params).await?;
        let pmids = parse_search_response(&body)?;
        info!("Search returned {} PMIDs", pmids.len());
        Ok(pmids)
    }

    /// Fetch summaries in batches.
    pub async fn fetch_summaries(
        &self,
        pmids: &[String],
        progress: Option<&ProgressBar>,
    ) -> Result<Vec<Record>, PipelineError> {
        let batch_size = self.config.batch_size.max(1);
        let batches = pmids.len().div_ceil(batch_size);
        let mut records = Vec::with_capacity(pmids.len());

        for (i, batch) in pmids.chunks(batch_size).enumerate() {
            debug!("Fetching summary batch {} of {}", i + 1, batches);

            let mut params = self.common_params();
            params.extend([
                ("id", batch.join(",")),
                ("retmode", "json".to_string()),
            ]);

            let body = self.get_text(&self.endpoint("esummary.fcgi"), &params).await?;
            records.extend(parse_summary_response(&body, batch)?);

            if let Some(pb) = progress {
                pb.inc(batch.len() as u64);
            }

            if i + 1 < batches {
                tokio::time::sleep(Duration::from_millis(self.config.batch_delay_ms)).await;
            }
        }

        Ok(records)
    }

    /// Fetch the plain-text abstract for one PMID.
    pub async fn fetch_abstract(&self, pmid: &str) -> Result<Option<String>, PipelineError> {
        let mut params = self.common_params();
        params.extend([
            ("id", pmid.to_string()),
            ("rettype", "abstract".to_string()),
            ("retmode", "text".to_string()),
        ]);

        let body = self.get_text(&self.endpoint("efetch.fcgi"), &params).await?;
        let text = body.trim();
        Ok((text.len() > MIN_ABSTRACT_LEN).then(|| text.to_string()))
    }

    /// Fill in abstracts for records that lack one.
    ///
    /// Failures are logged and leave the abstract empty; they never abort.
    pub async fn fetch_abstracts(&self, records: &mut [Record], progress: Option<&ProgressBar>) {
        for record in records.iter_mut() {
            if record.abstract_text.is_empty() && !record.pmid.is_empty() {
                match self.fetch_abstract(&record.pmid).await {
                    Ok(Some(text)) => record.abstract_text = text,
                    Ok(None) => debug!("PMID {}: no abstract available", record.pmid),
                    Err(e) => warn!("Error fetching abstract for PMID {}: {}", record.pmid, e),
                }
                tokio::time::sleep(Duration::from_millis(self.config.abstract_delay_ms)).await;
            }

            if let Some(pb) = progress {
                pb.inc(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_response() {
        let body = r#"{"header":{},"esearchresult":{"count":"2","idlist":["101","102"]}}"#;
        assert_eq!(parse_search_response(body).unwrap(), vec!["101", "102"]);
    }

    #[test]
    fn test_parse_search_error() {
        let body = r#"{"esearchresult":{"ERROR":"Invalid query"}}"#;
        let err = parse_search_response(body).unwrap_err();
        assert!(matches!(err, PipelineError::Api(ref m) if m == "Invalid query"));

        assert!(parse_search_response("<html>").is_err());
    }

    #[test]
    fn test_parse_summary_response() {
        let body = r#"{
            "result": {
                "uids": ["101", "102"],
                "101": {
                    "uid": "101",
                    "title": "Plasma SEPT9 methylation.",
                    "authors": [{"name": "Smith J"}, {"name": "Doe A"}],
                    "fulljournalname": "Clinical Epigenetics",
                    "pubdate": "2024 Mar 15",
                    "articleids": [
                        {"idtype": "pubmed", "value": "101"},
                        {"idtype": "doi", "value": "10.1000/xyz"}
                    ]
                },
                "102": {
                    "uid": "102",
                    "title": "No journal",
                    "authors": [],
                    "pubdate": "Winter",
                    "articleids": []
                },
                "103": {"uid": "103", "error": "cannot get document summary"}
            }
        }"#;

        let batch: Vec<String> = ["101", "102", "103", "104"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let records = parse_summary_response(body, &batch).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].pmid, "101");
        assert_eq!(records[0].authors, vec!["Smith J", "Doe A"]);
        assert_eq!(records[0].journal, "Clinical Epigenetics");
        assert_eq!(records[0].year, "2024");
        assert_eq!(records[0].doi, "10.1000/xyz");
        assert_eq!(records[1].journal, crate::models::JOURNAL_PLACEHOLDER);
        assert_eq!(records[1].year, "");
        assert_eq!(records[1].doi, "");
    }

    #[test]
    fn test_parse_summary_api_error() {
        let body = r#"{"error":"API rate limit exceeded"}"#;
        let err = parse_summary_response(body, &["1".to_string()]).unwrap_err();
        assert!(err.to_string().contains("rate limit"));
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let config = SearchConfig {
            base_url: "https://example.org/eutils/".to_string(),
            ..SearchConfig::default()
        };
        let client = PubMedClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint("esearch.fcgi"),
            "https://example.org/eutils/esearch.fcgi"
        );
        assert_eq!(client.common_params(), vec![("db", "pubmed".to_string())]);
    }
}
