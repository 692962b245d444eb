//! NCBI E-utilities client: `esearch` for PMIDs, `efetch` for abstracts.

use crate::config::toml_config::PubMedConfig;
use crate::domain::model::Document;
use crate::domain::ports::EvidenceSource;
use crate::utils::error::{RagError, Result};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const TOOL_NAME: &str = "clinical-rag";

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

pub struct PubMedClient {
    client: Client,
    base_url: String,
    email: Option<String>,
    api_key: Option<String>,
}

impl PubMedClient {
    pub fn new(config: &PubMedConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            email: config.email.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn common_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("db", "pubmed".to_string()), ("tool", TOOL_NAME.to_string())];
        if let Some(email) = &self.email {
            params.push(("email", email.clone()));
        }
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.base_url, endpoint);
        tracing::debug!("Making API request to: {}", url);

        let response = self.client.get(&url).query(params).send().await?;
        tracing::debug!("API response status: {}", response.status());

        if !response.status().is_success() {
            return Err(RagError::ApiResponseError {
                status: response.status().as_u16(),
                url,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl EvidenceSource for PubMedClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>> {
        let mut params = self.common_params();
        params.extend([
            ("term", query.to_string()),
            ("retmax", max_results.to_string()),
            ("sort", "relevance".to_string()),
            ("retmode", "json".to_string()),
        ]);

        let body: ESearchResponse = self.get("esearch.fcgi", &params).await?.json().await?;
        tracing::info!("🔎 PubMed returned {} ids", body.esearchresult.idlist.len());
        Ok(body.esearchresult.idlist)
    }

    async fn fetch_abstracts(&self, ids: &[String]) -> Result<Vec<Document>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut params = self.common_params();
        params.extend([
            ("id", ids.join(",")),
            ("rettype", "abstract".to_string()),
            ("retmode", "xml".to_string()),
        ]);

        let xml = self.get("efetch.fcgi", &params).await?.text().await?;
        let documents = parse_pubmed_xml(&xml)?;
        tracing::info!("📄 Fetched {} abstracts", documents.len());
        Ok(documents)
    }
}

#[derive(Default)]
struct ArticleBuilder {
    pmid: String,
    title: String,
    abstract_parts: Vec<String>,
    publication_types: Vec<String>,
    year: String,
}

impl ArticleBuilder {
    fn build(self) -> Option<Document> {
        let pmid = collapse_whitespace(&self.pmid);
        if pmid.is_empty() {
            return None;
        }
        let year = collapse_whitespace(&self.year);
        Some(Document {
            pmid,
            title: collapse_whitespace(&self.title),
            abstract_text: self
                .abstract_parts
                .iter()
                .map(|p| collapse_whitespace(p))
                .collect::<Vec<_>>()
                .join(" "),
            publication_types: self
                .publication_types
                .iter()
                .map(|p| collapse_whitespace(p))
                .filter(|p| !p.is_empty())
                .collect(),
            year: (!year.is_empty()).then_some(year),
            priority_score: 0.0,
        })
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn push_text(path: &str, article: &mut ArticleBuilder, text: &str) {
    if path.ends_with("/MedlineCitation/PMID") {
        article.pmid.push_str(text);
    } else if path.contains("/Article/ArticleTitle") {
        article.title.push_str(text);
    } else if path.contains("/Article/Abstract/AbstractText") {
        if let Some(part) = article.abstract_parts.last_mut() {
            part.push_str(text);
        }
    } else if path.ends_with("/PublicationTypeList/PublicationType") {
        if let Some(kind) = article.publication_types.last_mut() {
            kind.push_str(text);
        }
    } else if path.ends_with("/JournalIssue/PubDate/Year") {
        article.year.push_str(text);
    }
}

/// Parses an `efetch` PubmedArticleSet. Articles without a PMID are skipped.
pub fn parse_pubmed_xml(xml: &str) -> Result<Vec<Document>> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<String> = Vec::new();
    let mut current: Option<ArticleBuilder> = None;
    let mut documents = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                stack.push(name);
                let path = format!("/{}", stack.join("/"));

                if stack.last().is_some_and(|n| n == "PubmedArticle") {
                    current = Some(ArticleBuilder::default());
                } else if let Some(article) = current.as_mut() {
                    if path.ends_with("/Article/Abstract/AbstractText") {
                        article.abstract_parts.push(String::new());
                    } else if path.ends_with("/PublicationTypeList/PublicationType") {
                        article.publication_types.push(String::new());
                    }
                }
            }
            Event::End(_) => {
                if stack.pop().as_deref() == Some("PubmedArticle") {
                    if let Some(doc) = current.take().and_then(ArticleBuilder::build) {
                        documents.push(doc);
                    }
                }
            }
            Event::Text(e) => {
                if let Some(article) = current.as_mut() {
                    let text = e.unescape()?;
                    push_text(&format!("/{}", stack.join("/")), article, &text);
                }
            }
            Event::CData(e) => {
                if let Some(article) = current.as_mut() {
                    let bytes = e.into_inner();
                    let text = String::from_utf8_lossy(&bytes);
                    push_text(&format!("/{}", stack.join("/")), article, &text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const EFETCH_XML: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE PubmedArticleSet PUBLIC "-//NLM//DTD PubMedArticle, 1st January 2024//EN" "https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_240101.dtd">
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">38000001</PMID>
      <Article PubModel="Print">
        <Journal>
          <JournalIssue CitedMedium="Internet">
            <PubDate><Year>2023</Year><Month>Mar</Month></PubDate>
          </JournalIssue>
        </Journal>
        <ArticleTitle>Metformin &amp; lactic acidosis: a <i>systematic</i> review.</ArticleTitle>
        <Abstract>
          <AbstractText Label="BACKGROUND">Metformin is first-line therapy.</AbstractText>
          <AbstractText Label="RESULTS">Lactic acidosis was <b>rare</b> in 12 trials.</AbstractText>
        </Abstract>
        <PublicationTypeList>
          <PublicationType UI="D016428">Journal Article</PublicationType>
          <PublicationType UI="D000078182">Systematic Review</PublicationType>
        </PublicationTypeList>
      </Article>
      <CommentsCorrectionsList>
        <CommentsCorrections RefType="Cites"><PMID Version="1">11111111</PMID></CommentsCorrections>
      </CommentsCorrectionsList>
    </MedlineCitation>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation>
      <PMID Version="1">38000002</PMID>
      <Article>
        <Journal><JournalIssue><PubDate><MedlineDate>2019 Winter</MedlineDate></PubDate></JournalIssue></Journal>
        <ArticleTitle>No abstract here</ArticleTitle>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation><Article><ArticleTitle>Missing PMID</ArticleTitle></Article></MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

    fn config(base_url: String) -> PubMedConfig {
        PubMedConfig {
            base_url,
            email: Some("qa@example.org".to_string()),
            ..PubMedConfig::default()
        }
    }

    #[test]
    fn test_parse_pubmed_xml() {
        let docs = parse_pubmed_xml(EFETCH_XML).unwrap();
        assert_eq!(docs.len(), 2);

        let first = &docs[0];
        assert_eq!(first.pmid, "38000001");
        assert_eq!(first.title, "Metformin & lactic acidosis: a systematic review.");
        assert_eq!(
            first.abstract_text,
            "Metformin is first-line therapy. Lactic acidosis was rare in 12 trials."
        );
        assert_eq!(first.publication_types, vec!["Journal Article", "Systematic Review"]);
        assert_eq!(first.year.as_deref(), Some("2023"));

        let second = &docs[1];
        assert_eq!(second.pmid, "38000002");
        assert!(second.abstract_text.is_empty());
        assert!(second.year.is_none());
    }

    #[test]
    fn test_parse_rejects_malformed_xml() {
        assert!(parse_pubmed_xml("<PubmedArticleSet><PubmedArticle></Wrong>").is_err());
    }

    #[tokio::test]
    async fn test_search_and_fetch() {
        let server = MockServer::start();
        let search_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/esearch.fcgi")
                .query_param("db", "pubmed")
                .query_param("term", "metformin")
                .query_param("retmax", "2")
                .query_param("retmode", "json")
                .query_param("email", "qa@example.org");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "esearchresult": {"count": "2", "idlist": ["38000001", "38000002"]}
                }));
        });
        let fetch_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/efetch.fcgi")
                .query_param("id", "38000001,38000002")
                .query_param("retmode", "xml");
            then.status(200)
                .header("Content-Type", "text/xml")
                .body(EFETCH_XML);
        });

        let client = PubMedClient::new(&config(server.base_url())).unwrap();
        let ids = client.search("metformin", 2).await.unwrap();
        let docs = client.fetch_abstracts(&ids).await.unwrap();

        search_mock.assert();
        fetch_mock.assert();
        assert_eq!(ids, vec!["38000001", "38000002"]);
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_with_no_ids_skips_request() {
        let client = PubMedClient::new(&config("http://127.0.0.1:9".to_string())).unwrap();
        assert!(client.fetch_abstracts(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/esearch.fcgi");
            then.status(429);
        });

        let client = PubMedClient::new(&config(server.base_url())).unwrap();
        let err = client.search("metformin", 5).await.unwrap_err();

        mock.assert();
        assert!(err.is_quota_exceeded());
    }
}
