//! Guideline ingestion from allowlisted web pages and local PDFs.
//!
//! Every chunk keeps its provenance: the page's `Last-Modified` header for web
//! sources, a SHA-256 prefix of the file for PDFs.

use crate::config::toml_config::GuidelineConfig;
use crate::domain::model::{ChunkLocation, GuidelineChunk, Provenance};
use crate::utils::error::{RagError, Result};
use reqwest::header::{LAST_MODIFIED, USER_AGENT};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;
use url::Url;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0";
const MIN_SECTION_CHARS: usize = 60;
const PDF_HASH_CHARS: usize = 12;

/// Host check against the allowlist; ports are ignored, case-insensitive.
pub fn domain_allowed(url: &str, allowed_domains: &[String]) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_lowercase();
    allowed_domains.iter().any(|d| d.eq_ignore_ascii_case(&host))
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| RagError::GuidelineError {
        message: format!("invalid selector '{}': {}", css, e),
    })
}

fn visible_text(element: &ElementRef) -> String {
    let mut text = String::new();
    for node in element.children() {
        if let Some(child) = ElementRef::wrap(node) {
            if matches!(child.value().name(), "script" | "style") {
                continue;
            }
            text.push_str(&visible_text(&child));
        } else if let Some(t) = node.value().as_text() {
            text.push_str(t);
        }
    }
    text
}

/// Splits an HTML guideline into section chunks. Candidate elements are
/// `p`, `li`, `h2` and `h3` under the first `main`, else `article`, else
/// `body`; short ones are dropped but still advance the section counter.
pub fn chunks_from_html(
    html: &str,
    source: &str,
    last_modified: Option<&str>,
) -> Result<Vec<GuidelineChunk>> {
    let document = Html::parse_document(html);
    let mut root = None;
    for css in ["main", "article", "body"] {
        if let Some(el) = document.select(&selector(css)?).next() {
            root = Some(el);
            break;
        }
    }
    let Some(root) = root else {
        return Ok(Vec::new());
    };

    let candidates = selector("p, li, h2, h3")?;
    let chunks = root
        .select(&candidates)
        .enumerate()
        .filter_map(|(i, el)| {
            let text = visible_text(&el).trim().to_string();
            (text.chars().count() > MIN_SECTION_CHARS).then(|| GuidelineChunk {
                source: source.to_string(),
                location: ChunkLocation::Section(i as u32 + 1),
                text,
                provenance: Provenance {
                    last_modified: last_modified.map(str::to_string),
                    hash: None,
                },
            })
        })
        .collect();

    Ok(chunks)
}

pub fn short_sha256(bytes: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(bytes));
    digest[..PDF_HASH_CHARS].to_string()
}

/// One chunk per page with extractable text, pages numbered from 1.
pub fn chunks_from_pdf_bytes(bytes: &[u8], source: &str) -> Result<Vec<GuidelineChunk>> {
    let hash = short_sha256(bytes);
    let document = lopdf::Document::load_mem(bytes)?;

    let mut chunks = Vec::new();
    for page_number in document.get_pages().into_keys() {
        let text = match document.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Skipping page {} of {}: {}", page_number, source, e);
                continue;
            }
        };
        if text.trim().is_empty() {
            continue;
        }
        chunks.push(GuidelineChunk {
            source: source.to_string(),
            location: ChunkLocation::Page(page_number),
            text,
            provenance: Provenance {
                last_modified: None,
                hash: Some(hash.clone()),
            },
        });
    }
    Ok(chunks)
}

pub struct GuidelineLoader {
    client: Client,
    allowed_domains: Vec<String>,
}

impl GuidelineLoader {
    pub fn new(config: &GuidelineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            allowed_domains: config.allowed_domains.clone(),
        })
    }

    pub async fn fetch_url(&self, url: &str) -> Result<Vec<GuidelineChunk>> {
        if !domain_allowed(url, &self.allowed_domains) {
            return Err(RagError::GuidelineError {
                message: format!(
                    "URL domain not in allowlist: {}. Provide a trusted guideline URL or a PDF.",
                    url
                ),
            });
        }

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RagError::ApiResponseError {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let html = response.text().await?;

        let chunks = chunks_from_html(&html, url, last_modified.as_deref())?;
        tracing::info!("🌐 Loaded {} web segments from {}", chunks.len(), url);
        Ok(chunks)
    }

    pub async fn load_pdf(&self, path: &str) -> Result<Vec<GuidelineChunk>> {
        let bytes = tokio::fs::read(path).await?;
        let source = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());

        let chunks = chunks_from_pdf_bytes(&bytes, &source)?;
        tracing::info!("📄 Loaded {} PDF pages from {}", chunks.len(), source);
        Ok(chunks)
    }

    /// Loads whichever source is configured. Failures degrade to no chunks.
    pub async fn load_configured(&self, config: &GuidelineConfig) -> Vec<GuidelineChunk> {
        let result = match (&config.url, &config.pdf_path) {
            (Some(url), _) => self.fetch_url(url).await,
            (None, Some(pdf)) => self.load_pdf(pdf).await,
            (None, None) => {
                tracing::info!("No guideline configured; claims will not be anchored");
                return Vec::new();
            }
        };

        match result {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!("⚠️ Guideline unavailable, continuing without anchoring: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const PAGE: &str = r#"<html><head><title>NG14</title><style>p { color: red }</style></head>
<body>
  <nav><p>Navigation text that is long enough to be a chunk but sits outside main.</p></nav>
  <main>
    <h2>Recommendations</h2>
    <p>Offer metformin as first-line treatment to adults with type 2 diabetes mellitus.<script>track()</script></p>
    <ul>
      <li>Review the dose if the estimated glomerular filtration rate is below 45 ml/min.</li>
    </ul>
  </main>
</body></html>"#;

    fn allowlist(extra: &[&str]) -> Vec<String> {
        let mut domains = GuidelineConfig::default().allowed_domains;
        domains.extend(extra.iter().map(|d| d.to_string()));
        domains
    }

    #[test]
    fn test_domain_allowlist() {
        let domains = allowlist(&[]);
        assert!(domain_allowed("https://www.nice.org.uk/guidance/ng14", &domains));
        assert!(domain_allowed("https://WHO.int:443/page", &domains));
        assert!(!domain_allowed("https://nice.org.uk.evil.com/page", &domains));
        assert!(!domain_allowed("not a url", &domains));
    }

    #[test]
    fn test_chunks_from_html_prefers_main() {
        let chunks = chunks_from_html(PAGE, "https://www.nice.org.uk/x", Some("Mon, 01 Jan 2024")).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].location, ChunkLocation::Section(2));
        assert_eq!(
            chunks[0].text,
            "Offer metformin as first-line treatment to adults with type 2 diabetes mellitus."
        );
        assert_eq!(chunks[1].location, ChunkLocation::Section(3));
        assert_eq!(
            chunks[1].provenance.last_modified.as_deref(),
            Some("Mon, 01 Jan 2024")
        );
    }

    #[test]
    fn test_short_sha256() {
        // sha256("abc") = ba7816bf8f01cfea...
        assert_eq!(short_sha256(b"abc"), "ba7816bf8f01");
    }

    #[test]
    fn test_noscript_text_is_kept() {
        let html = r#"<html><head><style>li { margin: 0 }</style></head><body><main>
<p>Consider an SGLT2 inhibitor for adults with chronic heart failure.<noscript> Interactive tools need JavaScript.</noscript><script>var x = 1;</script></p>
</main></body></html>"#;
        let chunks = chunks_from_html(html, "https://www.nice.org.uk/x", None).unwrap();

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("Interactive tools need JavaScript."));
        assert!(!chunks[0].text.contains("var x"));
        assert!(!chunks[0].text.contains("margin"));
    }

    fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
            ];
            if !text.is_empty() {
                operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
            }
            operations.push(Operation::new("ET", vec![]));
            let content = Content { operations };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_pdf_chunks_skip_blank_pages() {
        let bytes = pdf_with_pages(&["Offer metformin first line", "", "Stop if eGFR below 30"]);
        let chunks = chunks_from_pdf_bytes(&bytes, "protocol.pdf").unwrap();

        let locations: Vec<ChunkLocation> = chunks.iter().map(|c| c.location).collect();
        assert_eq!(locations, vec![ChunkLocation::Page(1), ChunkLocation::Page(3)]);
        assert!(chunks[0].text.contains("Offer metformin first line"));
        assert!(chunks[1].text.contains("Stop if eGFR below 30"));

        let hash = short_sha256(&bytes);
        assert_eq!(hash.len(), 12);
        for chunk in &chunks {
            assert_eq!(chunk.source, "protocol.pdf");
            assert_eq!(chunk.provenance.hash.as_deref(), Some(hash.as_str()));
            assert!(chunk.provenance.last_modified.is_none());
        }
    }

    #[test]
    fn test_invalid_pdf_is_an_error() {
        assert!(chunks_from_pdf_bytes(b"definitely not a pdf", "x.pdf").is_err());
    }

    #[tokio::test]
    async fn test_fetch_url_rejects_unlisted_domain() {
        let loader = GuidelineLoader::new(&GuidelineConfig::default()).unwrap();
        let err = loader.fetch_url("https://example.com/guideline").await.unwrap_err();
        assert!(matches!(err, RagError::GuidelineError { .. }));
    }

    #[tokio::test]
    async fn test_fetch_url_captures_last_modified() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/guidance/ng14").header("User-Agent", "Mozilla/5.0");
            then.status(200)
                .header("Content-Type", "text/html")
                .header("Last-Modified", "Wed, 21 Oct 2025 07:28:00 GMT")
                .body(PAGE);
        });

        let config = GuidelineConfig {
            allowed_domains: allowlist(&["127.0.0.1"]),
            ..GuidelineConfig::default()
        };
        let loader = GuidelineLoader::new(&config).unwrap();
        let chunks = loader.fetch_url(&server.url("/guidance/ng14")).await.unwrap();

        mock.assert();
        assert_eq!(chunks.len(), 2);
        assert_eq!(
            chunks[0].provenance.last_modified.as_deref(),
            Some("Wed, 21 Oct 2025 07:28:00 GMT")
        );
    }

    #[tokio::test]
    async fn test_load_configured_degrades_on_failure() {
        let config = GuidelineConfig {
            pdf_path: Some("/nonexistent/protocol.pdf".to_string()),
            ..GuidelineConfig::default()
        };
        let loader = GuidelineLoader::new(&config).unwrap();
        assert!(loader.load_configured(&config).await.is_empty());
    }
}
