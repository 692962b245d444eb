//! Claim-level attestation.
//!
//! An LLM may propose claims, but a claim survives only when its quoted
//! source sentence occurs verbatim in the cited abstract. Without a model (or
//! when it yields nothing verifiable) claims are extracted deterministically
//! from the top abstracts.

use crate::domain::model::{Attestation, AttestedClaim, Document, Synthesis, SynthesisOrigin};
use crate::domain::ports::LlmClient;
use crate::utils::error::{RagError, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::LazyLock;

pub const CONTEXT_DOCUMENTS: usize = 3;
pub const MAX_ABSTRACT_CHARS: usize = 900;
pub const MAX_LLM_CLAIMS: usize = 6;
const MIN_SENTENCE_CHARS: usize = 30;
const FALLBACK_SENTENCES_PER_DOC: usize = 2;
const FALLBACK_SUFFIX: &str = " (Deterministic Extraction)";

static SENTENCE_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("sentence pattern is valid"));

/// Splits after `.`, `!` or `?` followed by whitespace and keeps sentences
/// longer than 30 characters.
pub fn split_sentences(text: &str) -> Vec<String> {
    let text = text.trim();
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in SENTENCE_END_RE.find_iter(text) {
        // the terminator is a single ASCII byte
        sentences.push(&text[start..m.start() + 1]);
        start = m.end();
    }
    sentences.push(&text[start..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .map(str::to_string)
        .collect()
}

pub fn normalize_claim(claim: &str) -> String {
    if claim.ends_with(['.', '!', '?']) {
        claim.to_string()
    } else {
        format!("{}.", claim)
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn build_prompt(documents: &[Document]) -> String {
    let context = documents
        .iter()
        .take(CONTEXT_DOCUMENTS)
        .map(|d| {
            format!(
                "PMID:{}\nTitle:{}\nAbstract:{}",
                d.pmid,
                d.title,
                truncate_chars(&d.abstract_text, MAX_ABSTRACT_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    [
        "You are producing *auditable* outputs for clinical evidence synthesis.",
        "Extract 4-6 Atomic Claims (individual clinical facts) from the abstracts.",
        "For each claim, provide the exact sentence from the source abstract as 'source_text' and the correct 'pmid'.",
        "Return ONLY valid JSON (no markdown) with keys: synthesis, attestations.",
        "Example schema:",
        "{",
        "  \"synthesis\": \"One or two sentences summarising the overall picture.\",",
        "  \"attestations\": {",
        "     \"<atomic claim text>\": {\"pmid\": \"<pmid>\", \"source_text\": \"<exact sentence>\", \"document_title\": \"<title>\"}",
        "  }",
        "}",
        "Context:",
        &context,
    ]
    .join("\n")
}

#[derive(Debug, Deserialize)]
struct LlmPayload {
    #[serde(default)]
    synthesis: serde_json::Value,
    #[serde(default)]
    attestations: serde_json::Map<String, serde_json::Value>,
}

fn json_field_as_string(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string().trim().to_string(),
    }
}

/// Parses a model reply (optionally wrapped in markdown fences) and keeps only
/// claims whose source text is found verbatim in the cited abstract.
pub fn validate_llm_response(raw: &str, documents: &[Document]) -> Result<Synthesis> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let payload: LlmPayload =
        serde_json::from_str(cleaned.trim()).map_err(|e| RagError::LlmContractError {
            message: format!("reply is not valid JSON: {}", e),
        })?;

    let by_pmid: HashMap<&str, &Document> =
        documents.iter().map(|d| (d.pmid.as_str(), d)).collect();

    let mut claims: Vec<AttestedClaim> = Vec::new();
    for (claim, meta) in &payload.attestations {
        let pmid = json_field_as_string(meta.get("pmid"));
        let source_text = json_field_as_string(meta.get("source_text"));
        if pmid.is_empty() || source_text.is_empty() {
            continue;
        }
        let Some(doc) = by_pmid.get(pmid.as_str()) else {
            tracing::debug!("Dropping claim citing unknown PMID {}", pmid);
            continue;
        };
        if !doc.abstract_text.contains(&source_text) {
            tracing::debug!("Dropping claim whose source text is not in PMID {}", pmid);
            continue;
        }

        let claim = normalize_claim(claim);
        if claims.iter().any(|c| c.claim == claim) {
            continue;
        }
        claims.push(AttestedClaim {
            claim,
            attestation: Attestation {
                pmid,
                source_text,
                document_title: doc.title.clone(),
            },
        });
    }
    claims.truncate(MAX_LLM_CLAIMS);

    let text = match &payload.synthesis {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    };

    Ok(Synthesis {
        text,
        claims,
        origin: SynthesisOrigin::Llm,
    })
}

pub fn deterministic_synthesis(documents: &[Document]) -> Synthesis {
    let mut claims: Vec<AttestedClaim> = Vec::new();
    let mut leads: Vec<String> = Vec::new();

    for doc in documents.iter().take(CONTEXT_DOCUMENTS) {
        let sentences = split_sentences(&doc.abstract_text);
        for sentence in sentences.iter().take(FALLBACK_SENTENCES_PER_DOC) {
            let claim = normalize_claim(sentence);
            if claims.iter().any(|c| c.claim == claim) {
                continue;
            }
            claims.push(AttestedClaim {
                claim,
                attestation: Attestation {
                    pmid: doc.pmid.clone(),
                    source_text: sentence.clone(),
                    document_title: doc.title.clone(),
                },
            });
        }
        if let Some(first) = sentences.into_iter().next() {
            leads.push(first);
        }
    }

    leads.truncate(2);
    Synthesis {
        text: format!("{}{}", leads.join(" "), FALLBACK_SUFFIX),
        claims,
        origin: SynthesisOrigin::Deterministic,
    }
}

/// Produces the synthesis, preferring the model when one is configured.
pub async fn generate_with_attestation(
    documents: &[Document],
    llm: Option<&dyn LlmClient>,
) -> Synthesis {
    if let Some(llm) = llm {
        let prompt = build_prompt(documents);
        let reply = llm.complete(&prompt).await;
        match reply.and_then(|raw| validate_llm_response(&raw, documents)) {
            Ok(synthesis) if !synthesis.claims.is_empty() => {
                tracing::info!(
                    "{} produced {} verified claims",
                    llm.model_name(),
                    synthesis.claims.len()
                );
                return synthesis;
            }
            Ok(_) => {
                tracing::warn!("LLM returned no verifiable claims; using deterministic fallback.")
            }
            Err(e) if e.is_quota_exceeded() => {
                tracing::warn!("API quota reached. Using deterministic fallback.")
            }
            Err(e) => tracing::error!("LLM error: {}; using deterministic fallback.", e),
        }
    }

    deterministic_synthesis(documents)
}
