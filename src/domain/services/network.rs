//! Evidence similarity network: documents are nodes, edges join abstracts
//! whose TF-IDF cosine similarity reaches the threshold.

use crate::domain::model::{DocTag, Document, EvidenceNetwork, NetworkEdge, NetworkNode};
use crate::domain::services::tfidf::{cosine_similarity, TfidfVectorizer};

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.25;

pub const COLOUR_SUPPORT: &str = "#2ecc71";
pub const COLOUR_RISK: &str = "#e74c3c";
pub const COLOUR_BOTH: &str = "#FF8C00";
pub const COLOUR_NEUTRAL: &str = "#95a5a6";

pub fn node_colour(tag: Option<&DocTag>) -> &'static str {
    match tag {
        Some(t) if t.supportive && t.risk => COLOUR_BOTH,
        Some(t) if t.risk => COLOUR_RISK,
        Some(t) if t.supportive => COLOUR_SUPPORT,
        _ => COLOUR_NEUTRAL,
    }
}

fn or_dash(terms: &[String]) -> String {
    if terms.is_empty() {
        "-".to_string()
    } else {
        terms.join(", ")
    }
}

fn tooltip(doc: &Document, tag: Option<&DocTag>) -> String {
    let mut text = format!(
        "PMID: {}\nTitle: {}\nYear: {}\nType: {}",
        doc.pmid,
        doc.title,
        doc.year.as_deref().unwrap_or(""),
        doc.publication_types.join(", ")
    );
    if let Some(tag) = tag {
        text.push_str(&format!(
            "\nSupport terms: {}\nRisk terms: {}",
            or_dash(&tag.support_terms),
            or_dash(&tag.risk_terms)
        ));
    }
    text
}

/// `tags` is positional: `tags[i]` describes `documents[i]` when present.
pub fn build_evidence_network(
    documents: &[Document],
    tags: &[DocTag],
    similarity_threshold: f64,
) -> EvidenceNetwork {
    let texts: Vec<&str> = documents.iter().map(|d| d.abstract_text.as_str()).collect();
    if texts.iter().all(|t| t.trim().is_empty()) {
        return EvidenceNetwork::default();
    }

    let nodes = documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            let tag = tags.get(i);
            NetworkNode {
                id: doc.pmid.clone(),
                label: format!("PMID: {}", doc.pmid),
                colour: node_colour(tag).to_string(),
                tooltip: tooltip(doc, tag),
            }
        })
        .collect();

    let mut edges = Vec::new();
    if let Some(vectorizer) = TfidfVectorizer::fit(&texts) {
        let vectors = vectorizer.transform_all(&texts);
        for i in 0..vectors.len() {
            for j in (i + 1)..vectors.len() {
                let similarity = cosine_similarity(&vectors[i], &vectors[j]);
                if similarity >= similarity_threshold {
                    edges.push(NetworkEdge {
                        source: documents[i].pmid.clone(),
                        target: documents[j].pmid.clone(),
                        similarity,
                    });
                }
            }
        }
    }

    tracing::debug!("Evidence network: {} edges", edges.len());
    EvidenceNetwork { nodes, edges }
}
