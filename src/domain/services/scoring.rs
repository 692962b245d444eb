//! Evidence prioritisation.
//!
//! Promotes high-value study designs while keeping safety literature
//! (post-marketing reports, registries) near the top so that dissenting
//! evidence is not buried under a consensus of efficacy trials.

use crate::domain::model::{round_to, Document};
use regex::Regex;
use std::sync::LazyLock;

const SAFETY_TERMS: &[&str] = &[
    "adverse",
    "toxicity",
    "contraindicat",
    "mortality",
    "risk",
    "harm",
    "side effect",
    "complication",
    "black box",
    "warning",
];

const SAFETY_STUDY_HINTS: &[&str] = &[
    "pharmacovigilance",
    "post-marketing",
    "registry",
    "surveillance",
    "real-world",
];

const QUERY_TERM_WEIGHT: f64 = 0.2;
const SAFETY_TERM_WEIGHT: f64 = 0.25;
const SAFETY_STUDY_WEIGHT: f64 = 0.3;

static QUERY_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W+").expect("query split pattern is valid"));

fn publication_type_weight(publication_type: &str) -> f64 {
    match publication_type {
        "Randomized Controlled Trial" | "Systematic Review" => 1.0,
        "Meta-Analysis" => 0.9,
        _ => 0.0,
    }
}

fn recency_boost(year: Option<&str>) -> f64 {
    match year.and_then(|y| y.trim().parse::<i32>().ok()) {
        Some(y) if y >= 2022 => 0.4,
        Some(y) if y >= 2019 => 0.25,
        _ => 0.0,
    }
}

fn term_hits(text: &str, terms: &[&str]) -> usize {
    terms.iter().filter(|t| text.contains(*t)).count()
}

pub fn query_terms(query: &str) -> Vec<String> {
    QUERY_SPLIT_RE
        .split(query)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn score_document(doc: &Document, query_terms: &[String]) -> f64 {
    let text = doc.full_text().to_lowercase();
    let mut score = 0.0;

    for term in query_terms {
        if !term.is_empty() && text.contains(&term.to_lowercase()) {
            score += QUERY_TERM_WEIGHT;
        }
    }

    score += doc
        .publication_types
        .iter()
        .map(|p| publication_type_weight(p))
        .sum::<f64>();

    score += SAFETY_TERM_WEIGHT * term_hits(&text, SAFETY_TERMS) as f64;
    score += SAFETY_STUDY_WEIGHT * term_hits(&text, SAFETY_STUDY_HINTS) as f64;
    score += recency_boost(doc.year.as_deref());

    round_to(score, 3)
}

/// Scores every document and orders by score descending, PMID ascending.
pub fn prioritise_documents(mut documents: Vec<Document>, query: &str) -> Vec<Document> {
    let terms = query_terms(query);
    for doc in documents.iter_mut() {
        doc.priority_score = score_document(doc, &terms);
    }

    documents.sort_by(|a, b| {
        b.priority_score
            .total_cmp(&a.priority_score)
            .then_with(|| a.pmid.cmp(&b.pmid))
    });

    tracing::debug!(
        "Prioritised {} documents for query '{}'",
        documents.len(),
        query
    );
    documents
}
