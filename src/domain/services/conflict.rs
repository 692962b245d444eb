//! Keyword-based dissent detection.
//!
//! Tags each study as supportive and/or risk-signalling. Kept deterministic so
//! every tag can be traced back to the matched terms.

use crate::domain::model::{ConflictSummary, DocTag, Document};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static SUPPORTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)improv(e|ed|ement)|benefit(s|ed)?|effective|efficacy|survival advantage|response rate|superior(ity)?",
    )
    .expect("supportive pattern is valid")
});

static RISK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)toxicit(y|ies)|adverse( event|s)?|risk(s)?|harm(s|ful)?|side effect(s)?|complication(s)?|safety concern(s)?|contraindicat(ed|ion)",
    )
    .expect("risk pattern is valid")
});

fn matched_terms(re: &Regex, text: &str) -> Vec<String> {
    re.find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn tag_document(doc: &Document) -> DocTag {
    let text = doc.full_text();
    let support_terms = matched_terms(&SUPPORTIVE_RE, &text);
    let risk_terms = matched_terms(&RISK_RE, &text);

    DocTag {
        pmid: doc.pmid.clone(),
        supportive: !support_terms.is_empty(),
        risk: !risk_terms.is_empty(),
        support_terms,
        risk_terms,
    }
}

/// Counts supportive and risk-signalling documents across the corpus.
pub fn detect_conflicts(documents: &[Document]) -> ConflictSummary {
    let doc_tags: Vec<DocTag> = documents.iter().map(tag_document).collect();
    let supportive = doc_tags.iter().filter(|t| t.supportive).count();
    let risk = doc_tags.iter().filter(|t| t.risk).count();

    if supportive > 0 && risk > 0 {
        tracing::info!(
            "⚠️ Evidentiary dissent detected: {} supportive vs {} risk-signalling studies",
            supportive,
            risk
        );
    }

    ConflictSummary {
        detected: supportive > 0 && risk > 0,
        supportive,
        risk,
        doc_tags,
    }
}
