//! Guideline anchoring: matches each claim to its closest guideline chunk.

use crate::domain::model::{
    round_to, ClaimAlignment, GaMetrics, GuidelineChunk, GuidelineMatch, ProvenanceSummary,
};
use crate::domain::services::tfidf::{cosine_similarity, TfidfVectorizer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

pub const DEFAULT_ALIGNMENT_THRESHOLD: f64 = 0.15;

fn unaligned(claims: &[String]) -> Vec<ClaimAlignment> {
    claims
        .iter()
        .map(|c| ClaimAlignment {
            claim: c.clone(),
            matched: None,
        })
        .collect()
}

/// TF-IDF cosine alignment; the vocabulary is fitted on the guideline chunks.
pub fn align_claims_to_guidelines(
    claims: &[String],
    chunks: &[GuidelineChunk],
    threshold: f64,
) -> Vec<ClaimAlignment> {
    if claims.is_empty() || chunks.is_empty() {
        return unaligned(claims);
    }

    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    let Some(vectorizer) = TfidfVectorizer::fit(&texts) else {
        tracing::warn!("Guideline text has no indexable terms; no claims can be aligned");
        return unaligned(claims);
    };
    let chunk_vectors = vectorizer.transform_all(&texts);

    claims
        .iter()
        .map(|claim| {
            let claim_vector = vectorizer.transform(claim);
            let mut best_idx = 0;
            let mut best_score = f64::MIN;
            for (idx, chunk_vector) in chunk_vectors.iter().enumerate() {
                let score = cosine_similarity(&claim_vector, chunk_vector);
                if score > best_score {
                    best_idx = idx;
                    best_score = score;
                }
            }

            let matched = (best_score >= threshold).then(|| {
                let chunk = &chunks[best_idx];
                GuidelineMatch {
                    source: chunk.source.clone(),
                    location: chunk.location,
                    score: round_to(best_score, 2),
                    provenance: chunk.provenance.clone(),
                }
            });

            ClaimAlignment {
                claim: claim.clone(),
                matched,
            }
        })
        .collect()
}

pub fn compute_ga_metrics(alignment: &[ClaimAlignment]) -> GaMetrics {
    let total = alignment.len();
    let matched = alignment.iter().filter(|a| a.matched.is_some()).count();
    let ga = if total > 0 {
        matched as f64 / total as f64
    } else {
        0.0
    };
    GaMetrics { ga, matched, total }
}

/// Sorted, de-duplicated sources and versioning metadata of matched chunks.
pub fn provenance_summary(alignment: &[ClaimAlignment]) -> ProvenanceSummary {
    let mut sources = BTreeSet::new();
    let mut last_modified = BTreeSet::new();
    let mut hashes = BTreeSet::new();

    for m in alignment.iter().filter_map(|a| a.matched.as_ref()) {
        if !m.source.is_empty() {
            sources.insert(m.source.clone());
        }
        if let Some(lm) = m.provenance.last_modified.as_ref().filter(|s| !s.is_empty()) {
            last_modified.insert(lm.clone());
        }
        if let Some(h) = m.provenance.hash.as_ref().filter(|s| !s.is_empty()) {
            hashes.insert(h.clone());
        }
    }

    ProvenanceSummary {
        sources: sources.into_iter().collect(),
        last_modified: last_modified.into_iter().collect(),
        pdf_hashes: hashes.into_iter().collect(),
    }
}

/// Keyword rule for the legacy curated-guideline check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordGuideline {
    pub id: String,
    pub keyword: String,
}

/// Case-insensitive keyword scan of a synthesis, returning matched ids and
/// how long the scan took.
pub fn keyword_alignment(synthesis: &str, guidelines: &[KeywordGuideline]) -> (Vec<String>, Duration) {
    let start = Instant::now();
    let lowered = synthesis.to_lowercase();
    let matches = guidelines
        .iter()
        .filter(|g| {
            let keyword = g.keyword.to_lowercase();
            !keyword.is_empty() && lowered.contains(&keyword)
        })
        .map(|g| g.id.clone())
        .collect();
    (matches, start.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ChunkLocation, Provenance};

    fn chunk(source: &str, location: ChunkLocation, text: &str, provenance: Provenance) -> GuidelineChunk {
        GuidelineChunk {
            source: source.to_string(),
            location,
            text: text.to_string(),
            provenance,
        }
    }

    fn chunks() -> Vec<GuidelineChunk> {
        vec![
            chunk(
                "https://www.nice.org.uk/guidance/ng28",
                ChunkLocation::Section(1),
                "Offer standard-release metformin as first-line drug treatment for adults with type 2 diabetes.",
                Provenance {
                    last_modified: Some("Tue, 01 Aug 2023 10:00:00 GMT".to_string()),
                    hash: None,
                },
            ),
            chunk(
                "protocol.pdf",
                ChunkLocation::Page(4),
                "Monitor renal function before prescribing and stop if eGFR falls below 30.",
                Provenance {
                    last_modified: None,
                    hash: Some("abcdef012345".to_string()),
                },
            ),
        ]
    }

    #[test]
    fn test_alignment_picks_best_chunk() {
        let claims = vec![
            "Metformin is first-line treatment in type 2 diabetes.".to_string(),
            "Check renal function and eGFR before prescribing.".to_string(),
            "Zebras migrate seasonally.".to_string(),
        ];
        let alignment = align_claims_to_guidelines(&claims, &chunks(), DEFAULT_ALIGNMENT_THRESHOLD);

        assert_eq!(alignment.len(), 3);
        let first = alignment[0].matched.as_ref().unwrap();
        assert_eq!(first.location, ChunkLocation::Section(1));
        assert!(first.score >= DEFAULT_ALIGNMENT_THRESHOLD);
        let second = alignment[1].matched.as_ref().unwrap();
        assert_eq!(second.source, "protocol.pdf");
        assert_eq!(second.provenance.hash.as_deref(), Some("abcdef012345"));
        assert!(alignment[2].matched.is_none());
    }

    #[test]
    fn test_empty_inputs_align_nothing() {
        let claims = vec!["Anything.".to_string()];
        let alignment = align_claims_to_guidelines(&claims, &[], DEFAULT_ALIGNMENT_THRESHOLD);
        assert_eq!(alignment.len(), 1);
        assert!(alignment[0].matched.is_none());
        assert!(align_claims_to_guidelines(&[], &chunks(), DEFAULT_ALIGNMENT_THRESHOLD).is_empty());
    }

    #[test]
    fn test_ga_metrics_and_provenance() {
        let claims = vec![
            "Metformin is first-line treatment in type 2 diabetes.".to_string(),
            "Check renal function and eGFR before prescribing.".to_string(),
            "Zebras migrate seasonally.".to_string(),
            "Unrelated astronomy remark about comets.".to_string(),
        ];
        let alignment = align_claims_to_guidelines(&claims, &chunks(), DEFAULT_ALIGNMENT_THRESHOLD);

        let ga = compute_ga_metrics(&alignment);
        assert_eq!(ga.matched, 2);
        assert_eq!(ga.total, 4);
        assert!((ga.ga - 0.5).abs() < 1e-12);

        let prov = provenance_summary(&alignment);
        assert_eq!(
            prov.sources,
            vec!["https://www.nice.org.uk/guidance/ng28", "protocol.pdf"]
        );
        assert_eq!(prov.last_modified, vec!["Tue, 01 Aug 2023 10:00:00 GMT"]);
        assert_eq!(prov.pdf_hashes, vec!["abcdef012345"]);
    }

    #[test]
    fn test_ga_metrics_empty() {
        let ga = compute_ga_metrics(&[]);
        assert_eq!(ga.total, 0);
        assert_eq!(ga.ga, 0.0);
    }

    #[test]
    fn test_keyword_alignment() {
        let guidelines = vec![
            KeywordGuideline {
                id: "NG28".to_string(),
                keyword: "Metformin".to_string(),
            },
            KeywordGuideline {
                id: "NG136".to_string(),
                keyword: "hypertension".to_string(),
            },
            KeywordGuideline {
                id: "EMPTY".to_string(),
                keyword: String::new(),
            },
        ];
        let (matches, _latency) = keyword_alignment("metformin remains first line", &guidelines);
        assert_eq!(matches, vec!["NG28"]);
    }
}
