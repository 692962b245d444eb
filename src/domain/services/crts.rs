//! Clinical RAG Transparency Score.
//!
//! `CRTS = alpha*SF + beta*CRR + gamma*AR* + delta*GA` where
//!
//! - SF: share of claims carrying a non-empty attestation,
//! - CRR: surfaced over detected risk signals, 1 when none were detected,
//! - AR*: `min(1, k / L)` with audit latency `L` set by attestation granularity,
//! - GA: share of claims anchored to a guideline chunk.

use crate::domain::model::{round_to, ClaimAlignment, ConflictSummary, CrtsScore, CrtsWeights, Synthesis};

pub const DEFAULT_AUDIT_K_SECONDS: f64 = 5.0;
/// Seconds to audit a claim that points at an exact source sentence.
pub const GRANULAR_AUDIT_SECONDS: f64 = 2.0;
/// Seconds to audit a claim that only cites a document.
pub const COARSE_AUDIT_SECONDS: f64 = 5.0;

#[derive(Debug, Clone, Copy)]
pub struct CrtsInputs<'a> {
    pub synthesis: &'a Synthesis,
    pub conflicts: &'a ConflictSummary,
    pub alignment: &'a [ClaimAlignment],
    pub surfaced_risks: usize,
    pub k_seconds: f64,
    pub weights: CrtsWeights,
}

pub fn compute_crts(inputs: &CrtsInputs<'_>) -> CrtsScore {
    let claims = &inputs.synthesis.claims;
    let n_claims = claims.len();

    let sf = if n_claims > 0 {
        claims.iter().filter(|c| c.is_grounded()).count() as f64 / n_claims as f64
    } else {
        0.0
    };

    let detected = inputs.conflicts.risk;
    let crr = if detected > 0 {
        (inputs.surfaced_risks as f64 / detected as f64).clamp(0.0, 1.0)
    } else {
        1.0
    };

    let latency = if claims.iter().any(|c| c.is_grounded()) {
        GRANULAR_AUDIT_SECONDS
    } else {
        COARSE_AUDIT_SECONDS
    };
    let ar = (inputs.k_seconds / latency).min(1.0);

    let ga = if !inputs.alignment.is_empty() && n_claims > 0 {
        inputs.alignment.iter().filter(|a| a.matched.is_some()).count() as f64 / n_claims as f64
    } else {
        0.0
    };

    let w = inputs.weights.normalized();
    let composite = w.alpha * sf + w.beta * crr + w.gamma * ar + w.delta * ga;

    CrtsScore {
        sf: round_to(sf, 2),
        crr: round_to(crr, 2),
        ar: round_to(ar, 2),
        ga: round_to(ga, 2),
        latency_secs: latency,
        weights: w,
        crts: round_to(composite, 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Attestation, AttestedClaim, ChunkLocation, GuidelineMatch, Provenance, SynthesisOrigin};

    fn claim(text: &str, source_text: &str) -> AttestedClaim {
        AttestedClaim {
            claim: text.to_string(),
            attestation: Attestation {
                pmid: "1".to_string(),
                source_text: source_text.to_string(),
                document_title: "T".to_string(),
            },
        }
    }

    fn synthesis(claims: Vec<AttestedClaim>) -> Synthesis {
        Synthesis {
            text: String::new(),
            claims,
            origin: SynthesisOrigin::Deterministic,
        }
    }

    fn aligned(claim: &str, hit: bool) -> ClaimAlignment {
        ClaimAlignment {
            claim: claim.to_string(),
            matched: hit.then(|| GuidelineMatch {
                source: "g".to_string(),
                location: ChunkLocation::Page(1),
                score: 0.5,
                provenance: Provenance::default(),
            }),
        }
    }

    #[test]
    fn test_full_score() {
        let s = synthesis(vec![claim("a.", "a"), claim("b.", "b"), claim("c.", ""), claim("d.", "d")]);
        let conflicts = ConflictSummary {
            detected: true,
            supportive: 3,
            risk: 4,
            doc_tags: vec![],
        };
        let alignment = vec![aligned("a.", true), aligned("b.", false), aligned("c.", true), aligned("d.", false)];

        let score = compute_crts(&CrtsInputs {
            synthesis: &s,
            conflicts: &conflicts,
            alignment: &alignment,
            surfaced_risks: 1,
            k_seconds: DEFAULT_AUDIT_K_SECONDS,
            weights: CrtsWeights::default(),
        });

        assert_eq!(score.sf, 0.75);
        assert_eq!(score.crr, 0.25);
        assert_eq!(score.latency_secs, GRANULAR_AUDIT_SECONDS);
        assert_eq!(score.ar, 1.0);
        assert_eq!(score.ga, 0.5);
        // 0.3*0.75 + 0.3*0.25 + 0.2*1.0 + 0.2*0.5
        assert_eq!(score.crts, 0.6);
    }

    #[test]
    fn test_no_claims_and_no_conflicts() {
        let s = synthesis(vec![]);
        let conflicts = ConflictSummary::default();
        let score = compute_crts(&CrtsInputs {
            synthesis: &s,
            conflicts: &conflicts,
            alignment: &[],
            surfaced_risks: 0,
            k_seconds: 2.5,
            weights: CrtsWeights::default(),
        });

        assert_eq!(score.sf, 0.0);
        assert_eq!(score.crr, 1.0);
        assert_eq!(score.latency_secs, COARSE_AUDIT_SECONDS);
        assert_eq!(score.ar, 0.5);
        assert_eq!(score.ga, 0.0);
        assert_eq!(score.crts, 0.4);
    }

    #[test]
    fn test_weights_are_normalized() {
        let s = synthesis(vec![claim("a.", "a")]);
        let conflicts = ConflictSummary::default();
        let score = compute_crts(&CrtsInputs {
            synthesis: &s,
            conflicts: &conflicts,
            alignment: &[],
            surfaced_risks: 0,
            k_seconds: DEFAULT_AUDIT_K_SECONDS,
            weights: CrtsWeights {
                alpha: 2.0,
                beta: 0.0,
                gamma: 0.0,
                delta: 2.0,
            },
        });

        assert_eq!(score.weights.alpha, 0.5);
        assert_eq!(score.weights.delta, 0.5);
        assert_eq!(score.crts, 0.5);
    }
}
