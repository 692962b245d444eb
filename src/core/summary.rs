//! Plain-text rendering of a run for the terminal.

use crate::domain::model::{RunReport, SynthesisOrigin};
use std::fmt::Write;

const RESEARCH_DISCLAIMER: &str =
    "Research and decision support only. Not a substitute for clinical judgement.";

pub fn render_summary(report: &RunReport) -> String {
    let mut out = String::new();
    write_summary(&mut out, report).expect("writing to a String cannot fail");
    out
}

/// Writes the terminal summary to any formatter sink, passing its errors up.
pub fn write_summary<W: Write>(out: &mut W, report: &RunReport) -> std::fmt::Result {
    writeln!(out, "Query: {}", report.query)?;
    writeln!(out, "Documents: {}", report.documents.len())?;

    let c = &report.conflicts;
    if c.detected {
        writeln!(
            out,
            "Evidentiary dissent: {} supportive vs {} risk-signalling",
            c.supportive, c.risk
        )?;
    } else {
        writeln!(
            out,
            "No dissent detected ({} supportive, {} risk-signalling)",
            c.supportive, c.risk
        )?;
    }

    let origin = match report.synthesis.origin {
        SynthesisOrigin::Llm => "LLM",
        SynthesisOrigin::Deterministic => "deterministic",
    };
    writeln!(out, "\nSynthesis ({}):\n{}", origin, report.synthesis.text)?;

    if !report.synthesis.claims.is_empty() {
        writeln!(out, "\nClaims:")?;
    }
    for (i, claim) in report.synthesis.claims.iter().enumerate() {
        writeln!(out, "{}. {} [PMID {}]", i + 1, claim.claim, claim.attestation.pmid)?;
        let matched = report
            .alignment
            .iter()
            .find(|a| a.claim == claim.claim)
            .and_then(|a| a.matched.as_ref());
        if let Some(m) = matched {
            writeln!(
                out,
                "   guideline: {} p/s {} (score {:.2})",
                m.source, m.location, m.score
            )?;
        }
    }

    let s = &report.crts;
    writeln!(
        out,
        "\nCRTS {:.2}  SF {:.2}  CRR {:.2}  AR* {:.2} (L={}s)  GA {:.2} ({}/{})",
        s.crts,
        s.sf,
        s.crr,
        s.ar,
        s.latency_secs,
        s.ga,
        report.ga_metrics.matched,
        report.ga_metrics.total
    )?;
    writeln!(out, "Surfaced risks: {}", report.surfaced_risks)?;
    writeln!(
        out,
        "Evidence network: {} nodes, {} edges",
        report.network.nodes.len(),
        report.network.edges.len()
    )?;
    write!(out, "\n{}", RESEARCH_DISCLAIMER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        Attestation, AttestedClaim, ChunkLocation, ClaimAlignment, ConflictSummary, CrtsScore,
        CrtsWeights, EvidenceNetwork, GaMetrics, GuidelineMatch, Provenance, ProvenanceSummary,
        Synthesis,
    };

    fn sample_report() -> RunReport {
        let claim = "Metformin lowered HbA1c in adults with type 2 diabetes.".to_string();
        RunReport {
            timestamp: chrono::Utc::now(),
            query: "metformin".to_string(),
            documents: Vec::new(),
            conflicts: ConflictSummary {
                detected: true,
                supportive: 3,
                risk: 1,
                doc_tags: Vec::new(),
            },
            synthesis: Synthesis {
                text: "Metformin lowers HbA1c.".to_string(),
                claims: vec![AttestedClaim {
                    claim: claim.clone(),
                    attestation: Attestation {
                        pmid: "123".to_string(),
                        source_text: claim.clone(),
                        document_title: "Trial".to_string(),
                    },
                }],
                origin: SynthesisOrigin::Llm,
            },
            alignment: vec![ClaimAlignment {
                claim,
                matched: Some(GuidelineMatch {
                    source: "ng28.pdf".to_string(),
                    location: ChunkLocation::Page(7),
                    score: 0.42,
                    provenance: Provenance::default(),
                }),
            }],
            ga_metrics: GaMetrics {
                ga: 1.0,
                matched: 1,
                total: 1,
            },
            provenance: ProvenanceSummary::default(),
            surfaced_risks: 0,
            crts: CrtsScore {
                sf: 1.0,
                crr: 0.0,
                ar: 1.0,
                ga: 1.0,
                latency_secs: 2.0,
                weights: CrtsWeights::default(),
                crts: 0.7,
            },
            network: EvidenceNetwork::default(),
        }
    }

    /// Accepts `limit` bytes, then fails every write.
    struct FullSink {
        written: String,
        limit: usize,
    }

    impl Write for FullSink {
        fn write_str(&mut self, s: &str) -> std::fmt::Result {
            if self.written.len() + s.len() > self.limit {
                return Err(std::fmt::Error);
            }
            self.written.push_str(s);
            Ok(())
        }
    }

    #[test]
    fn test_render_summary() {
        let report = sample_report();
        let text = render_summary(&report);
        assert!(text.contains("Evidentiary dissent: 3 supportive vs 1 risk-signalling"));
        assert!(text.contains("Synthesis (LLM)"));
        assert!(text.contains("[PMID 123]"));
        assert!(text.contains("guideline: ng28.pdf p/s 7 (score 0.42)"));
        assert!(text.contains("CRTS 0.70"));
        assert!(text.ends_with(RESEARCH_DISCLAIMER));
    }

    #[test]
    fn test_write_summary_reports_sink_errors() {
        let report = sample_report();
        let mut sink = FullSink {
            written: String::new(),
            limit: 40,
        };
        assert!(write_summary(&mut sink, &report).is_err());
        assert!(sink.written.starts_with("Query: metformin"));
        assert!(!sink.written.contains("CRTS"));

        let mut full = String::new();
        write_summary(&mut full, &report).unwrap();
        assert_eq!(full, render_summary(&report));
    }
}
