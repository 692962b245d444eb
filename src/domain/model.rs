use serde::{Deserialize, Serialize};
use std::fmt;

/// A retrieved study abstract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub pmid: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub publication_types: Vec<String>,
    pub year: Option<String>,
    #[serde(default)]
    pub priority_score: f64,
}

impl Document {
    pub fn new(pmid: impl Into<String>, title: impl Into<String>, abstract_text: impl Into<String>) -> Self {
        Self {
            pmid: pmid.into(),
            title: title.into(),
            abstract_text: abstract_text.into(),
            ..Default::default()
        }
    }

    pub fn with_publication_types(mut self, types: &[&str]) -> Self {
        self.publication_types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into());
        self
    }

    /// Title and abstract joined by a space, the text every classifier looks at.
    pub fn full_text(&self) -> String {
        format!("{} {}", self.title, self.abstract_text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocTag {
    pub pmid: String,
    pub supportive: bool,
    pub risk: bool,
    pub support_terms: Vec<String>,
    pub risk_terms: Vec<String>,
}

/// Corpus-level dissent summary. `detected` holds when both camps are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictSummary {
    pub detected: bool,
    pub supportive: usize,
    pub risk: usize,
    pub doc_tags: Vec<DocTag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attestation {
    pub pmid: String,
    pub source_text: String,
    pub document_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttestedClaim {
    pub claim: String,
    pub attestation: Attestation,
}

impl AttestedClaim {
    pub fn is_grounded(&self) -> bool {
        !self.attestation.source_text.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisOrigin {
    Llm,
    Deterministic,
}

/// Synthesis text plus its claims, each unique and in generation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synthesis {
    pub text: String,
    pub claims: Vec<AttestedClaim>,
    pub origin: SynthesisOrigin,
}

impl Synthesis {
    pub fn claim_texts(&self) -> Vec<String> {
        self.claims.iter().map(|c| c.claim.clone()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkLocation {
    Page(u32),
    Section(u32),
}

impl fmt::Display for ChunkLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkLocation::Page(n) => write!(f, "{}", n),
            ChunkLocation::Section(n) => write!(f, "Section {}", n),
        }
    }
}

/// Versioning metadata kept alongside guideline text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub last_modified: Option<String>,
    pub hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidelineChunk {
    pub source: String,
    pub location: ChunkLocation,
    pub text: String,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidelineMatch {
    pub source: String,
    pub location: ChunkLocation,
    pub score: f64,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimAlignment {
    pub claim: String,
    pub matched: Option<GuidelineMatch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaMetrics {
    pub ga: f64,
    pub matched: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceSummary {
    pub sources: Vec<String>,
    pub last_modified: Vec<String>,
    pub pdf_hashes: Vec<String>,
}

pub const DEFAULT_WEIGHTS: CrtsWeights = CrtsWeights {
    alpha: 0.30,
    beta: 0.30,
    gamma: 0.20,
    delta: 0.20,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrtsWeights {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
}

impl Default for CrtsWeights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

impl CrtsWeights {
    /// Scales the weights to sum to one, falling back to the defaults when
    /// the total is not positive.
    pub fn normalized(&self) -> Self {
        let total = self.alpha + self.beta + self.gamma + self.delta;
        if !(total > 0.0) {
            return DEFAULT_WEIGHTS;
        }
        Self {
            alpha: self.alpha / total,
            beta: self.beta / total,
            gamma: self.gamma / total,
            delta: self.delta / total,
        }
    }
}

/// Clinical RAG Transparency Score and its components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrtsScore {
    pub sf: f64,
    pub crr: f64,
    pub ar: f64,
    pub ga: f64,
    #[serde(rename = "L")]
    pub latency_secs: f64,
    pub weights: CrtsWeights,
    pub crts: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: String,
    pub label: String,
    pub colour: String,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub source: String,
    pub target: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceNetwork {
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
}

/// Everything produced for a single query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub query: String,
    pub documents: Vec<Document>,
    pub conflicts: ConflictSummary,
    pub synthesis: Synthesis,
    pub alignment: Vec<ClaimAlignment>,
    pub ga_metrics: GaMetrics,
    pub provenance: ProvenanceSummary,
    pub surfaced_risks: usize,
    pub crts: CrtsScore,
    pub network: EvidenceNetwork,
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
