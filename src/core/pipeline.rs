use crate::adapters::crts_log::{self, CrtsLogRow};
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{Document, GuidelineChunk, RunReport};
use crate::domain::ports::{EvidenceSource, LlmClient};
use crate::domain::services::{alignment, attestation, conflict, crts, network, risk, scoring};
use crate::utils::error::{RagError, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::{FileOptions, ZipWriter};

pub const REPORT_ENTRY: &str = "report.json";
pub const ATTESTATIONS_ENTRY: &str = "attestations.csv";
pub const NETWORK_ENTRY: &str = "network.json";

/// One row of `attestations.csv`.
#[derive(Debug, Serialize)]
struct AttestationRow<'a> {
    claim: &'a str,
    pmid: &'a str,
    document_title: &'a str,
    source_text: &'a str,
    guideline_source: &'a str,
    guideline_location: String,
    alignment_score: Option<f64>,
}

/// PubMed retrieval through CRTS scoring, bundled as a zip report.
pub struct EvidencePipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    source: Box<dyn EvidenceSource>,
    llm: Option<Box<dyn LlmClient>>,
    guidelines: Vec<GuidelineChunk>,
}

impl<S: Storage, C: ConfigProvider> EvidencePipeline<S, C> {
    pub fn new(storage: S, config: C, source: Box<dyn EvidenceSource>) -> Self {
        Self {
            storage,
            config,
            source,
            llm: None,
            guidelines: Vec::new(),
        }
    }

    pub fn with_llm(mut self, llm: Box<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_guidelines(mut self, chunks: Vec<GuidelineChunk>) -> Self {
        self.guidelines = chunks;
        self
    }

    /// Log files given as relative paths live next to the bundle.
    fn log_path(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(self.config.output_path()).join(path)
        }
    }

    fn attestations_csv(report: &RunReport) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for claim in &report.synthesis.claims {
            let matched = report
                .alignment
                .iter()
                .find(|a| a.claim == claim.claim)
                .and_then(|a| a.matched.as_ref());

            writer.serialize(AttestationRow {
                claim: &claim.claim,
                pmid: &claim.attestation.pmid,
                document_title: &claim.attestation.document_title,
                source_text: &claim.attestation.source_text,
                guideline_source: matched.map(|m| m.source.as_str()).unwrap_or(""),
                guideline_location: matched.map(|m| m.location.to_string()).unwrap_or_default(),
                alignment_score: matched.map(|m| m.score),
            })?;
        }
        writer
            .into_inner()
            .map_err(|e| RagError::ProcessingError {
                message: format!("Failed to finish attestations CSV: {}", e),
            })
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for EvidencePipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Document>> {
        let query = self.config.query();
        let ids = self.source.search(query, self.config.max_results()).await?;
        if ids.is_empty() {
            tracing::warn!("No PubMed results for '{}'", query);
            return Ok(Vec::new());
        }

        let documents = self.source.fetch_abstracts(&ids).await?;
        Ok(scoring::prioritise_documents(documents, query))
    }

    async fn transform(&self, documents: Vec<Document>) -> Result<RunReport> {
        let conflicts = conflict::detect_conflicts(&documents);

        let synthesis =
            attestation::generate_with_attestation(&documents, self.llm.as_deref()).await;

        let claims = synthesis.claim_texts();
        let alignment = alignment::align_claims_to_guidelines(
            &claims,
            &self.guidelines,
            self.config.alignment_threshold(),
        );
        let ga_metrics = alignment::compute_ga_metrics(&alignment);
        let provenance = alignment::provenance_summary(&alignment);
        tracing::debug!(
            "Guideline alignment: {}/{} claims matched",
            ga_metrics.matched,
            ga_metrics.total
        );

        let surfaced_risks = risk::estimate_surfaced_risks(&synthesis.text, conflicts.risk);
        let score = crts::compute_crts(&crts::CrtsInputs {
            synthesis: &synthesis,
            conflicts: &conflicts,
            alignment: &alignment,
            surfaced_risks,
            k_seconds: self.config.audit_k_seconds(),
            weights: self.config.crts_weights(),
        });

        let network = network::build_evidence_network(
            &documents,
            &conflicts.doc_tags,
            self.config.network_threshold(),
        );

        Ok(RunReport {
            timestamp: chrono::Utc::now(),
            query: self.config.query().to_string(),
            documents,
            conflicts,
            synthesis,
            alignment,
            ga_metrics,
            provenance,
            surfaced_risks,
            crts: score,
            network,
        })
    }

    async fn load(&self, report: &RunReport) -> Result<String> {
        let row = CrtsLogRow::new(&report.query, &report.crts, report.timestamp);
        let mut extra = serde_json::Map::new();
        extra.insert(
            "model".to_string(),
            serde_json::json!(self.llm.as_ref().map(|l| l.model_name())),
        );
        extra.insert("documents".to_string(), serde_json::json!(report.documents.len()));
        crts_log::log_both(
            &self.log_path(self.config.csv_log_file()),
            &self.log_path(self.config.jsonl_log_file()),
            &row,
            Some(&extra),
        )?;

        let bundle = self.config.bundle_file();
        let output_path = format!("{}/{}", self.config.output_path(), bundle);

        // 打包報告
        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

            zip.start_file::<_, ()>(REPORT_ENTRY, FileOptions::default())?;
            zip.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

            zip.start_file::<_, ()>(ATTESTATIONS_ENTRY, FileOptions::default())?;
            zip.write_all(&Self::attestations_csv(report)?)?;

            zip.start_file::<_, ()>(NETWORK_ENTRY, FileOptions::default())?;
            zip.write_all(serde_json::to_string_pretty(&report.network)?.as_bytes())?;

            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
        self.storage.write_file(bundle, &zip_data).await?;

        Ok(output_path)
    }
}
