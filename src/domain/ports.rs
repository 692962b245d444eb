use crate::domain::model::{CrtsWeights, Document, RunReport};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn query(&self) -> &str;
    fn output_path(&self) -> &str;
    fn max_results(&self) -> usize;
    fn crts_weights(&self) -> CrtsWeights;
    fn audit_k_seconds(&self) -> f64;
    fn alignment_threshold(&self) -> f64;
    fn network_threshold(&self) -> f64;
    fn csv_log_file(&self) -> &str;
    fn jsonl_log_file(&self) -> &str;
    fn bundle_file(&self) -> &str;
}

/// A bibliographic search backend.
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>>;
    async fn fetch_abstracts(&self, ids: &[String]) -> Result<Vec<Document>>;
}

/// A text-completion model used for claim extraction.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    fn model_name(&self) -> &str;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Document>>;
    async fn transform(&self, documents: Vec<Document>) -> Result<RunReport>;
    async fn load(&self, report: &RunReport) -> Result<String>;
}
