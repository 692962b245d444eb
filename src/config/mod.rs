#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::domain::model::CrtsWeights;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{RagError, Result};
use crate::utils::validation::Validate;
use toml_config::RagConfig;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, LocalStorage};

/// A resolved run: the query plus file settings with command-line overrides
/// applied.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub query: String,
    pub config: RagConfig,
}

impl RunSettings {
    pub fn new(query: impl Into<String>, config: RagConfig) -> Self {
        Self {
            query: query.into(),
            config,
        }
    }
}

impl ConfigProvider for RunSettings {
    fn query(&self) -> &str {
        &self.query
    }

    fn output_path(&self) -> &str {
        &self.config.output.output_path
    }

    fn max_results(&self) -> usize {
        self.config.pubmed.max_results
    }

    fn crts_weights(&self) -> CrtsWeights {
        self.config.crts.weights()
    }

    fn audit_k_seconds(&self) -> f64 {
        self.config.crts.audit_k_seconds
    }

    fn alignment_threshold(&self) -> f64 {
        self.config.guideline.alignment_threshold
    }

    fn network_threshold(&self) -> f64 {
        self.config.network.similarity_threshold
    }

    fn csv_log_file(&self) -> &str {
        &self.config.output.csv_log
    }

    fn jsonl_log_file(&self) -> &str {
        &self.config.output.jsonl_log
    }

    fn bundle_file(&self) -> &str {
        &self.config.output.bundle
    }
}

impl Validate for RunSettings {
    fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(RagError::MissingConfigError {
                field: "query".to_string(),
            });
        }
        self.config.validate()
    }
}
