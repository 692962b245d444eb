use crate::domain::model::CrtsWeights;
use crate::domain::services::alignment::DEFAULT_ALIGNMENT_THRESHOLD;
use crate::domain::services::crts::DEFAULT_AUDIT_K_SECONDS;
use crate::domain::services::network::DEFAULT_SIMILARITY_THRESHOLD;
use crate::utils::error::{RagError, Result};
use crate::utils::validation::{
    validate_file_extensions, validate_non_empty_string, validate_path, validate_positive_number,
    validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

pub const DEFAULT_PUBMED_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-lite";
pub const DEFAULT_NICE_URL: &str = "https://www.nice.org.uk/guidance/ng14";

pub const DEFAULT_ALLOWED_GUIDELINE_DOMAINS: &[&str] = &[
    "www.nice.org.uk",
    "nice.org.uk",
    "www.who.int",
    "who.int",
    "www.gov.uk",
    "gov.uk",
    "www.nhs.uk",
    "nhs.uk",
    "ecdc.europa.eu",
    "www.ecdc.europa.eu",
];

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

/// File-based settings. Every section and field is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub pubmed: PubMedConfig,
    pub llm: LlmConfig,
    pub guideline: GuidelineConfig,
    pub crts: CrtsConfig,
    pub network: NetworkConfig,
    pub output: OutputConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PubMedConfig {
    pub base_url: String,
    pub email: Option<String>,
    pub api_key: Option<String>,
    pub max_results: usize,
    pub timeout_seconds: u64,
}

impl Default for PubMedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PUBMED_BASE_URL.to_string(),
            email: None,
            api_key: None,
            max_results: 10,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            timeout_seconds: 60,
        }
    }
}

impl LlmConfig {
    /// The key, if one is set and not blank.
    pub fn active_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidelineConfig {
    pub url: Option<String>,
    pub pdf_path: Option<String>,
    pub allowed_domains: Vec<String>,
    pub timeout_seconds: u64,
    pub alignment_threshold: f64,
}

impl Default for GuidelineConfig {
    fn default() -> Self {
        Self {
            url: None,
            pdf_path: None,
            allowed_domains: DEFAULT_ALLOWED_GUIDELINE_DOMAINS
                .iter()
                .map(|d| d.to_string())
                .collect(),
            timeout_seconds: 10,
            alignment_threshold: DEFAULT_ALIGNMENT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrtsConfig {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
    pub audit_k_seconds: f64,
}

impl Default for CrtsConfig {
    fn default() -> Self {
        let w = CrtsWeights::default();
        Self {
            alpha: w.alpha,
            beta: w.beta,
            gamma: w.gamma,
            delta: w.delta,
            audit_k_seconds: DEFAULT_AUDIT_K_SECONDS,
        }
    }
}

impl CrtsConfig {
    pub fn weights(&self) -> CrtsWeights {
        CrtsWeights {
            alpha: self.alpha,
            beta: self.beta,
            gamma: self.gamma,
            delta: self.delta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub similarity_threshold: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_path: String,
    pub csv_log: String,
    pub jsonl_log: String,
    pub bundle: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            csv_log: "crts_log.csv".to_string(),
            jsonl_log: "crts_log.jsonl".to_string(),
            bundle: "crts_report.zip".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl RagConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RagError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| RagError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GEMINI_API_KEY})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_url("pubmed.base_url", &self.pubmed.base_url)?;
        validate_positive_number("pubmed.max_results", self.pubmed.max_results, 1)?;
        validate_url("llm.base_url", &self.llm.base_url)?;
        validate_non_empty_string("llm.model", &self.llm.model)?;

        if let Some(url) = &self.guideline.url {
            validate_url("guideline.url", url)?;
        }
        if let Some(pdf) = &self.guideline.pdf_path {
            validate_path("guideline.pdf_path", pdf)?;
            validate_file_extensions("guideline.pdf_path", std::slice::from_ref(pdf), &["pdf"])?;
        }
        if self.guideline.url.is_some() && self.guideline.pdf_path.is_some() {
            return Err(RagError::ConfigError {
                message: "Specify either a guideline URL or a PDF, not both".to_string(),
            });
        }
        validate_range(
            "guideline.alignment_threshold",
            self.guideline.alignment_threshold,
            0.0,
            1.0,
        )?;

        validate_range("crts.alpha", self.crts.alpha, 0.0, 1.0)?;
        validate_range("crts.beta", self.crts.beta, 0.0, 1.0)?;
        validate_range("crts.gamma", self.crts.gamma, 0.0, 1.0)?;
        validate_range("crts.delta", self.crts.delta, 0.0, 1.0)?;
        if !(self.crts.audit_k_seconds > 0.0) {
            return Err(RagError::InvalidConfigValueError {
                field: "crts.audit_k_seconds".to_string(),
                value: self.crts.audit_k_seconds.to_string(),
                reason: "Value must be positive".to_string(),
            });
        }

        validate_range(
            "network.similarity_threshold",
            self.network.similarity_threshold,
            0.0,
            1.0,
        )?;

        validate_path("output.output_path", &self.output.output_path)?;
        validate_path("output.csv_log", &self.output.csv_log)?;
        validate_path("output.jsonl_log", &self.output.jsonl_log)?;
        validate_path("output.bundle", &self.output.bundle)?;

        Ok(())
    }
}

impl Validate for RagConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
