use crate::config::toml_config::{RagConfig, DEFAULT_NICE_URL};
use crate::config::RunSettings;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Parser)]
#[command(name = "clinical-rag")]
#[command(about = "Contradiction-aware clinical evidence synthesis with CRTS scoring")]
#[command(after_help = "Research decision-support tool. Not for clinical diagnosis or treatment.")]
pub struct CliConfig {
    /// Clinical research query sent to PubMed
    pub query: String,

    /// TOML configuration file; command-line flags take precedence
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Maximum number of PubMed records to retrieve")]
    pub max_results: Option<usize>,

    #[arg(long, env = "NCBI_EMAIL", help = "Contact e-mail sent to NCBI")]
    pub ncbi_email: Option<String>,

    #[arg(long, env = "NCBI_API_KEY", hide_env_values = true)]
    pub ncbi_api_key: Option<String>,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, help = "Enables LLM claim extraction")]
    pub gemini_api_key: Option<String>,

    #[arg(long, help = "Gemini model name")]
    pub model: Option<String>,

    /// Guideline page to anchor claims against (allowlisted domains only).
    /// Pass the value as `--guideline-url=<URL>`; the bare flag uses the NICE
    /// NG14 guideline.
    #[arg(
        long,
        value_name = "URL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = DEFAULT_NICE_URL,
        conflicts_with = "guideline_pdf"
    )]
    pub guideline_url: Option<String>,

    #[arg(long, help = "Local guideline or protocol PDF")]
    pub guideline_pdf: Option<String>,

    #[arg(long = "allow-domain", help = "Additional allowlisted guideline domain (repeatable)")]
    pub allow_domains: Vec<String>,

    #[arg(long)]
    pub alpha: Option<f64>,

    #[arg(long)]
    pub beta: Option<f64>,

    #[arg(long)]
    pub gamma: Option<f64>,

    #[arg(long)]
    pub delta: Option<f64>,

    #[arg(long, help = "Output directory for logs and the report bundle")]
    pub output_path: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,
}

impl CliConfig {
    /// Loads the optional config file and layers the flags on top.
    pub fn resolve(&self) -> Result<RunSettings> {
        let mut config = match &self.config {
            Some(path) => RagConfig::from_file(path)?,
            None => RagConfig::default(),
        };

        if let Some(n) = self.max_results {
            config.pubmed.max_results = n;
        }
        if let Some(email) = &self.ncbi_email {
            config.pubmed.email = Some(email.clone());
        }
        if let Some(key) = &self.ncbi_api_key {
            config.pubmed.api_key = Some(key.clone());
        }
        if let Some(key) = &self.gemini_api_key {
            config.llm.api_key = Some(key.clone());
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(url) = &self.guideline_url {
            config.guideline.url = Some(url.clone());
            config.guideline.pdf_path = None;
        }
        if let Some(pdf) = &self.guideline_pdf {
            config.guideline.pdf_path = Some(pdf.clone());
            config.guideline.url = None;
        }
        for domain in &self.allow_domains {
            let domain = domain.trim().to_lowercase();
            if !config.guideline.allowed_domains.contains(&domain) {
                config.guideline.allowed_domains.push(domain);
            }
        }
        if let Some(v) = self.alpha {
            config.crts.alpha = v;
        }
        if let Some(v) = self.beta {
            config.crts.beta = v;
        }
        if let Some(v) = self.gamma {
            config.crts.gamma = v;
        }
        if let Some(v) = self.delta {
            config.crts.delta = v;
        }
        if let Some(path) = &self.output_path {
            config.output.output_path = path.clone();
        }
        if self.monitor {
            config.monitoring.enabled = true;
        }

        Ok(RunSettings::new(self.query.clone(), config))
    }
}

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = Path::new(&self.base_path).join(path);
        let data = fs::read(full_path)?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }
}
