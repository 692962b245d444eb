use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned HTTP {status} for {url}")]
    ApiResponseError { status: u16, url: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("PDF parsing error: {0}")]
    PdfError(#[from] lopdf::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Guideline ingestion error: {message}")]
    GuidelineError { message: String },

    #[error("LLM contract violation: {message}")]
    LlmContractError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    Storage,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RagError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RagError::ApiError(_) | RagError::ApiResponseError { .. } => ErrorCategory::Network,
            RagError::ConfigError { .. }
            | RagError::ConfigValidationError { .. }
            | RagError::InvalidConfigValueError { .. }
            | RagError::MissingConfigError { .. } => ErrorCategory::Configuration,
            RagError::ZipError(_) | RagError::IoError(_) | RagError::CsvError(_) => {
                ErrorCategory::Storage
            }
            RagError::GuidelineError { .. } | RagError::LlmContractError { .. } => {
                ErrorCategory::External
            }
            RagError::SerializationError(_)
            | RagError::XmlError(_)
            | RagError::PdfError(_)
            | RagError::ProcessingError { .. } => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RagError::LlmContractError { .. } => ErrorSeverity::Low,
            RagError::ApiError(_)
            | RagError::ApiResponseError { .. }
            | RagError::GuidelineError { .. } => ErrorSeverity::Medium,
            RagError::IoError(_) | RagError::ZipError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            RagError::ApiResponseError { status, .. } => Some(*status),
            RagError::ApiError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_quota_exceeded(&self) -> bool {
        self.status() == Some(429)
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network if self.is_quota_exceeded() => {
                "The remote API quota is exhausted; wait before retrying or supply an NCBI/Gemini API key"
            }
            ErrorCategory::Network => {
                "Check network connectivity and the configured endpoint URLs, then retry"
            }
            ErrorCategory::Configuration => {
                "Review the command line flags and the TOML configuration file"
            }
            ErrorCategory::Storage => {
                "Make sure the output directory exists and is writable"
            }
            ErrorCategory::External => {
                "Use an allowlisted guideline URL or a local PDF, or run without an LLM key"
            }
            ErrorCategory::Data => {
                "The upstream response could not be interpreted; retry with a narrower query"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            RagError::ApiResponseError { status: 429, .. } => {
                "Rate limit reached on a remote service".to_string()
            }
            RagError::ApiResponseError { status, url } => {
                format!("Remote service at {} answered with HTTP {}", url, status)
            }
            RagError::ApiError(_) => "Could not reach a remote service".to_string(),
            RagError::MissingConfigError { field } => {
                format!("Missing required setting '{}'", field)
            }
            RagError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
