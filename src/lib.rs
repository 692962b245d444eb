pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, CliConfig};

pub use adapters::{GeminiClient, GuidelineLoader, PubMedClient};
pub use config::{toml_config::RagConfig, RunSettings};
pub use core::{
    engine::{RunOutcome, VerifiabilityEngine},
    pipeline::EvidencePipeline,
    summary::render_summary,
};
pub use utils::error::{RagError, Result};
