// Adapters layer: concrete implementations for external systems (NCBI, Gemini,
// guideline sources, log files).

pub mod crts_log;
pub mod gemini;
pub mod guideline;
pub mod pubmed;

pub use gemini::GeminiClient;
pub use guideline::GuidelineLoader;
pub use pubmed::PubMedClient;
