use clap::Parser;
use clinical_rag::domain::ports::LlmClient;
use clinical_rag::utils::error::ErrorSeverity;
use clinical_rag::utils::{logger, validation::Validate};
use clinical_rag::{
    render_summary, CliConfig, EvidencePipeline, GeminiClient, GuidelineLoader, LocalStorage,
    PubMedClient, RagError, RunSettings, VerifiabilityEngine,
};

async fn run(settings: RunSettings) -> clinical_rag::Result<()> {
    let config = &settings.config;

    let guidelines = GuidelineLoader::new(&config.guideline)?
        .load_configured(&config.guideline)
        .await;

    let llm: Option<Box<dyn LlmClient>> = match config.llm.active_key() {
        Some(key) => Some(Box::new(GeminiClient::new(&config.llm, key)?) as Box<dyn LlmClient>),
        None => {
            tracing::info!("No Gemini API key set; using deterministic extraction");
            None
        }
    };

    let monitor_enabled = config.monitoring.enabled;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 創建存儲和管道
    let storage = LocalStorage::new(config.output.output_path.clone());
    let source = Box::new(PubMedClient::new(&config.pubmed)?);
    let mut pipeline = EvidencePipeline::new(storage, settings.clone(), source)
        .with_guidelines(guidelines);
    if let Some(llm) = llm {
        pipeline = pipeline.with_llm(llm);
    }

    let engine = VerifiabilityEngine::new_with_monitoring(pipeline, monitor_enabled);
    let outcome = engine.run().await?;

    println!("{}", render_summary(&outcome.report));
    println!("\n📁 Report saved to: {}", outcome.output_path);
    Ok(())
}

fn report_failure(e: &RagError) -> i32 {
    tracing::error!(
        "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting clinical-rag CLI");

    let settings = match cli.resolve().and_then(|s| s.validate().map(|_| s)) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            let code = report_failure(&e);
            std::process::exit(code.max(1));
        }
    };

    if let Err(e) = run(settings).await {
        let code = report_failure(&e);
        if code > 0 {
            std::process::exit(code);
        }
    }

    Ok(())
}
