use crate::core::Pipeline;
use crate::domain::model::RunReport;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Where the bundle went and what it contains.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub output_path: String,
    pub report: RunReport,
}

pub struct VerifiabilityEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> VerifiabilityEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        tracing::info!("Starting evidence synthesis run");
        self.monitor.log_stats("Start");

        // Extract
        let documents = self.pipeline.extract().await?;
        tracing::info!("Retrieved {} documents", documents.len());
        self.monitor.log_stats("Extract");

        // Transform
        let report = self.pipeline.transform(documents).await?;
        tracing::info!(
            "Synthesised {} claims, CRTS {:.2}",
            report.synthesis.claims.len(),
            report.crts.crts
        );
        self.monitor.log_stats("Transform");

        // Load
        let output_path = self.pipeline.load(&report).await?;
        tracing::info!("Report saved to: {}", output_path);
        self.monitor.log_stats("Load");

        if self.monitor.is_enabled() {
            self.monitor.log_final_stats();
        }

        Ok(RunOutcome {
            output_path,
            report,
        })
    }
}
