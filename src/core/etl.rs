use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting DBF conversion...");
        self.monitor.log_stats("Start");

        // Extract
        let input = self.pipeline.extract().await?;
        tracing::info!("📥 Read {} bytes of input", input.len());
        self.monitor.log_stats("Extract");

        // Transform
        let converted = self.pipeline.transform(input).await?;
        tracing::info!(
            "🔄 Converted {} records into {} columns",
            converted.total_count,
            converted.fields.len()
        );
        self.monitor.log_stats("Transform");

        // Load
        let output_path = self.pipeline.load(converted).await?;
        tracing::info!("💾 Output saved to: {}", output_path);
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}
