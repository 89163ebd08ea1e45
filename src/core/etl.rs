use crate::core::Pipeline;
use crate::domain::model::RunSummary;
use crate::utils::error::Result;
use crate::utils::monitor::RunMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: RunMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: RunMonitor::new(monitor_enabled),
        }
    }

    /// Runs every table through extract → transform → load, in order.
    /// Stops at the first failing table; tables already loaded keep their
    /// checkpoints, so a re-run resumes where this one stopped.
    pub async fn run(&self) -> Result<RunSummary> {
        let tables = self.pipeline.tables();
        tracing::info!("Starting ETL run for {} tables", tables.len());

        let mut summary = RunSummary::default();

        for table in tables {
            tracing::info!("Processing table: {}", table);

            let raw = self.pipeline.extract(&table).await?;
            tracing::info!("Extracted {} rows from {}", raw.len(), table);
            self.monitor.log_stats(&format!("{} extract", table));

            let transformed = self.pipeline.transform(&table, raw).await?;
            self.monitor.log_stats(&format!("{} transform", table));

            let outcome = self.pipeline.load(&table, transformed).await?;
            self.monitor.log_stats(&format!("{} load", table));

            summary.outcomes.push(outcome);
        }

        tracing::info!(
            "✅ ETL run finished: {} uploaded, {} rejected, {} rows staged",
            summary.uploaded(),
            summary.rejected(),
            summary.rows_staged()
        );
        self.monitor.log_final_stats();

        Ok(summary)
    }
}
