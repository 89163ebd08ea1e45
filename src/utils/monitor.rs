use std::time::{Duration, Instant};

#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

#[derive(Debug, Clone)]
pub struct RunStats {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub peak_memory_mb: u64,
    pub elapsed_time: Duration,
}

/// Tracks how long an ingest or load run takes, and with the `cli` feature
/// also the process CPU and memory footprint.
pub struct RunMonitor {
    start_time: Instant,
    enabled: bool,
    #[cfg(feature = "cli")]
    system: Mutex<System>,
    #[cfg(feature = "cli")]
    pid: Option<Pid>,
    #[cfg(feature = "cli")]
    peak_memory: Mutex<u64>,
}

impl RunMonitor {
    pub fn new(enabled: bool) -> Self {
        #[cfg(feature = "cli")]
        let system = {
            let mut system = System::new_with_specifics(RefreshKind::everything());
            if enabled {
                system.refresh_all();
            }
            system
        };

        Self {
            start_time: Instant::now(),
            enabled,
            #[cfg(feature = "cli")]
            system: Mutex::new(system),
            #[cfg(feature = "cli")]
            pid: sysinfo::get_current_pid().ok(),
            #[cfg(feature = "cli")]
            peak_memory: Mutex::new(0),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    #[cfg(feature = "cli")]
    pub fn get_stats(&self) -> Option<RunStats> {
        if !self.enabled {
            return None;
        }

        let mut system = self.system.lock().ok()?;
        system.refresh_all();

        let process = system.process(self.pid?)?;
        let memory_mb = process.memory() / 1024 / 1024;

        let mut peak = self.peak_memory.lock().ok()?;
        if memory_mb > *peak {
            *peak = memory_mb;
        }

        Some(RunStats {
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            peak_memory_mb: *peak,
            elapsed_time: self.elapsed(),
        })
    }

    #[cfg(not(feature = "cli"))]
    pub fn get_stats(&self) -> Option<RunStats> {
        None
    }

    pub fn log_stats(&self, phase: &str) {
        if !self.enabled {
            return;
        }
        match self.get_stats() {
            Some(stats) => tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB, Peak: {}MB, Time: {:?}",
                phase,
                stats.cpu_usage,
                stats.memory_usage_mb,
                stats.peak_memory_mb,
                stats.elapsed_time
            ),
            None => tracing::info!("📊 {} - Time: {:?}", phase, self.elapsed()),
        }
    }

    pub fn log_final_stats(&self) {
        let minutes = self.elapsed().as_secs_f64() / 60.0;
        match self.get_stats() {
            Some(stats) => tracing::info!(
                "📊 Run finished in {:.2} minutes, peak memory {}MB",
                minutes,
                stats.peak_memory_mb
            ),
            None => tracing::info!("⏱️ Run finished in {:.2} minutes", minutes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_monitor_has_no_stats() {
        let monitor = RunMonitor::new(false);
        assert!(monitor.get_stats().is_none());
        monitor.log_stats("extract");
    }
}
