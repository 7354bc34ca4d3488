use lazy_static::lazy_static;
use prometheus::{
    register_gauge_vec_with_registry, register_int_gauge_with_registry, Encoder, GaugeVec,
    IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::MonitorView;

pub struct MetricsRegistry {
    registry: Registry,
    // Held across reset, repopulate and gather so scrapes never interleave
    scrape: Mutex<()>,

    pub monitor_count: IntGauge,
    pub monitor_active: GaugeVec,
    pub monitor_cpu_percent: GaugeVec,
    pub monitor_memory_percent: GaugeVec,
    pub monitor_memory_kb: GaugeVec,
    pub monitor_gpu_memory_mb: GaugeVec,
}

impl MetricsRegistry {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let labels = &["id", "name"];

        let monitor_count = register_int_gauge_with_registry!(
            Opts::new("process_monitor_count", "Number of registered monitors"),
            registry
        )?;

        let monitor_active = register_gauge_vec_with_registry!(
            Opts::new("process_monitor_active", "Monitor is sampling (1) or stopped (0)"),
            labels,
            registry
        )?;

        let monitor_cpu_percent = register_gauge_vec_with_registry!(
            Opts::new("process_monitor_cpu_percent", "Last sampled CPU usage percentage"),
            labels,
            registry
        )?;

        let monitor_memory_percent = register_gauge_vec_with_registry!(
            Opts::new("process_monitor_memory_percent", "Last sampled memory usage percentage"),
            labels,
            registry
        )?;

        let monitor_memory_kb = register_gauge_vec_with_registry!(
            Opts::new("process_monitor_memory_kb", "Last sampled resident memory in KiB"),
            labels,
            registry
        )?;

        let monitor_gpu_memory_mb = register_gauge_vec_with_registry!(
            Opts::new("process_monitor_gpu_memory_mb", "Last sampled GPU memory in MiB"),
            labels,
            registry
        )?;

        Ok(Self {
            registry,
            scrape: Mutex::new(()),
            monitor_count,
            monitor_active,
            monitor_cpu_percent,
            monitor_memory_percent,
            monitor_memory_kb,
            monitor_gpu_memory_mb,
        })
    }

    /// Rebuilds every series from `monitors` and renders the text format.
    pub fn update_and_render(
        &self,
        monitors: &[MonitorView],
    ) -> Result<String, Box<dyn std::error::Error>> {
        let _guard = self.scrape.lock().unwrap_or_else(PoisonError::into_inner);
        self.update(monitors);
        self.render()
    }

    /// Deleted monitors drop out.
    fn update(&self, monitors: &[MonitorView]) {
        self.monitor_active.reset();
        self.monitor_cpu_percent.reset();
        self.monitor_memory_percent.reset();
        self.monitor_memory_kb.reset();
        self.monitor_gpu_memory_mb.reset();

        self.monitor_count.set(monitors.len() as i64);

        for monitor in monitors {
            let last = monitor.last.as_ref();
            let name = monitor
                .name
                .as_deref()
                .or_else(|| last.and_then(|s| s.name.as_deref()))
                .unwrap_or("");
            let labels = &[monitor.id.as_str(), name];

            self.monitor_active
                .with_label_values(labels)
                .set(if monitor.active { 1.0 } else { 0.0 });

            // Only found snapshots carry resource figures
            let Some(snap) = last.filter(|s| s.found) else {
                continue;
            };
            if let Some(cpu) = snap.cpu_percent {
                self.monitor_cpu_percent.with_label_values(labels).set(cpu as f64);
            }
            if let Some(mem) = snap.mem_percent {
                self.monitor_memory_percent.with_label_values(labels).set(mem as f64);
            }
            if let Some(kb) = snap.memory_kb {
                self.monitor_memory_kb.with_label_values(labels).set(kb as f64);
            }
            if let Some(mb) = snap.gpu_memory_mb {
                self.monitor_gpu_memory_mb.with_label_values(labels).set(mb as f64);
            }
        }
    }

    fn render(&self) -> Result<String, Box<dyn std::error::Error>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

lazy_static! {
    pub static ref METRICS: Option<Arc<MetricsRegistry>> = match MetricsRegistry::new() {
        Ok(registry) => Some(Arc::new(registry)),
        Err(e) => {
            log::error!("Failed to build metrics registry: {}", e);
            None
        }
    };
}
