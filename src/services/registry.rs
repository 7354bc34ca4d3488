use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::MonitorError;
use crate::models::{
    normalize_interval, CreateMonitorRequest, CreatedMonitor, Monitor, MonitorView,
};
use crate::services::gpu_prober::GpuProber;
use crate::services::process_provider::ProcessProvider;
use crate::services::sampler::Sampler;
use crate::state::MonitorStore;

/// Public surface over the monitor store and the per-monitor samplers.
pub struct MonitorRegistry {
    store: Arc<MonitorStore>,
    provider: Arc<dyn ProcessProvider>,
    gpu: Arc<dyn GpuProber>,
    next_id: AtomicU64,
    default_interval_ms: u64,
}

impl MonitorRegistry {
    pub fn new(
        provider: Arc<dyn ProcessProvider>,
        gpu: Arc<dyn GpuProber>,
        default_interval_ms: u64,
    ) -> Self {
        Self {
            store: Arc::new(MonitorStore::new()),
            provider,
            gpu,
            next_id: AtomicU64::new(1),
            default_interval_ms,
        }
    }

    /// Validates the request, registers an active monitor and starts its
    /// sampler. Must be called from inside a Tokio runtime.
    pub async fn create(&self, req: CreateMonitorRequest) -> Result<CreatedMonitor, MonitorError> {
        let name = req.name_pattern();
        if req.pid.is_none() && name.is_none() {
            return Err(MonitorError::BadRequest);
        }

        if let Some(pid) = req.pid {
            if self.provider.snapshot(pid).await?.is_none() {
                return Err(MonitorError::ProcessNotFound(pid));
            }
        }

        let interval_ms = normalize_interval(req.interval_ms, self.default_interval_ms);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        self.store
            .insert(Monitor::new(id.clone(), req.pid, name.clone(), interval_ms))?;

        let task = Sampler::new(
            id.clone(),
            self.store.clone(),
            self.provider.clone(),
            self.gpu.clone(),
        )
        .spawn(Duration::from_millis(interval_ms));

        // A delete may already have raced in; then nobody else will stop it.
        if !self.store.attach_task(&id, task.abort_handle()) {
            task.abort();
        }

        log::info!(
            "✓ Monitor '{}' created (pid={:?}, name={:?}, every {}ms)",
            id,
            req.pid,
            name,
            interval_ms
        );

        Ok(CreatedMonitor {
            monitor_id: id,
            pid: req.pid,
            name,
        })
    }

    pub fn get(&self, id: &str) -> Result<MonitorView, MonitorError> {
        self.store
            .get(id)
            .ok_or_else(|| MonitorError::NotFound(id.to_string()))
    }

    /// All monitors, oldest first.
    pub fn list(&self) -> Vec<MonitorView> {
        let mut views = self.store.list();
        views.sort_by_key(|v| v.id.parse::<u64>().unwrap_or(u64::MAX));
        views
    }

    /// Removes the monitor and cancels its sampler.
    ///
    /// Once this returns no tick can touch the monitor again: removal and
    /// `update_last` share the store lock, and updates to missing handles
    /// are dropped.
    pub fn delete(&self, id: &str) -> Result<(), MonitorError> {
        let mut monitor = self
            .store
            .remove(id)
            .ok_or_else(|| MonitorError::NotFound(id.to_string()))?;
        monitor.cancel();
        log::info!("✓ Monitor '{}' deleted", id);
        Ok(())
    }

    /// Stops and drops every monitor. Returns how many were removed.
    pub fn shutdown(&self) -> usize {
        let monitors = self.store.drain();
        let count = monitors.len();
        for mut monitor in monitors {
            monitor.cancel();
        }
        count
    }
}
