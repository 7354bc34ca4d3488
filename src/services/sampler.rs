use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::models::{MonitorState, Snapshot};
use crate::services::gpu_prober::GpuProber;
use crate::services::process_provider::{find_by_name, ProcessProvider};
use crate::state::MonitorStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Stop,
}

/// Periodic sampler bound to a single monitor.
pub struct Sampler {
    id: String,
    store: Arc<MonitorStore>,
    provider: Arc<dyn ProcessProvider>,
    gpu: Arc<dyn GpuProber>,
}

impl Sampler {
    pub fn new(
        id: String,
        store: Arc<MonitorStore>,
        provider: Arc<dyn ProcessProvider>,
        gpu: Arc<dyn GpuProber>,
    ) -> Self {
        Self {
            id,
            store,
            provider,
            gpu,
        }
    }

    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        tokio::spawn(self.run(period))
    }

    /// Ticks every `period`, first one a full period after start.
    ///
    /// Ticks run inline in this loop, so they never overlap; a tick that
    /// overruns makes the missed ones get skipped rather than queued.
    async fn run(self, period: Duration) {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if self.tick().await == TickOutcome::Stop {
                break;
            }
        }
        log::debug!("Sampler for monitor '{}' stopped", self.id);
    }

    pub async fn tick(&self) -> TickOutcome {
        let Some(target) = self.store.target(&self.id) else {
            return TickOutcome::Stop;
        };

        let pid = match target.pid {
            Some(pid) => pid,
            None => {
                let table = match self.provider.process_table().await {
                    Ok(table) => table,
                    Err(e) => {
                        log::warn!("Monitor '{}': process table unavailable: {}", self.id, e);
                        return TickOutcome::Continue;
                    }
                };
                let pattern = target.name.as_deref().unwrap_or_default();
                let matched = (!pattern.is_empty())
                    .then(|| find_by_name(&table, pattern))
                    .flatten();

                match matched {
                    Some(entry) => match self.store.adopt_pid(&self.id, entry.pid) {
                        Some(pid) => {
                            log::info!(
                                "Monitor '{}': resolved '{}' to PID {}",
                                self.id,
                                pattern,
                                pid
                            );
                            pid
                        }
                        None => return TickOutcome::Stop,
                    },
                    None => {
                        log::debug!("Monitor '{}': no process matches '{}'", self.id, pattern);
                        return self.record(Snapshot::unresolved(), MonitorState::Running);
                    }
                }
            }
        };

        match self.provider.snapshot(pid).await {
            Ok(Some(usage)) => {
                let gpu_memory_mb = self.gpu.gpu_memory_mb(pid).await;
                self.record(
                    Snapshot::from_usage(usage, gpu_memory_mb),
                    MonitorState::Running,
                )
            }
            Ok(None) => {
                log::info!("Monitor '{}': PID {} exited, stopping", self.id, pid);
                self.record(Snapshot::exited(pid), MonitorState::Exited);
                TickOutcome::Stop
            }
            Err(e) => {
                log::warn!("Monitor '{}': sampling PID {} failed: {}", self.id, pid, e);
                TickOutcome::Continue
            }
        }
    }

    fn record(&self, snapshot: Snapshot, state: MonitorState) -> TickOutcome {
        if self.store.update_last(&self.id, snapshot, state) {
            TickOutcome::Continue
        } else {
            TickOutcome::Stop
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Monitor;
    use crate::services::testing::{FakeGpu, FakeProvider};

    fn sampler(store: &Arc<MonitorStore>, provider: &Arc<FakeProvider>, gpu: Option<u64>) -> Sampler {
        Sampler::new(
            "1".to_string(),
            store.clone(),
            provider.clone(),
            Arc::new(FakeGpu(gpu)),
        )
    }

    fn store_with(pid: Option<u32>, name: Option<&str>) -> Arc<MonitorStore> {
        let store = Arc::new(MonitorStore::new());
        store
            .insert(Monitor::new(
                "1".to_string(),
                pid,
                name.map(str::to_string),
                1000,
            ))
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_tick_records_found_snapshot() {
        let provider = Arc::new(FakeProvider::new());
        provider.start(4321, "postgres");
        let store = store_with(Some(4321), None);

        assert_eq!(sampler(&store, &provider, Some(64)).tick().await, TickOutcome::Continue);

        let last = store.get("1").unwrap().last.unwrap();
        assert!(last.found);
        assert_eq!(last.pid, Some(4321));
        assert_eq!(last.name.as_deref(), Some("postgres"));
        assert!(last.cpu_percent.is_some());
        assert_eq!(last.gpu_memory_mb, Some(64));
    }

    #[tokio::test]
    async fn test_tick_without_match_keeps_pid_unresolved() {
        let provider = Arc::new(FakeProvider::new());
        provider.start(10, "bash");
        let store = store_with(None, Some("chrome"));

        assert_eq!(sampler(&store, &provider, None).tick().await, TickOutcome::Continue);

        let view = store.get("1").unwrap();
        assert!(view.active);
        assert_eq!(view.pid, None);
        assert!(!view.last.unwrap().found);
    }

    #[tokio::test]
    async fn test_tick_adopts_first_matching_pid() {
        let provider = Arc::new(FakeProvider::new());
        provider.start(30, "chrome");
        provider.start(20, "Chrome Helper");
        let store = store_with(None, Some("CHROME"));
        let sampler = sampler(&store, &provider, None);

        sampler.tick().await;
        assert_eq!(store.get("1").unwrap().pid, Some(20));

        // The adopted pid sticks even if the name would now match elsewhere.
        provider.stop(20);
        provider.start(5, "chrome");
        assert_eq!(sampler.tick().await, TickOutcome::Stop);
        let view = store.get("1").unwrap();
        assert_eq!(view.pid, Some(20));
        assert!(view.exited);
    }

    #[tokio::test]
    async fn test_tick_detects_exit() {
        let provider = Arc::new(FakeProvider::new());
        let store = store_with(Some(99), None);

        assert_eq!(sampler(&store, &provider, None).tick().await, TickOutcome::Stop);

        let view = store.get("1").unwrap();
        assert!(!view.active);
        assert!(view.exited);
        let last = view.last.unwrap();
        assert!(!last.found);
        assert_eq!(last.exited, Some(true));
    }

    #[tokio::test]
    async fn test_provider_failure_is_soft() {
        let provider = Arc::new(FakeProvider::new());
        provider.start(7, "db");
        let store = store_with(Some(7), None);
        let sampler = sampler(&store, &provider, None);

        sampler.tick().await;
        let before = store.get("1").unwrap();

        provider.set_failing(true);
        assert_eq!(sampler.tick().await, TickOutcome::Continue);
        assert_eq!(store.get("1").unwrap(), before);

        provider.set_failing(false);
        assert_eq!(sampler.tick().await, TickOutcome::Continue);
        assert!(store.get("1").unwrap().active);
    }

    #[tokio::test]
    async fn test_tick_stops_when_monitor_removed() {
        let provider = Arc::new(FakeProvider::new());
        provider.start(7, "db");
        let store = store_with(Some(7), None);
        store.remove("1");

        assert_eq!(sampler(&store, &provider, None).tick().await, TickOutcome::Stop);
        assert!(store.get("1").is_none());
    }
}
