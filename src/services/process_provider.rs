use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};

use crate::error::ProviderError;
use crate::models::{ProcessEntry, ProcessUsage};

/// Source of per-process resource samples.
///
/// A vanished process is `Ok(None)`; `Err` is reserved for the provider
/// itself failing.
#[async_trait]
pub trait ProcessProvider: Send + Sync {
    async fn snapshot(&self, pid: u32) -> Result<Option<ProcessUsage>, ProviderError>;

    /// All live processes, in the order name lookups should scan them.
    async fn process_table(&self) -> Result<Vec<ProcessEntry>, ProviderError>;
}

/// sysinfo-backed provider.
///
/// Keeps one `System` alive so CPU usage is measured between consecutive
/// refreshes instead of reading zero every time.
pub struct SysinfoProvider {
    system: Arc<Mutex<System>>,
}

impl SysinfoProvider {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        Self {
            system: Arc::new(Mutex::new(system)),
        }
    }
}

impl Default for SysinfoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessProvider for SysinfoProvider {
    async fn snapshot(&self, pid: u32) -> Result<Option<ProcessUsage>, ProviderError> {
        let system = self.system.clone();

        tokio::task::spawn_blocking(move || -> Result<Option<ProcessUsage>, ProviderError> {
            let mut sys = system.lock().map_err(|_| ProviderError::Poisoned)?;
            let sysinfo_pid = Pid::from_u32(pid);

            sys.refresh_memory();
            sys.refresh_processes(ProcessesToUpdate::Some(&[sysinfo_pid]), true);

            let total_memory = sys.total_memory();
            let Some(process) = sys.process(sysinfo_pid) else {
                return Ok(None);
            };
            if process.status() == ProcessStatus::Zombie {
                log::debug!("PID {} is a zombie, treating as gone", pid);
                return Ok(None);
            }

            let rss = process.memory();
            Ok(Some(ProcessUsage {
                pid,
                name: process.name().to_string_lossy().into_owned(),
                cpu_percent: Some(process.cpu_usage()),
                mem_percent: (total_memory > 0)
                    .then(|| (rss as f64 / total_memory as f64 * 100.0) as f32),
                memory_kb: Some(rss / 1024),
            }))
        })
        .await?
    }

    async fn process_table(&self) -> Result<Vec<ProcessEntry>, ProviderError> {
        let system = self.system.clone();

        tokio::task::spawn_blocking(move || -> Result<Vec<ProcessEntry>, ProviderError> {
            let mut sys = system.lock().map_err(|_| ProviderError::Poisoned)?;
            sys.refresh_processes(ProcessesToUpdate::All, true);

            let mut table: Vec<ProcessEntry> = sys
                .processes()
                .iter()
                .map(|(pid, process)| ProcessEntry {
                    pid: pid.as_u32(),
                    name: process.name().to_string_lossy().into_owned(),
                })
                .collect();
            table.sort_by_key(|entry| entry.pid);
            Ok(table)
        })
        .await?
    }
}

/// First entry whose name contains `pattern`, ignoring case.
pub fn find_by_name<'a>(table: &'a [ProcessEntry], pattern: &str) -> Option<&'a ProcessEntry> {
    let pattern = pattern.to_lowercase();
    table
        .iter()
        .find(|entry| entry.name.to_lowercase().contains(&pattern))
}
