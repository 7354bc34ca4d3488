//! In-memory collaborators for driving monitors in tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::ProviderError;
use crate::models::{ProcessEntry, ProcessUsage};
use crate::services::gpu_prober::GpuProber;
use crate::services::process_provider::ProcessProvider;

pub struct FakeProvider {
    processes: Mutex<Vec<ProcessEntry>>,
    failing: AtomicBool,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            processes: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn start(&self, pid: u32, name: &str) {
        let mut processes = self.processes.lock().unwrap();
        processes.push(ProcessEntry {
            pid,
            name: name.to_string(),
        });
        processes.sort_by_key(|p| p.pid);
    }

    pub fn stop(&self, pid: u32) {
        self.processes.lock().unwrap().retain(|p| p.pid != pid);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), ProviderError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(ProviderError::Poisoned)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ProcessProvider for FakeProvider {
    async fn snapshot(&self, pid: u32) -> Result<Option<ProcessUsage>, ProviderError> {
        self.check()?;
        let processes = self.processes.lock().unwrap();
        Ok(processes.iter().find(|p| p.pid == pid).map(|p| ProcessUsage {
            pid,
            name: p.name.clone(),
            cpu_percent: Some(1.5),
            mem_percent: Some(0.25),
            memory_kb: Some(2048),
        }))
    }

    async fn process_table(&self) -> Result<Vec<ProcessEntry>, ProviderError> {
        self.check()?;
        Ok(self.processes.lock().unwrap().clone())
    }
}

pub struct FakeGpu(pub Option<u64>);

#[async_trait]
impl GpuProber for FakeGpu {
    async fn gpu_memory_mb(&self, _pid: u32) -> Option<u64> {
        self.0
    }
}
