use chrono::{DateTime, Utc};
use serde::Serialize;

/// One observation of a monitored process.
///
/// A snapshot is built whole and swapped into the monitor; it is never
/// patched in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub pid: Option<u32>,
    pub name: Option<String>,
    pub cpu_percent: Option<f32>,
    pub mem_percent: Option<f32>,
    #[serde(rename = "memoryKB")]
    pub memory_kb: Option<u64>,
    #[serde(rename = "gpuMemoryMB")]
    pub gpu_memory_mb: Option<u64>,
    pub found: bool,
    /// Only set on the terminal snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exited: Option<bool>,
}

/// Point-in-time resource usage as reported by a process provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessUsage {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: Option<f32>,
    pub mem_percent: Option<f32>,
    pub memory_kb: Option<u64>,
}

/// Row of the process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
}

impl Snapshot {
    /// Target not resolved yet (name lookup had no match).
    pub fn unresolved() -> Self {
        Self::empty(None)
    }

    /// Terminal snapshot for a process that has gone away.
    pub fn exited(pid: u32) -> Self {
        Self {
            exited: Some(true),
            ..Self::empty(Some(pid))
        }
    }

    pub fn from_usage(usage: ProcessUsage, gpu_memory_mb: Option<u64>) -> Self {
        Self {
            timestamp: Utc::now(),
            pid: Some(usage.pid),
            name: Some(usage.name),
            cpu_percent: usage.cpu_percent,
            mem_percent: usage.mem_percent,
            memory_kb: usage.memory_kb,
            gpu_memory_mb,
            found: true,
            exited: None,
        }
    }

    fn empty(pid: Option<u32>) -> Self {
        Self {
            timestamp: Utc::now(),
            pid,
            name: None,
            cpu_percent: None,
            mem_percent: None,
            memory_kb: None,
            gpu_memory_mb: None,
            found: false,
            exited: None,
        }
    }
}
