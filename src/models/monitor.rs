use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::task::AbortHandle;

pub use crate::models::snapshot::Snapshot;

pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// A tracked process and its sampling state.
#[derive(Debug)]
pub struct Monitor {
    /// Opaque handle, never reused
    pub id: String,
    /// Target pid; once set it is never re-resolved from `name`
    pub pid: Option<u32>,
    /// Case-insensitive substring used to find the pid
    pub name: Option<String>,
    pub interval_ms: u64,
    pub active: bool,
    pub exited: bool,
    pub last: Option<Snapshot>,
    pub created_at: DateTime<Utc>,
    /// Handle of the sampling task, used to cancel it on removal
    pub task: Option<AbortHandle>,
}

impl Monitor {
    pub fn new(id: String, pid: Option<u32>, name: Option<String>, interval_ms: u64) -> Self {
        Self {
            id,
            pid,
            name,
            interval_ms,
            active: true,
            exited: false,
            last: None,
            created_at: Utc::now(),
            task: None,
        }
    }

    pub fn view(&self) -> MonitorView {
        MonitorView {
            id: self.id.clone(),
            pid: self.pid,
            name: self.name.clone(),
            interval_ms: self.interval_ms,
            active: self.active,
            exited: self.exited,
            last: self.last.clone(),
            created_at: self.created_at,
        }
    }

    /// Stops the sampling task, if one is attached.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Read-only copy of a monitor handed out by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorView {
    pub id: String,
    pub pid: Option<u32>,
    pub name: Option<String>,
    pub interval_ms: u64,
    pub active: bool,
    pub exited: bool,
    pub last: Option<Snapshot>,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle flags written together with a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Running,
    Exited,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMonitorRequest {
    #[serde(default)]
    pub pid: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_interval")]
    pub interval_ms: Option<i64>,
}

/// Accepts any JSON value for `intervalMs`; anything that is not a whole
/// number (or a string holding one) reads as unset.
fn lenient_interval<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

impl CreateMonitorRequest {
    /// Name pattern with blank values treated as absent.
    pub fn name_pattern(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedMonitor {
    pub monitor_id: String,
    pub pid: Option<u32>,
    pub name: Option<String>,
}

/// Missing or non-positive intervals fall back to `default_ms`.
pub fn normalize_interval(requested: Option<i64>, default_ms: u64) -> u64 {
    match requested {
        Some(ms) if ms > 0 => ms as u64,
        _ => default_ms,
    }
}
