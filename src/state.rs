use crate::error::MonitorError;
use crate::models::{Monitor, MonitorState, MonitorView, Snapshot};
use crate::services::MonitorRegistry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::AbortHandle;

pub type AppState = Arc<MonitorRegistry>;

/// What a sampling tick needs to know about its monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleTarget {
    pub pid: Option<u32>,
    pub name: Option<String>,
}

/// Handle -> monitor map behind a single lock.
///
/// Sampling tasks and the HTTP handlers share this; every read hands out a
/// copy so no caller ever holds the lock across an await.
#[derive(Default)]
pub struct MonitorStore {
    monitors: Mutex<HashMap<String, Monitor>>,
}

impl MonitorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Monitor>> {
        // Every write leaves an entry whole, so a poisoned map is still usable.
        self.monitors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, monitor: Monitor) -> Result<String, MonitorError> {
        let mut monitors = self.lock();
        if monitors.contains_key(&monitor.id) {
            return Err(MonitorError::DuplicateHandle(monitor.id));
        }
        let id = monitor.id.clone();
        monitors.insert(id.clone(), monitor);
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Option<MonitorView> {
        self.lock().get(id).map(Monitor::view)
    }

    pub fn list(&self) -> Vec<MonitorView> {
        self.lock().values().map(Monitor::view).collect()
    }

    pub fn remove(&self, id: &str) -> Option<Monitor> {
        self.lock().remove(id)
    }

    /// Removes every monitor, e.g. on shutdown.
    pub fn drain(&self) -> Vec<Monitor> {
        self.lock().drain().map(|(_, m)| m).collect()
    }

    /// Binds the sampling task to its monitor. Returns false when the monitor
    /// is already gone, in which case the caller owns the task.
    pub fn attach_task(&self, id: &str, task: AbortHandle) -> bool {
        match self.lock().get_mut(id) {
            Some(monitor) => {
                monitor.task = Some(task);
                true
            }
            None => false,
        }
    }

    /// Target of the next tick, or `None` once the monitor is removed or
    /// no longer active.
    pub fn target(&self, id: &str) -> Option<SampleTarget> {
        self.lock()
            .get(id)
            .filter(|m| m.active)
            .map(|m| SampleTarget {
                pid: m.pid,
                name: m.name.clone(),
            })
    }

    /// One-way pid adoption. The first adopted pid wins; later calls get the
    /// already stored pid back. `None` if the monitor was removed.
    pub fn adopt_pid(&self, id: &str, pid: u32) -> Option<u32> {
        let mut monitors = self.lock();
        let monitor = monitors.get_mut(id)?;
        Some(*monitor.pid.get_or_insert(pid))
    }

    /// Replaces `last` and the lifecycle flags in one step. Never touches
    /// `pid`; that only changes through `adopt_pid`.
    ///
    /// Silently ignored when the monitor was removed or has already exited.
    /// Returns whether the update was applied.
    pub fn update_last(&self, id: &str, snapshot: Snapshot, state: MonitorState) -> bool {
        let mut monitors = self.lock();
        let Some(monitor) = monitors.get_mut(id) else {
            return false;
        };
        if monitor.exited {
            return false;
        }

        monitor.last = Some(snapshot);
        if state == MonitorState::Exited {
            monitor.active = false;
            monitor.exited = true;
            monitor.task = None;
        }
        true
    }
}
