use thiserror::Error;

/// Unexpected failure from the process snapshot provider.
///
/// "Process not found" is not an error: providers report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("process table lock poisoned")]
    Poisoned,

    #[error("sampling worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Provide pid or name to monitor")]
    BadRequest,

    #[error("Process with pid {0} not found")]
    ProcessNotFound(u32),

    #[error("Monitor '{0}' not found")]
    NotFound(String),

    #[error("Monitor '{0}' already exists")]
    DuplicateHandle(String),

    #[error("process provider failed: {0}")]
    Provider(#[from] ProviderError),
}
