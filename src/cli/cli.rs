use clap::Parser;
use std::time::Duration;

use crate::models::DEFAULT_INTERVAL_MS;

/// Process Monitor - per-process resource sampling over HTTP
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Listen address
    #[arg(short = 'a', long, env = "ADDRESS", default_value = "0.0.0.0")]
    pub address: String,

    /// Sampling interval used when a monitor is created without a valid one
    #[arg(long, env = "DEFAULT_INTERVAL_MS", default_value_t = DEFAULT_INTERVAL_MS)]
    pub default_interval_ms: u64,

    /// Executable queried for per-process GPU memory
    #[arg(long, env = "GPU_COMMAND", default_value = "nvidia-smi")]
    pub gpu_command: String,

    /// Timeout for a single GPU query
    #[arg(long, env = "GPU_TIMEOUT_MS", default_value_t = 3000)]
    pub gpu_timeout_ms: u64,

    /// Skip GPU probing entirely
    #[arg(long, env = "DISABLE_GPU", default_value_t = false)]
    pub disable_gpu: bool,
}

impl CommandArgs {
    pub fn default_interval_ms(&self) -> u64 {
        if self.default_interval_ms == 0 {
            DEFAULT_INTERVAL_MS
        } else {
            self.default_interval_ms
        }
    }

    pub fn gpu_timeout(&self) -> Duration {
        Duration::from_millis(self.gpu_timeout_ms)
    }
}
