use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;

/// Best-effort per-process GPU memory lookup.
///
/// Implementations never fail: anything that goes wrong is `None`.
#[async_trait]
pub trait GpuProber: Send + Sync {
    async fn gpu_memory_mb(&self, pid: u32) -> Option<u64>;
}

/// Prober for hosts without a usable GPU utility.
pub struct NoGpuProber;

#[async_trait]
impl GpuProber for NoGpuProber {
    async fn gpu_memory_mb(&self, _pid: u32) -> Option<u64> {
        None
    }
}

/// Queries `nvidia-smi` for compute apps and picks out one pid.
pub struct NvidiaSmiProber {
    command: String,
    timeout: Duration,
}

impl NvidiaSmiProber {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }
}

#[async_trait]
impl GpuProber for NvidiaSmiProber {
    async fn gpu_memory_mb(&self, pid: u32) -> Option<u64> {
        let output = Command::new(&self.command)
            .arg("--query-compute-apps=pid,used_gpu_memory")
            .arg("--format=csv,noheader,nounits")
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, output).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                log::debug!("GPU probe '{}' failed to run: {}", self.command, e);
                return None;
            }
            Err(_) => {
                log::debug!(
                    "GPU probe '{}' timed out after {}ms",
                    self.command,
                    self.timeout.as_millis()
                );
                return None;
            }
        };

        if !output.status.success() {
            log::debug!("GPU probe '{}' exited with {}", self.command, output.status);
            return None;
        }

        parse_compute_apps(&String::from_utf8_lossy(&output.stdout), pid)
    }
}

/// Sums used memory (MiB) over every `pid, used_memory` row for `pid`.
///
/// A process appears once per GPU it touches. Rows that do not parse, such
/// as `[N/A]` memory on some drivers, are skipped.
pub fn parse_compute_apps(stdout: &str, pid: u32) -> Option<u64> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.split(',').map(str::trim);
            let row_pid = parts.next()?.parse::<u32>().ok()?;
            let used = parts.next()?.parse::<u64>().ok()?;
            (row_pid == pid).then_some(used)
        })
        .reduce(|a, b| a + b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_match() {
        let out = "1234, 512\n5678, 2048\n";
        assert_eq!(parse_compute_apps(out, 5678), Some(2048));
        assert_eq!(parse_compute_apps(out, 1234), Some(512));
    }

    #[test]
    fn test_parse_sums_rows_across_gpus() {
        let out = "1234, 512\r\n1234, 256\r\n";
        assert_eq!(parse_compute_apps(out, 1234), Some(768));
    }

    #[test]
    fn test_parse_no_match_or_garbage() {
        assert_eq!(parse_compute_apps("", 1), None);
        assert_eq!(parse_compute_apps("1234, 512", 99), None);
        assert_eq!(parse_compute_apps("1234, [N/A]\nnot a row", 1234), None);
    }

    #[tokio::test]
    async fn test_missing_command_yields_none() {
        let prober = NvidiaSmiProber::new(
            "definitely-not-a-real-gpu-tool",
            Duration::from_millis(500),
        );
        assert_eq!(prober.gpu_memory_mb(1).await, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hanging_command_times_out_as_none() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Instant;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-nvidia-smi");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let prober = NvidiaSmiProber::new(
            script.to_string_lossy().into_owned(),
            Duration::from_millis(200),
        );

        let started = Instant::now();
        assert_eq!(prober.gpu_memory_mb(1234).await, None);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_secs(5), "probe took {:?}", elapsed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_output_is_parsed() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-nvidia-smi");
        std::fs::write(&script, "#!/bin/sh\necho '1234, 300'\necho '99, 10'\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let prober = NvidiaSmiProber::new(
            script.to_string_lossy().into_owned(),
            Duration::from_secs(5),
        );
        assert_eq!(prober.gpu_memory_mb(1234).await, Some(300));
    }

    #[tokio::test]
    async fn test_no_gpu_prober() {
        assert_eq!(NoGpuProber.gpu_memory_mb(std::process::id()).await, None);
    }
}
