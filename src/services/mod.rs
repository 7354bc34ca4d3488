pub mod gpu_prober;
pub mod process_provider;
pub mod registry;
pub mod sampler;

#[cfg(test)]
pub mod testing;

pub use gpu_prober::{GpuProber, NoGpuProber, NvidiaSmiProber};
pub use process_provider::{ProcessProvider, SysinfoProvider};
pub use registry::MonitorRegistry;
