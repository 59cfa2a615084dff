//! GPU context initialization and adapter selection.

use std::sync::Arc;
use wgpu::{Adapter, Device, Instance, Queue};

/// Errors that can occur while bringing up a GPU device.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Adapter index {index} out of range ({count} adapters available)")]
    AdapterIndex { index: usize, count: usize },
    #[error("Failed to request device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
}

/// GPU context holding the device and queue used for compute.
pub struct GpuContext {
    pub instance: Instance,
    pub adapter: Arc<Adapter>,
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
}

fn create_instance() -> Instance {
    Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::METAL | wgpu::Backends::VULKAN | wgpu::Backends::GL,
        ..Default::default()
    })
}

impl GpuContext {
    /// Create a context on the default high-performance adapter.
    pub async fn new() -> Result<Self, GpuError> {
        Self::with_adapter(None).await
    }

    /// Create a context on the adapter at `index` in [`GpuContext::list_adapters`]
    /// order, or on the default adapter when `index` is `None`.
    pub async fn with_adapter(index: Option<usize>) -> Result<Self, GpuError> {
        let instance = create_instance();

        let adapter = match index {
            Some(index) => {
                let mut adapters = instance.enumerate_adapters(wgpu::Backends::all()).await;
                let count = adapters.len();
                if index >= count {
                    return Err(GpuError::AdapterIndex { index, count });
                }
                adapters.swap_remove(index)
            }
            None => instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    force_fallback_adapter: false,
                    compatible_surface: None,
                })
                .await
                .map_err(|_| GpuError::NoAdapter)?,
        };

        let info = adapter.get_info();
        log::info!("Using GPU adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("phobz-fft"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        Ok(Self {
            instance,
            adapter: Arc::new(adapter),
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    /// Describe every adapter visible to this process.
    pub async fn list_adapters() -> Vec<wgpu::AdapterInfo> {
        create_instance()
            .enumerate_adapters(wgpu::Backends::all())
            .await
            .iter()
            .map(Adapter::get_info)
            .collect()
    }

    /// Get info about the GPU adapter.
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_gpu_context_creation() {
        let ctx = GpuContext::new().await;
        // May fail on CI without GPU, so just check it doesn't panic
        if let Ok(ctx) = ctx {
            let info = ctx.adapter_info();
            assert!(!info.name.is_empty());
        }
    }

    #[tokio::test]
    async fn test_adapter_index_out_of_range() {
        let count = GpuContext::list_adapters().await.len();
        match GpuContext::with_adapter(Some(count)).await {
            Err(GpuError::AdapterIndex { index, count: c }) => {
                assert_eq!(index, count);
                assert_eq!(c, count);
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("index past the last adapter must fail"),
        }
    }
}
