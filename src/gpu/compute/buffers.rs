//! GPU buffer management for transform plans.

use wgpu::util::DeviceExt;
use wgpu::{Buffer, BufferUsages, Device};

/// The two storage buffers stages alternate between.
pub struct PingPongBuffers {
    buffers: [Buffer; 2],
    size: u64,
}

impl PingPongBuffers {
    /// Create both buffers with `size` bytes each.
    pub fn new(device: &Device, size: u64) -> Self {
        let create = |label| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC | BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };

        Self {
            buffers: [create("fft_buffer_0"), create("fft_buffer_1")],
            size,
        }
    }

    pub fn get(&self, index: usize) -> &Buffer {
        &self.buffers[index]
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn destroy(self) {
        for buffer in &self.buffers {
            buffer.destroy();
        }
    }
}

/// Uniform buffer holding one aligned parameter record per stage.
pub fn create_param_buffer(device: &Device, label: &str, size: u64) -> Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Staging buffer initialized with `contents`, used as the source of an
/// upload copy.
pub fn create_upload_staging(device: &Device, contents: &[u8]) -> Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("fft_upload_staging"),
        contents,
        usage: BufferUsages::COPY_SRC,
    })
}

/// Host-readable staging buffer, the destination of a download copy.
pub fn create_download_staging(device: &Device, size: u64) -> Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("fft_download_staging"),
        size,
        usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
