//! Long-lived compute resources shared by every transform plan.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use wgpu::{CommandEncoder, Device, Queue, ShaderModule, SubmissionIndex};

use super::params::aligned_record_size;

/// Errors that can occur while planning or executing a GPU transform.
#[derive(Debug, thiserror::Error)]
pub enum FftError {
    #[error("Transform size {size} is not a product of the supported radices {radices:?}")]
    InvalidTransformSize { size: u32, radices: Vec<u32> },
    #[error("GPU resource allocation failed: {0}")]
    ResourceAllocation(String),
    #[error("GPU work did not complete within {0:?}")]
    ExecutionTimeout(Duration),
    #[error("GPU execution failed: {0}")]
    ExecutionFailed(String),
    #[error("GPU buffer mapping failed: {0}")]
    BufferMapFailed(String),
    #[error("Expected {expected} samples but got {got}")]
    SampleCountMismatch { expected: usize, got: usize },
}

/// Device, queue and compiled radix kernels.
///
/// One context serves any number of plans, but only one transform may be in
/// flight at a time: every submission goes through [`FftContext::submit_and_wait`],
/// which serializes on an internal lock.
pub struct FftContext {
    device: Arc<Device>,
    queue: Arc<Queue>,
    shader: ShaderModule,
    uniform_alignment: u64,
    wait_timeout: Option<Duration>,
    submission: Mutex<()>,
}

impl FftContext {
    /// Compile the radix kernels and record the device's uniform alignment.
    pub fn new(device: Arc<Device>, queue: Arc<Queue>) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fft_radix_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/fft_radix.wgsl").into()),
        });
        let uniform_alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        log::debug!(
            "fft context ready, uniform alignment {} bytes",
            uniform_alignment
        );

        Self {
            device,
            queue,
            shader,
            uniform_alignment,
            wait_timeout: None,
            submission: Mutex::new(()),
        }
    }

    /// Bound every completion wait; `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn shader(&self) -> &ShaderModule {
        &self.shader
    }

    pub fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }

    pub fn uniform_alignment(&self) -> u64 {
        self.uniform_alignment
    }

    /// Stride between stage records in a parameter buffer.
    pub fn record_size(&self) -> u64 {
        aligned_record_size(self.uniform_alignment)
    }

    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout
    }

    /// Submit one command buffer and block until the GPU has finished it.
    pub fn submit_and_wait(&self, encoder: CommandEncoder) -> Result<(), FftError> {
        let _guard = self
            .submission
            .lock()
            .map_err(|e| FftError::ExecutionFailed(e.to_string()))?;
        let index = self.queue.submit(Some(encoder.finish()));
        self.wait(Some(index))
    }

    /// Block until `index` (or all outstanding work) completes.
    pub fn wait(&self, index: Option<SubmissionIndex>) -> Result<(), FftError> {
        match self.device.poll(wgpu::PollType::Wait {
            submission_index: index,
            timeout: self.wait_timeout,
        }) {
            Ok(_) => Ok(()),
            Err(e) => Err(poll_error(e, self.wait_timeout)),
        }
    }

    /// Release the compiled kernels.
    pub fn teardown(self) {
        log::debug!("fft context torn down");
        drop(self);
    }
}

fn poll_error(err: wgpu::PollError, timeout: Option<Duration>) -> FftError {
    match err {
        wgpu::PollError::Timeout => FftError::ExecutionTimeout(timeout.unwrap_or(Duration::MAX)),
        other => FftError::ExecutionFailed(other.to_string()),
    }
}
