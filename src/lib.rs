//! Phobz FFT Core
//!
//! GPU-accelerated multi-axis fast Fourier transforms on wgpu compute.
//!
//! # Features
//!
//! - 1-D, 2-D and 3-D complex transforms of power-of-two sizes
//! - Mixed radix-8/4/2 Stockham stages with ping-pong storage buffers
//! - Host-side planning that rejects unsupported sizes before any GPU allocation
//! - RustFFT fallback and a host emulator of the stage kernel
//! - Raw, ASCII and 16-bit PNG sample streams
//!
//! Forward transforms are scaled by `1 / N` along each axis; inverse
//! transforms are unscaled, so a forward transform followed by an inverse
//! transform returns the original samples.

pub mod cpu;
pub mod gpu;
pub mod io;
pub mod pipeline;
pub mod transform;

// Re-export commonly used types
pub use cpu::CpuTransform;
pub use gpu::compute::{
    command_list, factorize, Direction, FftContext, FftError, PlanSummary, RecordedCommand,
    TransformLayout, TransformPlan,
};
pub use gpu::{GpuContext, GpuError};
pub use io::{read_samples, write_samples, DataFormat, IoFormatError};
pub use num_complex::Complex32;
pub use pipeline::{describe_plan, run_transform, PipelineConfig, PipelineError};
pub use transform::{DynamicTransform, GpuTransform, Transform};
