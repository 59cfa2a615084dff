//! End-to-end transform pipeline: read samples, transform, write samples.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::gpu::compute::{Direction, FftContext, FftError, PlanSummary, TransformLayout};
use crate::gpu::{GpuContext, GpuError};
use crate::io::{read_samples, write_samples, DataFormat, IoFormatError};
use crate::transform::{DynamicTransform, Transform};

/// Pipeline configuration for one transform run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Sample counts along X, Y and Z.
    pub sizes: [u32; 3],
    pub inverse: bool,
    pub input_format: DataFormat,
    pub output_format: DataFormat,
    /// Adapter index from [`GpuContext::list_adapters`]; `None` picks the
    /// default high-performance adapter.
    pub device: Option<usize>,
    /// Upper bound on every GPU completion wait, in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Run on the GPU, falling back to the CPU when no adapter is available.
    pub use_gpu: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sizes: [1, 1, 1],
            inverse: false,
            input_format: DataFormat::Ascii,
            output_format: DataFormat::Ascii,
            device: None,
            timeout_ms: None,
            use_gpu: true,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file; missing fields take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn direction(&self) -> Direction {
        Direction::from_inverse(self.inverse)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn sample_count(&self) -> usize {
        self.sizes.iter().map(|&s| s as usize).product()
    }
}

/// Errors that can occur during pipeline execution.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    #[error("FFT error: {0}")]
    Fft(#[from] FftError),
    #[error("Format error: {0}")]
    Format(#[from] IoFormatError),
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Host-side plan overview for `config`, without touching a GPU.
pub fn describe_plan(config: &PipelineConfig) -> Result<PlanSummary, PipelineError> {
    Ok(TransformLayout::new(config.sizes, config.direction())?.summary())
}

/// Create the transform backend `config` asks for.
///
/// An explicitly requested adapter must exist; otherwise a missing GPU falls
/// back to the CPU transform.
pub async fn create_transform(config: &PipelineConfig) -> Result<DynamicTransform, PipelineError> {
    let direction = config.direction();
    if !config.use_gpu {
        log::info!("Using CPU transform");
        return Ok(DynamicTransform::cpu(config.sizes, direction)?);
    }

    let context = match GpuContext::with_adapter(config.device).await {
        Ok(gpu) => Some(Arc::new(
            FftContext::new(gpu.device.clone(), gpu.queue.clone()).with_timeout(config.timeout()),
        )),
        Err(e) if config.device.is_some() => return Err(e.into()),
        Err(e) => {
            log::warn!("GPU unavailable ({}), falling back to CPU", e);
            None
        }
    };

    let transform = DynamicTransform::gpu_with_fallback(context, config.sizes, direction)?;
    if transform.is_gpu() {
        log::info!("Using GPU transform");
    }
    Ok(transform)
}

/// Read one volume from `reader`, transform it, and write it to `writer`.
pub async fn run_transform<R: Read, W: Write>(
    config: &PipelineConfig,
    reader: &mut R,
    writer: &mut W,
) -> Result<(), PipelineError> {
    let summary = describe_plan(config)?;
    log::debug!(
        "{:?} transform of {:?} in {} stages",
        summary.direction,
        summary.sizes,
        summary.total_stages
    );

    let mut transform = create_transform(config).await?;
    let samples = read_samples(reader, config.input_format, config.sizes)?;
    let output = transform.process(&samples)?;
    write_samples(writer, config.output_format, config.sizes, &output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.sizes, [1, 1, 1]);
        assert_eq!(config.direction(), Direction::Forward);
        assert_eq!(config.input_format, DataFormat::Ascii);
        assert!(config.use_gpu);
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"sizes": [16, 8, 1], "inverse": true, "output_format": "raw"}"#)
                .unwrap();
        assert_eq!(config.sizes, [16, 8, 1]);
        assert_eq!(config.direction(), Direction::Inverse);
        assert_eq!(config.output_format, DataFormat::Raw);
        assert_eq!(config.input_format, DataFormat::Ascii);
        assert_eq!(config.sample_count(), 128);
    }

    #[test]
    fn test_describe_plan_rejects_bad_size() {
        let config = PipelineConfig {
            sizes: [10, 1, 1],
            ..Default::default()
        };
        assert!(matches!(
            describe_plan(&config),
            Err(PipelineError::Fft(FftError::InvalidTransformSize { size: 10, .. }))
        ));
    }

    #[tokio::test]
    async fn test_run_transform_on_cpu() {
        let config = PipelineConfig {
            sizes: [4, 1, 1],
            use_gpu: false,
            ..Default::default()
        };
        let mut input = "1 0 1 0 1 0 1 0".as_bytes();
        let mut output = Vec::new();
        run_transform(&config, &mut input, &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.lines().count(), 1);
        let values: Vec<f32> = text
            .split_whitespace()
            .map(|t| t.parse().unwrap())
            .collect();
        assert_eq!(values.len(), 8);
        assert!((values[0] - 1.0).abs() < 1e-6);
        assert!(values[1..].iter().all(|v| v.abs() < 1e-6));
    }
}
