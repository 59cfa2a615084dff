//! Bind group layouts and compute pipelines for the radix kernels.

use wgpu::{BindGroupLayout, ComputePipeline, Device, PipelineLayout, ShaderModule};

use super::decompose::{PARAMS_BINDING, READ_BINDING, WRITE_BINDING};
use super::params::STAGE_PARAMS_SIZE;

/// Shader entry point implementing `radix`, if one exists.
pub fn entry_point(radix: u32) -> Option<&'static str> {
    match radix {
        2 => Some("fft_radix2"),
        4 => Some("fft_radix4"),
        8 => Some("fft_radix8"),
        _ => None,
    }
}

/// Layout shared by every stage: parameter record, read buffer, write buffer.
pub fn create_stage_layout(device: &Device, label: &str) -> BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(&format!("{}_layout", label)),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: PARAMS_BINDING,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(STAGE_PARAMS_SIZE),
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: READ_BINDING,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: WRITE_BINDING,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    })
}

/// One pipeline per distinct radix used by an axis.
pub struct RadixPipelines {
    layout: PipelineLayout,
    pipelines: Vec<(u32, ComputePipeline)>,
}

impl RadixPipelines {
    /// Create pipelines for every distinct radix in `radices`.
    ///
    /// Callers pass radices produced by the decomposition, which only emits
    /// radices that have an entry point.
    pub fn new(
        device: &Device,
        shader: &ShaderModule,
        bind_group_layout: &BindGroupLayout,
        radices: &[u32],
        label: &str,
    ) -> Self {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{}_pipeline_layout", label)),
            bind_group_layouts: &[bind_group_layout],
            immediate_size: 0,
        });

        let mut pipelines: Vec<(u32, ComputePipeline)> = Vec::new();
        for &radix in radices {
            if pipelines.iter().any(|(r, _)| *r == radix) {
                continue;
            }
            let Some(entry) = entry_point(radix) else {
                continue;
            };
            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(&format!("{}_{}_pipeline", label, entry)),
                layout: Some(&layout),
                module: shader,
                entry_point: Some(entry),
                compilation_options: Default::default(),
                cache: None,
            });
            pipelines.push((radix, pipeline));
        }

        Self { layout, pipelines }
    }

    /// Position of the pipeline for `radix`.
    pub fn index_of(&self, radix: u32) -> Option<usize> {
        self.pipelines.iter().position(|(r, _)| *r == radix)
    }

    pub fn get(&self, index: usize) -> &ComputePipeline {
        &self.pipelines[index].1
    }

    pub fn layout(&self) -> &PipelineLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::compute::decompose::SUPPORTED_RADICES;

    #[test]
    fn test_every_supported_radix_has_entry_point() {
        for radix in SUPPORTED_RADICES {
            assert!(entry_point(radix).is_some(), "radix {}", radix);
        }
        assert_eq!(entry_point(3), None);
        assert_eq!(entry_point(16), None);
    }
}
