//! GPU resources for the stages of one axis.

use wgpu::{BindGroup, BindGroupLayout, Buffer, ComputePipeline};

use super::buffers::{create_param_buffer, PingPongBuffers};
use super::context::{FftContext, FftError};
use super::decompose::{
    AxisLayout, PARAMS_BINDING, READ_BINDING, SUPPORTED_RADICES, WRITE_BINDING,
};
use super::params::STAGE_PARAMS_SIZE;
use super::pipelines::{create_stage_layout, entry_point, RadixPipelines};
use super::transfer::Transfer;

/// Parameter buffer, bind groups and kernels for one axis.
pub struct AxisPlan {
    layout: AxisLayout,
    param_buffer: Buffer,
    bind_group_layout: BindGroupLayout,
    bind_groups: Vec<BindGroup>,
    kernels: RadixPipelines,
    stage_kernels: Vec<usize>,
}

impl AxisPlan {
    /// Upload the stage records and bind every stage to its ping-pong pair.
    pub fn build(
        context: &FftContext,
        layout: AxisLayout,
        buffers: &PingPongBuffers,
    ) -> Result<Self, FftError> {
        let device = context.device();
        let label = format!("fft_axis{}", layout.axis);
        let record_size = context.record_size();
        let stage_count = layout.stage_count() as u64;

        let param_size = record_size * stage_count;
        let param_buffer = create_param_buffer(device, &format!("{}_params", label), param_size);

        let mut transfer = Transfer::begin_upload(context, param_size)?;
        transfer.write_with(|bytes| {
            for (j, stage) in layout.stages.iter().enumerate() {
                let offset = j * record_size as usize;
                bytes[offset..offset + STAGE_PARAMS_SIZE as usize]
                    .copy_from_slice(bytemuck::bytes_of(&stage.params));
            }
        })?;
        transfer.end(Some(&param_buffer))?;

        let bind_group_layout = create_stage_layout(device, &label);
        let bind_groups = layout
            .stages
            .iter()
            .enumerate()
            .map(|(j, stage)| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("{}_stage{}", label, j)),
                    layout: &bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: PARAMS_BINDING,
                            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                                buffer: &param_buffer,
                                offset: j as u64 * record_size,
                                size: wgpu::BufferSize::new(STAGE_PARAMS_SIZE),
                            }),
                        },
                        wgpu::BindGroupEntry {
                            binding: READ_BINDING,
                            resource: buffers.get(stage.read_buffer).as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: WRITE_BINDING,
                            resource: buffers.get(stage.write_buffer).as_entire_binding(),
                        },
                    ],
                })
            })
            .collect();

        let radices = layout.radices();
        let kernels = RadixPipelines::new(
            device,
            context.shader(),
            &bind_group_layout,
            &radices,
            &label,
        );
        let stage_kernels = radices
            .iter()
            .map(|&radix| {
                kernels.index_of(radix).ok_or_else(|| {
                    FftError::ResourceAllocation(format!("no kernel for radix {}", radix))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!(
            "{}: {} stages, {} kernels, {} byte parameter buffer",
            label,
            stage_count,
            kernels.len(),
            param_size
        );

        Ok(Self {
            layout,
            param_buffer,
            bind_group_layout,
            bind_groups,
            kernels,
            stage_kernels,
        })
    }

    pub fn layout(&self) -> &AxisLayout {
        &self.layout
    }

    pub fn sample_count(&self) -> u32 {
        self.layout.sample_count
    }

    pub fn stage_count(&self) -> usize {
        self.layout.stage_count()
    }

    pub fn param_buffer(&self) -> &Buffer {
        &self.param_buffer
    }

    pub fn bind_group_layout(&self) -> &BindGroupLayout {
        &self.bind_group_layout
    }

    pub fn bind_group(&self, stage: usize) -> &BindGroup {
        &self.bind_groups[stage]
    }

    /// Kernel bound for `stage`.
    pub fn kernel(&self, stage: usize) -> &ComputePipeline {
        self.kernels.get(self.stage_kernels[stage])
    }

    /// Release the parameter buffer, bind groups, layouts and kernels.
    pub fn destroy(self) {
        self.param_buffer.destroy();
        log::debug!("fft_axis{} destroyed", self.layout.axis);
    }
}

/// Reject radices the shader module has no entry point for.
pub(crate) fn check_kernels(layout: &AxisLayout) -> Result<(), FftError> {
    if layout.stages.iter().all(|s| entry_point(s.radix).is_some()) {
        return Ok(());
    }
    Err(FftError::InvalidTransformSize {
        size: layout.sample_count,
        radices: SUPPORTED_RADICES.to_vec(),
    })
}
