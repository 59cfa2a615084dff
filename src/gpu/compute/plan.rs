//! Multi-axis transform plan: ping-pong buffers plus one axis plan per
//! non-trivial axis.

use num_complex::Complex32;
use wgpu::Buffer;

use super::axis::{check_kernels, AxisPlan};
use super::buffers::PingPongBuffers;
use super::context::{FftContext, FftError};
use super::decompose::{Direction, TransformLayout};
use super::record::record;
use super::transfer::Transfer;

/// GPU resources for one (sizes, direction) transform.
///
/// Built once, used for one upload / execute / download cycle, then released
/// with [`TransformPlan::destroy`].
pub struct TransformPlan {
    layout: TransformLayout,
    axes: [Option<AxisPlan>; 3],
    buffers: PingPongBuffers,
}

impl TransformPlan {
    /// Decompose `sizes` and build every GPU resource the stages need.
    pub fn build(
        context: &FftContext,
        sizes: [u32; 3],
        direction: Direction,
    ) -> Result<Self, FftError> {
        let layout = TransformLayout::new(sizes, direction)?;
        Self::from_layout(context, layout)
    }

    /// Build GPU resources for an already decomposed layout.
    pub fn from_layout(context: &FftContext, layout: TransformLayout) -> Result<Self, FftError> {
        for axis in layout.axes() {
            check_kernels(axis)?;
        }
        check_limits(context, &layout)?;

        let buffers = PingPongBuffers::new(context.device(), layout.buffer_size());
        let mut axes: [Option<AxisPlan>; 3] = [None, None, None];
        for axis in layout.axes() {
            axes[axis.axis] = Some(AxisPlan::build(context, axis.clone(), &buffers)?);
        }

        log::debug!(
            "plan {:?} {:?}: {} stages, result in buffer {}",
            layout.sizes(),
            layout.direction(),
            layout.total_stages(),
            layout.result_buffer_index()
        );

        Ok(Self {
            layout,
            axes,
            buffers,
        })
    }

    pub fn layout(&self) -> &TransformLayout {
        &self.layout
    }

    pub fn sizes(&self) -> [u32; 3] {
        self.layout.sizes()
    }

    pub fn direction(&self) -> Direction {
        self.layout.direction()
    }

    pub fn sample_count(&self) -> usize {
        self.layout.sample_count()
    }

    pub fn buffer_size(&self) -> u64 {
        self.layout.buffer_size()
    }

    /// Plan for `axis`, or `None` when that axis has a single sample.
    pub fn axis(&self, axis: usize) -> Option<&AxisPlan> {
        self.axes[axis].as_ref()
    }

    pub fn result_in_swap_buffer(&self) -> bool {
        self.layout.result_in_swap_buffer()
    }

    pub fn buffer(&self, index: usize) -> &Buffer {
        self.buffers.get(index)
    }

    /// Buffer the first stage reads from.
    pub fn input_buffer(&self) -> &Buffer {
        self.buffers.get(0)
    }

    /// Buffer holding the transform output once execution completes.
    pub fn result_buffer(&self) -> &Buffer {
        self.buffers.get(self.layout.result_buffer_index())
    }

    /// Copy `samples` into the input buffer through a staging transfer.
    pub fn upload(&self, context: &FftContext, samples: &[Complex32]) -> Result<(), FftError> {
        self.check_samples(samples)?;
        let mut transfer = Transfer::begin_upload(context, self.buffer_size())?;
        transfer.write(bytemuck::cast_slice(samples))?;
        transfer.end(Some(self.input_buffer()))
    }

    /// Record every stage, submit, and wait for completion.
    pub fn execute(&self, context: &FftContext) -> Result<(), FftError> {
        let mut encoder =
            context
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("fft_transform_encoder"),
                });
        record(self, &mut encoder);
        context.submit_and_wait(encoder)
    }

    /// Read the result buffer back to the host.
    pub fn download(&self, context: &FftContext) -> Result<Vec<Complex32>, FftError> {
        let transfer = Transfer::begin_download(context, self.buffer_size(), self.result_buffer())?;
        let samples = transfer.read_with(bytemuck::pod_collect_to_vec::<u8, Complex32>)?;
        transfer.end(None)?;
        Ok(samples)
    }

    /// Release every axis resource, then both ping-pong buffers.
    pub fn destroy(self) {
        for axis in self.axes.into_iter().flatten() {
            axis.destroy();
        }
        self.buffers.destroy();
    }

    fn check_samples(&self, samples: &[Complex32]) -> Result<(), FftError> {
        if samples.len() != self.sample_count() {
            return Err(FftError::SampleCountMismatch {
                expected: self.sample_count(),
                got: samples.len(),
            });
        }
        Ok(())
    }
}

fn check_limits(context: &FftContext, layout: &TransformLayout) -> Result<(), FftError> {
    let limits = context.limits();
    let size = layout.buffer_size();
    if size > limits.max_buffer_size || size > u64::from(limits.max_storage_buffer_binding_size) {
        return Err(FftError::ResourceAllocation(format!(
            "{} byte transform buffer exceeds device limits",
            size
        )));
    }

    let max_groups = limits.max_compute_workgroups_per_dimension;
    for axis in layout.axes() {
        for stage in 0..axis.stage_count() {
            let grid = axis.dispatch_size(stage);
            if grid.iter().any(|&g| g > max_groups) {
                return Err(FftError::ResourceAllocation(format!(
                    "axis {} dispatch {:?} exceeds {} workgroups per dimension",
                    axis.axis, grid, max_groups
                )));
            }
        }
    }
    Ok(())
}
