//! Uniform parameter record for the radix butterfly shaders.
//!
//! The struct must match the WGSL `StageParams` definition exactly. The
//! stride triplet is declared as three scalars on the shader side so the
//! record stays a tightly packed 32 bytes without vec3 padding.

use std::f32::consts::PI;

use super::decompose::Direction;

/// Per-stage parameters consumed by one butterfly dispatch.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StageParams {
    /// Linear strides of the volume, permuted so `stride[0]` walks the
    /// axis being transformed.
    pub stride: [u32; 3],
    /// Sample count divided by this stage's radix.
    pub radix_stride: u32,
    /// Product of the radices of all earlier stages on the axis.
    pub stage_size: u32,
    pub direction_factor: f32,
    pub angle_factor: f32,
    pub normalization_factor: f32,
}

/// Size in bytes of one unpadded record.
pub const STAGE_PARAMS_SIZE: u64 = std::mem::size_of::<StageParams>() as u64;

impl StageParams {
    /// Derive the record for one stage.
    ///
    /// `stage_size` is the running product of earlier radices (1 for the
    /// first stage). Forward stages scale by `1 / radix` so one axis as a
    /// whole scales by `1 / sample_count`; inverse stages are unscaled.
    pub fn derive(
        stride: [u32; 3],
        sample_count: u32,
        radix: u32,
        stage_size: u32,
        direction: Direction,
    ) -> Self {
        let direction_factor = direction.factor();
        Self {
            stride,
            radix_stride: sample_count / radix,
            stage_size,
            direction_factor,
            angle_factor: direction_factor * (PI / stage_size as f32),
            normalization_factor: match direction {
                Direction::Forward => 1.0 / radix as f32,
                Direction::Inverse => 1.0,
            },
        }
    }
}

/// Round the record size up to the device's uniform offset alignment so each
/// stage can be bound independently by offset.
pub fn aligned_record_size(alignment: u64) -> u64 {
    STAGE_PARAMS_SIZE.next_multiple_of(alignment.max(1))
}
