//! Host-side decomposition of a transform into radix butterfly stages.
//!
//! Everything in this module is pure: sizes and a direction go in, stage
//! records, ping-pong buffer selections and dispatch grids come out. The GPU
//! plan consumes a finished [`TransformLayout`], so an axis that cannot be
//! factorized rejects the whole plan before any device allocation happens.

use serde::{Deserialize, Serialize};

use super::context::FftError;
use super::params::StageParams;

/// Radices with a compiled kernel, largest first.
pub const SUPPORTED_RADICES: [u32; 3] = [8, 4, 2];

/// Invocations per workgroup along x; each invocation computes one butterfly.
pub const WORKGROUP_SIZE: u32 = 32;

/// Cyclic axis permutation: row `a` lists the axes in the order the kernel
/// sees them when axis `a` is being transformed.
pub const AXIS_REMAP: [[usize; 3]; 3] = [[0, 1, 2], [1, 2, 0], [2, 0, 1]];

/// Bind group slot of the stage parameter record.
pub const PARAMS_BINDING: u32 = 0;
/// Bind group slot of the buffer a stage reads from.
pub const READ_BINDING: u32 = 1;
/// Bind group slot of the buffer a stage writes to.
pub const WRITE_BINDING: u32 = 2;

/// Transform direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Inverse,
}

impl Direction {
    pub fn from_inverse(inverse: bool) -> Self {
        if inverse {
            Direction::Inverse
        } else {
            Direction::Forward
        }
    }

    /// +1 for forward, -1 for inverse.
    pub fn factor(self) -> f32 {
        match self {
            Direction::Forward => 1.0,
            Direction::Inverse => -1.0,
        }
    }

    pub fn is_inverse(self) -> bool {
        self == Direction::Inverse
    }
}

/// Split `sample_count` into an ordered list of radices whose product is
/// exactly `sample_count`.
///
/// Larger radices are tried first, so power-of-two sizes decompose into as
/// many radix-8 stages as possible. A size of 1 yields no stages.
pub fn factorize(sample_count: u32, radices: &[u32]) -> Result<Vec<u32>, FftError> {
    let mut candidates: Vec<u32> = radices.iter().copied().filter(|&r| r > 1).collect();
    candidates.sort_unstable_by(|a, b| b.cmp(a));
    candidates.dedup();

    let mut stages = Vec::new();
    if sample_count == 0 || !search(sample_count, &candidates, &mut stages) {
        return Err(FftError::InvalidTransformSize {
            size: sample_count,
            radices: candidates,
        });
    }
    Ok(stages)
}

fn search(remaining: u32, radices: &[u32], stages: &mut Vec<u32>) -> bool {
    if remaining == 1 {
        return true;
    }
    for &radix in radices {
        if remaining % radix == 0 {
            stages.push(radix);
            if search(remaining / radix, radices, stages) {
                return true;
            }
            stages.pop();
        }
    }
    false
}

/// Stride triplet for `axis`: the natural strides `(1, W, W*H)` permuted by
/// [`AXIS_REMAP`].
pub fn axis_strides(sizes: [u32; 3], axis: usize) -> [u32; 3] {
    let natural = [1, sizes[0], sizes[0] * sizes[1]];
    let remap = AXIS_REMAP[axis];
    [natural[remap[0]], natural[remap[1]], natural[remap[2]]]
}

/// Index of the ping-pong buffer bound to `role` for stage `stage`, given
/// which buffer held the data when the axis started.
pub fn binding_selector(result_in_swap_buffer: bool, role: u32, stage: usize) -> usize {
    1 - (result_in_swap_buffer as usize + role as usize + stage) % 2
}

/// One radix pass over one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct StageLayout {
    pub radix: u32,
    pub params: StageParams,
    pub read_buffer: usize,
    pub write_buffer: usize,
}

/// Decomposition of a single axis with more than one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisLayout {
    pub axis: usize,
    pub sample_count: u32,
    /// Sample counts of the two remaining axes in [`AXIS_REMAP`] order.
    pub other_counts: [u32; 2],
    pub stages: Vec<StageLayout>,
}

impl AxisLayout {
    /// Build the stage list for `axis`, starting from the buffer named by
    /// `result_in_swap_buffer`.
    pub fn build(
        axis: usize,
        sizes: [u32; 3],
        direction: Direction,
        radices: &[u32],
        result_in_swap_buffer: bool,
    ) -> Result<Self, FftError> {
        let sample_count = sizes[axis];
        let stage_radices = factorize(sample_count, radices).inspect_err(|_| {
            log::warn!("axis {} size {} has no radix decomposition", axis, sample_count);
        })?;
        let stride = axis_strides(sizes, axis);

        let mut stage_size = 1;
        let stages = stage_radices
            .iter()
            .enumerate()
            .map(|(j, &radix)| {
                let params = StageParams::derive(stride, sample_count, radix, stage_size, direction);
                stage_size *= radix;
                StageLayout {
                    radix,
                    params,
                    read_buffer: binding_selector(result_in_swap_buffer, READ_BINDING, j),
                    write_buffer: binding_selector(result_in_swap_buffer, WRITE_BINDING, j),
                }
            })
            .collect();

        let remap = AXIS_REMAP[axis];
        Ok(Self {
            axis,
            sample_count,
            other_counts: [sizes[remap[1]], sizes[remap[2]]],
            stages,
        })
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn radices(&self) -> Vec<u32> {
        self.stages.iter().map(|s| s.radix).collect()
    }

    /// Workgroup grid for one stage.
    pub fn dispatch_size(&self, stage: usize) -> [u32; 3] {
        let radix = self.stages[stage].radix;
        [
            self.sample_count.div_ceil(radix * WORKGROUP_SIZE).max(1),
            self.other_counts[0],
            self.other_counts[1],
        ]
    }
}

/// Complete host-side description of a transform.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformLayout {
    sizes: [u32; 3],
    direction: Direction,
    axes: Vec<AxisLayout>,
    result_in_swap_buffer: bool,
}

impl TransformLayout {
    /// Plan with the radices the shaders implement.
    pub fn new(sizes: [u32; 3], direction: Direction) -> Result<Self, FftError> {
        Self::with_radices(sizes, direction, &SUPPORTED_RADICES)
    }

    /// Plan with an explicit radix set.
    pub fn with_radices(
        sizes: [u32; 3],
        direction: Direction,
        radices: &[u32],
    ) -> Result<Self, FftError> {
        // Every axis must factor before any stride is derived from the sizes.
        for (axis, &size) in sizes.iter().enumerate() {
            factorize(size, radices).inspect_err(|_| {
                log::warn!("axis {} size {} has no radix decomposition", axis, size);
            })?;
        }

        let volume: u64 = sizes.iter().map(|&s| s as u64).product();
        if volume > u32::MAX as u64 {
            return Err(FftError::ResourceAllocation(format!(
                "volume {}x{}x{} exceeds 32-bit indexing",
                sizes[0], sizes[1], sizes[2]
            )));
        }

        let mut result_in_swap_buffer = false;
        let mut axes = Vec::new();
        for axis in 0..3 {
            if sizes[axis] == 1 {
                continue;
            }
            let layout = AxisLayout::build(axis, sizes, direction, radices, result_in_swap_buffer)?;
            log::debug!(
                "axis {}: {} samples -> radices {:?}",
                axis,
                layout.sample_count,
                layout.radices()
            );
            if layout.stage_count() % 2 == 1 {
                result_in_swap_buffer = !result_in_swap_buffer;
            }
            axes.push(layout);
        }

        Ok(Self {
            sizes,
            direction,
            axes,
            result_in_swap_buffer,
        })
    }

    pub fn sizes(&self) -> [u32; 3] {
        self.sizes
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Layouts of the axes that have stages, in X, Y, Z order.
    pub fn axes(&self) -> &[AxisLayout] {
        &self.axes
    }

    pub fn axis(&self, axis: usize) -> Option<&AxisLayout> {
        self.axes.iter().find(|a| a.axis == axis)
    }

    /// Number of complex samples in the volume.
    pub fn sample_count(&self) -> usize {
        self.sizes.iter().map(|&s| s as usize).product()
    }

    /// Bytes per ping-pong buffer (two f32 per sample).
    pub fn buffer_size(&self) -> u64 {
        8 * self.sample_count() as u64
    }

    pub fn total_stages(&self) -> usize {
        self.axes.iter().map(AxisLayout::stage_count).sum()
    }

    /// Whether the final data lives in buffer 1.
    pub fn result_in_swap_buffer(&self) -> bool {
        self.result_in_swap_buffer
    }

    pub fn result_buffer_index(&self) -> usize {
        self.result_in_swap_buffer as usize
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            sizes: self.sizes,
            direction: self.direction,
            buffer_size: self.buffer_size(),
            total_stages: self.total_stages(),
            result_buffer: self.result_buffer_index(),
            axes: self
                .axes
                .iter()
                .map(|axis| AxisSummary {
                    axis: axis.axis,
                    sample_count: axis.sample_count,
                    radices: axis.radices(),
                    dispatches: (0..axis.stage_count())
                        .map(|j| axis.dispatch_size(j))
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Serializable overview of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub sizes: [u32; 3],
    pub direction: Direction,
    pub buffer_size: u64,
    pub total_stages: usize,
    pub result_buffer: usize,
    pub axes: Vec<AxisSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSummary {
    pub axis: usize,
    pub sample_count: u32,
    pub radices: Vec<u32>,
    pub dispatches: Vec<[u32; 3]>,
}
