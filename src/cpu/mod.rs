//! Host implementations of the multi-axis transform.
//!
//! [`CpuTransform`] runs RustFFT along each axis and is the fallback backend
//! when no GPU is available. [`emulate`] replays a [`TransformLayout`] stage
//! by stage exactly as the compute kernel would.

mod emulate;

pub use emulate::emulate;

use rustfft::{num_complex::Complex32, FftPlanner};

use crate::gpu::compute::{Direction, FftError, TransformLayout};

/// RustFFT-backed transform over a volume of up to three axes.
///
/// Uses the same conventions as the GPU path: forward scales each axis by
/// `1 / N`, inverse is unscaled, and only sizes the GPU plan accepts are
/// accepted here.
pub struct CpuTransform {
    planner: FftPlanner<f32>,
    sizes: [u32; 3],
    direction: Direction,
}

impl CpuTransform {
    pub fn new(sizes: [u32; 3], direction: Direction) -> Result<Self, FftError> {
        TransformLayout::new(sizes, direction)?;
        Ok(Self {
            planner: FftPlanner::new(),
            sizes,
            direction,
        })
    }

    pub fn sizes(&self) -> [u32; 3] {
        self.sizes
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn sample_count(&self) -> usize {
        self.sizes.iter().map(|&s| s as usize).product()
    }

    /// Transform `samples` (X fastest, then Y, then Z) into a new vector.
    pub fn process(&mut self, samples: &[Complex32]) -> Result<Vec<Complex32>, FftError> {
        if samples.len() != self.sample_count() {
            return Err(FftError::SampleCountMismatch {
                expected: self.sample_count(),
                got: samples.len(),
            });
        }

        let mut data = samples.to_vec();
        let [w, h, d] = self.sizes.map(|s| s as usize);
        let strides = [1, w, w * h];

        for axis in 0..3 {
            let n = self.sizes[axis] as usize;
            if n == 1 {
                continue;
            }
            let fft = match self.direction {
                Direction::Forward => self.planner.plan_fft_forward(n),
                Direction::Inverse => self.planner.plan_fft_inverse(n),
            };
            let scale = match self.direction {
                Direction::Forward => 1.0 / n as f32,
                Direction::Inverse => 1.0,
            };

            let stride = strides[axis];
            let mut line = vec![Complex32::new(0.0, 0.0); n];
            for start in line_starts(axis, w, h, d) {
                for (i, v) in line.iter_mut().enumerate() {
                    *v = data[start + i * stride];
                }
                fft.process(&mut line);
                for (i, v) in line.iter().enumerate() {
                    data[start + i * stride] = *v * scale;
                }
            }
        }

        Ok(data)
    }
}

/// First element of every line along `axis`.
fn line_starts(axis: usize, w: usize, h: usize, d: usize) -> Vec<usize> {
    let mut starts = Vec::new();
    for z in 0..d {
        for y in 0..h {
            for x in 0..w {
                let on_axis = [x, y, z][axis];
                if on_axis == 0 {
                    starts.push(x + y * w + z * w * h);
                }
            }
        }
    }
    starts
}
