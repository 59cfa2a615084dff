//! Host replay of the radix stage kernel.

use std::f32::consts::TAU;

use rustfft::num_complex::Complex32;

use crate::gpu::compute::{FftError, StageParams, TransformLayout};

/// Run every stage of `layout` on the host with the same records, buffer
/// selection and index arithmetic the compute kernel uses, and return the
/// contents of the buffer the layout names as the result.
pub fn emulate(layout: &TransformLayout, input: &[Complex32]) -> Result<Vec<Complex32>, FftError> {
    if input.len() != layout.sample_count() {
        return Err(FftError::SampleCountMismatch {
            expected: layout.sample_count(),
            got: input.len(),
        });
    }

    let zero = Complex32::new(0.0, 0.0);
    let mut buffers = [input.to_vec(), vec![zero; input.len()]];

    for axis in layout.axes() {
        let [other0, other1] = axis.other_counts;
        for stage in &axis.stages {
            let [first, second] = &mut buffers;
            let (src, dst) = match (stage.read_buffer, stage.write_buffer) {
                (0, 1) => (&*first, second),
                (1, 0) => (&*second, first),
                (read, write) => {
                    return Err(FftError::ExecutionFailed(format!(
                        "stage reads buffer {} and writes buffer {}",
                        read, write
                    )))
                }
            };
            for gz in 0..other1 {
                for gy in 0..other0 {
                    for j in 0..stage.params.radix_stride {
                        butterfly(
                            &stage.params,
                            stage.radix,
                            [j, gy, gz],
                            src,
                            &mut dst[..],
                        );
                    }
                }
            }
        }
    }

    let [first, second] = buffers;
    Ok(if layout.result_in_swap_buffer() {
        second
    } else {
        first
    })
}

fn butterfly(
    params: &StageParams,
    radix: u32,
    gid: [u32; 3],
    src: &[Complex32],
    dst: &mut [Complex32],
) {
    let [stride_x, stride_y, stride_z] = params.stride;
    let [j, gy, gz] = gid;
    let base = gy * stride_y + gz * stride_z;
    let ns = params.stage_size;
    let k = j % ns;

    let twiddle = -params.angle_factor * 2.0 * k as f32 / radix as f32;
    let v: Vec<Complex32> = (0..radix)
        .map(|r| {
            let x = src[(base + (j + r * params.radix_stride) * stride_x) as usize];
            x * Complex32::from_polar(1.0, twiddle * r as f32)
        })
        .collect();

    let step = -params.direction_factor * TAU / radix as f32;
    let out_index = (j / ns) * ns * radix + k;
    for q in 0..radix {
        let acc: Complex32 = v
            .iter()
            .enumerate()
            .map(|(r, x)| *x * Complex32::from_polar(1.0, step * ((q * r as u32) % radix) as f32))
            .sum();
        dst[(base + (out_index + q * ns) * stride_x) as usize] = acc * params.normalization_factor;
    }
}
