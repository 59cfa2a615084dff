//! Integration tests for the GPU transform.
//!
//! Every test returns early when no adapter is available.

use std::sync::Arc;
use std::time::Duration;

use phobz_fft::cpu::CpuTransform;
use phobz_fft::gpu::compute::{Direction, FftContext, FftError, TransformLayout, TransformPlan};
use phobz_fft::gpu::GpuContext;
use phobz_fft::transform::{DynamicTransform, GpuTransform, Transform};
use phobz_fft::Complex32;

async fn create_fft_context() -> Option<FftContext> {
    let gpu = GpuContext::new().await.ok()?;
    Some(
        FftContext::new(gpu.device.clone(), gpu.queue.clone())
            .with_timeout(Some(Duration::from_secs(30))),
    )
}

fn test_signal(count: usize) -> Vec<Complex32> {
    (0..count)
        .map(|i| {
            let t = i as f32;
            Complex32::new((t * 0.21).cos(), (t * 0.05).sin() * 0.5)
        })
        .collect()
}

fn assert_all_close(actual: &[Complex32], expected: &[Complex32], tolerance: f32) {
    assert_eq!(actual.len(), expected.len());
    let scale = expected.iter().map(|v| v.norm()).fold(1.0f32, f32::max);
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (*a - *e).norm() <= tolerance * scale,
            "sample {}: {} != {}",
            i,
            a,
            e
        );
    }
}

fn run_plan(
    ctx: &FftContext,
    sizes: [u32; 3],
    direction: Direction,
    input: &[Complex32],
) -> Vec<Complex32> {
    let plan = TransformPlan::build(ctx, sizes, direction).unwrap();
    plan.upload(ctx, input).unwrap();
    plan.execute(ctx).unwrap();
    let output = plan.download(ctx).unwrap();
    plan.destroy();
    output
}

#[tokio::test]
async fn test_gpu_all_ones_length_eight() {
    if let Some(ctx) = create_fft_context().await {
        let output = run_plan(
            &ctx,
            [8, 1, 1],
            Direction::Forward,
            &vec![Complex32::new(1.0, 0.0); 8],
        );

        // Bin 0 holds 8 before the 1/8 forward scaling.
        assert!((output[0].re * 8.0 - 8.0).abs() < 1e-4);
        assert!(output[0].im.abs() < 1e-5);
        for v in &output[1..] {
            assert!(v.norm() < 1e-5, "non-DC bin {}", v);
        }
    }
}

#[tokio::test]
async fn test_gpu_round_trip() {
    if let Some(ctx) = create_fft_context().await {
        let cases: [[u32; 3]; 8] = [
            [2, 1, 1],
            [4, 1, 1],
            [8, 1, 1],
            [16, 1, 1],
            [64, 1, 1],
            [256, 1, 1],
            [8, 8, 1],
            [4, 4, 4],
        ];
        for sizes in cases {
            let input = test_signal(sizes.iter().map(|&s| s as usize).product());
            // Forward scales each axis by 1/N and inverse is unscaled, so bin 0
            // holds the mean and the round trip returns the input itself.
            let spectrum = run_plan(&ctx, sizes, Direction::Forward, &input);
            let mean = input.iter().sum::<Complex32>() / input.len() as f32;
            assert!((spectrum[0] - mean).norm() < 1e-4, "sizes {:?}", sizes);

            let restored = run_plan(&ctx, sizes, Direction::Inverse, &spectrum);
            assert_all_close(&restored, &input, 1e-4);
        }
    }
}

#[tokio::test]
async fn test_gpu_matches_cpu_reference() {
    if let Some(ctx) = create_fft_context().await {
        for sizes in [[1024, 1, 1], [32, 16, 1], [8, 4, 16], [1, 1, 128]] {
            for direction in [Direction::Forward, Direction::Inverse] {
                let input = test_signal(sizes.iter().map(|&s| s as usize).product());
                let gpu = run_plan(&ctx, sizes, direction, &input);
                let cpu = CpuTransform::new(sizes, direction)
                    .unwrap()
                    .process(&input)
                    .unwrap();
                assert_all_close(&gpu, &cpu, 1e-4);
            }
        }
    }
}

#[tokio::test]
async fn test_gpu_result_buffer_follows_stage_parity() {
    if let Some(ctx) = create_fft_context().await {
        // 16 = 8 * 2 (even stage count), 8 (one stage) -> three stages total.
        let plan = TransformPlan::build(&ctx, [16, 8, 1], Direction::Forward).unwrap();
        assert_eq!(plan.layout().total_stages(), 3);
        assert!(plan.result_in_swap_buffer());
        assert!(plan.axis(0).is_some());
        assert!(plan.axis(1).is_some());
        assert!(plan.axis(2).is_none());
        plan.destroy();
    }
}

#[tokio::test]
async fn test_gpu_invalid_size_rejected_before_allocation() {
    if let Some(ctx) = create_fft_context().await {
        let result = TransformPlan::build(&ctx, [16, 6, 1], Direction::Forward);
        assert!(matches!(
            result,
            Err(FftError::InvalidTransformSize { size: 6, .. })
        ));
    }
}

#[tokio::test]
async fn test_gpu_upload_length_mismatch() {
    if let Some(ctx) = create_fft_context().await {
        let plan = TransformPlan::build(&ctx, [16, 1, 1], Direction::Forward).unwrap();
        let err = plan
            .upload(&ctx, &vec![Complex32::new(0.0, 0.0); 15])
            .unwrap_err();
        assert!(matches!(
            err,
            FftError::SampleCountMismatch {
                expected: 16,
                got: 15
            }
        ));
        plan.destroy();
    }
}

#[tokio::test]
async fn test_gpu_plan_from_layout_reused() {
    if let Some(ctx) = create_fft_context().await {
        let layout = TransformLayout::new([64, 4, 1], Direction::Inverse).unwrap();
        let input = test_signal(layout.sample_count());

        let first = TransformPlan::from_layout(&ctx, layout.clone()).unwrap();
        first.upload(&ctx, &input).unwrap();
        first.execute(&ctx).unwrap();
        let a = first.download(&ctx).unwrap();
        first.destroy();

        let second = TransformPlan::from_layout(&ctx, layout).unwrap();
        second.upload(&ctx, &input).unwrap();
        second.execute(&ctx).unwrap();
        let b = second.download(&ctx).unwrap();
        second.destroy();

        assert_all_close(&a, &b, 1e-6);
    }
}

#[tokio::test]
async fn test_dynamic_transform_uses_gpu() {
    if let Some(ctx) = create_fft_context().await {
        let ctx = Arc::new(ctx);
        let mut transform =
            DynamicTransform::gpu_with_fallback(Some(ctx.clone()), [32, 1, 1], Direction::Forward)
                .unwrap();
        assert!(transform.is_gpu());

        let input = test_signal(32);
        let output = transform.process(&input).unwrap();
        let expected = GpuTransform::new(ctx, [32, 1, 1], Direction::Forward)
            .unwrap()
            .process(&input)
            .unwrap();
        assert_all_close(&output, &expected, 1e-6);
    }
}
