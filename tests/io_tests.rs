//! Sample stream and pipeline configuration tests.

use std::fs::File;
use std::io::Write;

use phobz_fft::io::{read_samples, write_samples, DataFormat, IoFormatError};
use phobz_fft::pipeline::{describe_plan, run_transform, PipelineConfig, PipelineError};
use phobz_fft::Complex32;

fn samples(count: usize) -> Vec<Complex32> {
    (0..count)
        .map(|i| Complex32::new(i as f32 * 0.5 - 1.0, 0.25 * (i % 3) as f32))
        .collect()
}

#[test]
fn test_raw_stream_layout() {
    let input = samples(4);
    let mut bytes = Vec::new();
    write_samples(&mut bytes, DataFormat::Raw, [2, 2, 1], &input).unwrap();
    assert_eq!(bytes.len(), 32);
    assert_eq!(&bytes[0..4], &(-1.0f32).to_le_bytes());
    assert_eq!(&bytes[4..8], &0.0f32.to_le_bytes());

    let decoded = read_samples(&mut bytes.as_slice(), DataFormat::Raw, [2, 2, 1]).unwrap();
    assert_eq!(decoded, input);
}

#[test]
fn test_ascii_reads_any_whitespace() {
    let text = "1.5 -2\n\t0 0.25\n\n3 4   ";
    let decoded = read_samples(&mut text.as_bytes(), DataFormat::Ascii, [3, 1, 1]).unwrap();
    assert_eq!(
        decoded,
        vec![
            Complex32::new(1.5, -2.0),
            Complex32::new(0.0, 0.25),
            Complex32::new(3.0, 4.0),
        ]
    );
}

#[test]
fn test_ascii_rejects_trailing_values() {
    let err = read_samples(&mut "1 2 3 4 5".as_bytes(), DataFormat::Ascii, [2, 1, 1]).unwrap_err();
    assert!(matches!(err, IoFormatError::TrailingData));
}

#[test]
fn test_ascii_slices_separated_by_blank_line() {
    let mut out = Vec::new();
    write_samples(&mut out, DataFormat::Ascii, [1, 2, 2], &samples(4)).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[2], "");
    assert!(lines[0].ends_with(' '));
}

#[test]
fn test_png_round_trip_real_part() {
    let sizes = [4, 2, 1];
    let input: Vec<Complex32> = [-1.0, -0.5, 0.0, 0.5, 1.0, 0.25, -0.75, 0.9]
        .iter()
        .map(|&re| Complex32::new(re, 0.0))
        .collect();

    let mut encoded = Vec::new();
    write_samples(&mut encoded, DataFormat::Png, sizes, &input).unwrap();
    assert_eq!(&encoded[1..4], b"PNG");

    let decoded = read_samples(&mut encoded.as_slice(), DataFormat::Png, sizes).unwrap();
    for (a, b) in decoded.iter().zip(&input) {
        assert!((a.re - b.re).abs() < 1.0 / 32767.0, "{} != {}", a, b);
        assert_eq!(a.im, 0.0);
    }
}

#[test]
fn test_png_dimension_mismatch() {
    let mut encoded = Vec::new();
    write_samples(&mut encoded, DataFormat::Png, [4, 2, 1], &samples(8)).unwrap();
    let err = read_samples(&mut encoded.as_slice(), DataFormat::Png, [2, 4, 1]).unwrap_err();
    assert!(matches!(
        err,
        IoFormatError::PngDimensions {
            width: 4,
            height: 2,
            ..
        }
    ));
}

#[test]
fn test_png_rejects_garbage() {
    let err = read_samples(&mut b"not an image".as_slice(), DataFormat::Png, [2, 2, 1]).unwrap_err();
    assert!(matches!(err, IoFormatError::Image(_)));
}

#[test]
fn test_config_from_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fft.json");
    let mut file = File::create(&path).unwrap();
    writeln!(
        file,
        r#"{{"sizes": [8, 8, 1], "inverse": true, "input_format": "raw", "use_gpu": false}}"#
    )
    .unwrap();

    let config = PipelineConfig::from_json_file(&path).unwrap();
    assert_eq!(config.sizes, [8, 8, 1]);
    assert!(config.inverse);
    assert_eq!(config.input_format, DataFormat::Raw);
    assert_eq!(config.output_format, DataFormat::Ascii);
    assert!(!config.use_gpu);

    let summary = describe_plan(&config).unwrap();
    assert_eq!(summary.total_stages, 2);
    assert_eq!(summary.result_buffer, 0);
}

#[test]
fn test_config_invalid_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ sizes: ").unwrap();
    assert!(matches!(
        PipelineConfig::from_json_file(&path),
        Err(PipelineError::Config(_))
    ));
}

#[tokio::test]
async fn test_cpu_pipeline_round_trip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let raw_path = dir.path().join("spectrum.raw");
    let input = samples(32);
    let mut ascii_in = Vec::new();
    write_samples(&mut ascii_in, DataFormat::Ascii, [8, 4, 1], &input).unwrap();

    let forward = PipelineConfig {
        sizes: [8, 4, 1],
        input_format: DataFormat::Ascii,
        output_format: DataFormat::Raw,
        use_gpu: false,
        ..Default::default()
    };
    let mut raw_file = File::create(&raw_path).unwrap();
    run_transform(&forward, &mut ascii_in.as_slice(), &mut raw_file)
        .await
        .unwrap();
    drop(raw_file);

    let inverse = PipelineConfig {
        inverse: true,
        input_format: DataFormat::Raw,
        ..forward.clone()
    };
    let mut raw_in = File::open(&raw_path).unwrap();
    let mut restored_raw = Vec::new();
    run_transform(&inverse, &mut raw_in, &mut restored_raw)
        .await
        .unwrap();

    let restored = read_samples(&mut restored_raw.as_slice(), DataFormat::Raw, [8, 4, 1]).unwrap();
    for (a, b) in restored.iter().zip(&input) {
        assert!((*a - *b).norm() < 1e-4, "{} != {}", a, b);
    }
}
