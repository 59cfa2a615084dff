//! Sample stream formats for reading transform input and writing output.
//!
//! Samples are ordered X fastest, then Y, then Z.
//!
//! - `raw`: packed little-endian `(re, im)` f32 pairs, exactly 8 bytes per
//!   sample.
//! - `ascii`: whitespace separated `re im` pairs on input; on output one
//!   line per row with a blank line between Z slices.
//! - `png`: 16-bit grayscale, 2-D only. Pixels map to `px / 32767 - 1` on
//!   input (imaginary part zero) and the real part maps back on output.

use std::fmt;
use std::io::{Cursor, Read, Write};
use std::str::FromStr;

use image::{ImageBuffer, ImageFormat, Luma};
use num_complex::Complex32;
use serde::{Deserialize, Serialize};

/// Errors raised while decoding or encoding a sample stream.
#[derive(Debug, thiserror::Error)]
pub enum IoFormatError {
    #[error("Unknown data format '{0}' (expected raw, ascii or png)")]
    UnknownFormat(String),
    #[error("Expected {expected} bytes of raw input but got {got}")]
    ShortRaw { expected: usize, got: usize },
    #[error("Expected {expected} samples but got {got}")]
    SampleCount { expected: usize, got: usize },
    #[error("Invalid number '{token}' at sample {index}")]
    Parse { token: String, index: usize },
    #[error("Unexpected data after the last sample")]
    TrailingData,
    #[error("PNG streams are two dimensional, got depth {0}")]
    PngDepth(u32),
    #[error("PNG is {width}x{height} but the transform is {expected_width}x{expected_height}")]
    PngDimensions {
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Encoding of a sample stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Raw,
    #[default]
    Ascii,
    Png,
}

impl DataFormat {
    pub fn name(&self) -> &'static str {
        match self {
            DataFormat::Raw => "raw",
            DataFormat::Ascii => "ascii",
            DataFormat::Png => "png",
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataFormat {
    type Err = IoFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raw" => Ok(DataFormat::Raw),
            "ascii" | "text" => Ok(DataFormat::Ascii),
            "png" => Ok(DataFormat::Png),
            _ => Err(IoFormatError::UnknownFormat(s.to_string())),
        }
    }
}

/// Read one volume of `sizes` samples from `reader`.
pub fn read_samples<R: Read>(
    reader: &mut R,
    format: DataFormat,
    sizes: [u32; 3],
) -> Result<Vec<Complex32>, IoFormatError> {
    let count = sample_count(sizes);
    match format {
        DataFormat::Raw => read_raw(reader, count),
        DataFormat::Ascii => read_ascii(reader, count),
        DataFormat::Png => read_png(reader, sizes),
    }
}

/// Write one volume of `sizes` samples to `writer`.
pub fn write_samples<W: Write>(
    writer: &mut W,
    format: DataFormat,
    sizes: [u32; 3],
    samples: &[Complex32],
) -> Result<(), IoFormatError> {
    let count = sample_count(sizes);
    if samples.len() != count {
        return Err(IoFormatError::SampleCount {
            expected: count,
            got: samples.len(),
        });
    }
    match format {
        DataFormat::Raw => write_raw(writer, samples),
        DataFormat::Ascii => write_ascii(writer, sizes, samples),
        DataFormat::Png => write_png(writer, sizes, samples),
    }?;
    writer.flush()?;
    Ok(())
}

fn sample_count(sizes: [u32; 3]) -> usize {
    sizes.iter().map(|&s| s as usize).product()
}

fn read_raw<R: Read>(reader: &mut R, count: usize) -> Result<Vec<Complex32>, IoFormatError> {
    let expected = count * std::mem::size_of::<Complex32>();
    let mut bytes = Vec::with_capacity(expected);
    reader.take(expected as u64).read_to_end(&mut bytes)?;
    if bytes.len() != expected {
        return Err(IoFormatError::ShortRaw {
            expected,
            got: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|c| {
            Complex32::new(
                f32::from_le_bytes([c[0], c[1], c[2], c[3]]),
                f32::from_le_bytes([c[4], c[5], c[6], c[7]]),
            )
        })
        .collect())
}

fn write_raw<W: Write>(writer: &mut W, samples: &[Complex32]) -> Result<(), IoFormatError> {
    for s in samples {
        writer.write_all(&s.re.to_le_bytes())?;
        writer.write_all(&s.im.to_le_bytes())?;
    }
    Ok(())
}

fn read_ascii<R: Read>(reader: &mut R, count: usize) -> Result<Vec<Complex32>, IoFormatError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    let mut tokens = text.split_whitespace();
    let mut samples = Vec::with_capacity(count);
    for index in 0..count {
        let mut next = || -> Result<f32, IoFormatError> {
            let token = tokens.next().ok_or(IoFormatError::SampleCount {
                expected: count,
                got: index,
            })?;
            token.parse().map_err(|_| IoFormatError::Parse {
                token: token.to_string(),
                index,
            })
        };
        let re = next()?;
        let im = next()?;
        samples.push(Complex32::new(re, im));
    }

    if tokens.next().is_some() {
        return Err(IoFormatError::TrailingData);
    }
    Ok(samples)
}

fn write_ascii<W: Write>(
    writer: &mut W,
    sizes: [u32; 3],
    samples: &[Complex32],
) -> Result<(), IoFormatError> {
    let row = sizes[0] as usize;
    let slice = row * sizes[1] as usize;
    if slice == 0 {
        return Ok(());
    }
    for (z, plane) in samples.chunks(slice).enumerate() {
        if z > 0 {
            writeln!(writer)?;
        }
        for line in plane.chunks(row) {
            for s in line {
                write!(writer, "{:.6} {:.6} ", s.re, s.im)?;
            }
            writeln!(writer)?;
        }
    }
    Ok(())
}

fn check_png_sizes(sizes: [u32; 3], width: u32, height: u32) -> Result<(), IoFormatError> {
    if sizes[2] != 1 {
        return Err(IoFormatError::PngDepth(sizes[2]));
    }
    if width != sizes[0] || height != sizes[1] {
        return Err(IoFormatError::PngDimensions {
            width,
            height,
            expected_width: sizes[0],
            expected_height: sizes[1],
        });
    }
    Ok(())
}

fn read_png<R: Read>(reader: &mut R, sizes: [u32; 3]) -> Result<Vec<Complex32>, IoFormatError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let image = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?.to_luma16();
    check_png_sizes(sizes, image.width(), image.height())?;

    Ok(image
        .pixels()
        .map(|Luma([px])| Complex32::new(*px as f32 / 32767.0 - 1.0, 0.0))
        .collect())
}

fn write_png<W: Write>(
    writer: &mut W,
    sizes: [u32; 3],
    samples: &[Complex32],
) -> Result<(), IoFormatError> {
    check_png_sizes(sizes, sizes[0], sizes[1])?;
    let pixels: Vec<u16> = samples
        .iter()
        .map(|s| ((s.re + 1.0) * 32767.0).round().clamp(0.0, u16::MAX as f32) as u16)
        .collect();

    let image: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_raw(sizes[0], sizes[1], pixels)
        .ok_or(IoFormatError::SampleCount {
            expected: sample_count(sizes),
            got: samples.len(),
        })?;

    let mut encoded = Cursor::new(Vec::new());
    image.write_to(&mut encoded, ImageFormat::Png)?;
    writer.write_all(encoded.get_ref())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!("raw".parse::<DataFormat>().unwrap(), DataFormat::Raw);
        assert_eq!("ASCII".parse::<DataFormat>().unwrap(), DataFormat::Ascii);
        assert_eq!("png".parse::<DataFormat>().unwrap(), DataFormat::Png);
        assert!(matches!(
            "jpeg".parse::<DataFormat>(),
            Err(IoFormatError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_ascii_layout() {
        let samples = vec![
            Complex32::new(1.0, 0.0),
            Complex32::new(2.0, -1.0),
            Complex32::new(0.5, 0.25),
            Complex32::new(0.0, 0.0),
        ];
        let mut out = Vec::new();
        write_samples(&mut out, DataFormat::Ascii, [2, 1, 2], &samples).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1.000000 0.000000 2.000000 -1.000000 \n\n0.500000 0.250000 0.000000 0.000000 \n"
        );
    }

    #[test]
    fn test_ascii_short_input() {
        let err = read_samples(&mut "1 0 2".as_bytes(), DataFormat::Ascii, [2, 1, 1]).unwrap_err();
        assert!(matches!(
            err,
            IoFormatError::SampleCount {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn test_ascii_bad_token() {
        let err = read_samples(&mut "1 x".as_bytes(), DataFormat::Ascii, [1, 1, 1]).unwrap_err();
        assert!(matches!(err, IoFormatError::Parse { index: 0, .. }));
    }

    #[test]
    fn test_raw_short_input() {
        let err = read_samples(&mut [0u8; 12].as_slice(), DataFormat::Raw, [2, 1, 1]).unwrap_err();
        assert!(matches!(
            err,
            IoFormatError::ShortRaw {
                expected: 16,
                got: 12
            }
        ));
    }

    #[test]
    fn test_png_rejects_volume() {
        let samples = vec![Complex32::new(0.0, 0.0); 8];
        let err = write_samples(&mut Vec::new(), DataFormat::Png, [2, 2, 2], &samples).unwrap_err();
        assert!(matches!(err, IoFormatError::PngDepth(2)));
    }
}
