//! One-shot staging transfers between host memory and device buffers.
//!
//! A [`Transfer`] owns the staging region for the duration of a single upload
//! or download. Every device-side copy it issues is submitted and waited on
//! before the call returns.

use wgpu::Buffer;

use super::buffers::{create_download_staging, create_upload_staging};
use super::context::{FftContext, FftError};

enum Staging {
    /// Host bytes, turned into a device staging buffer when the upload ends.
    Upload(Vec<u8>),
    /// Mapped, host-readable staging buffer.
    Download(Buffer),
}

/// Staging region for one upload or one download.
pub struct Transfer<'ctx> {
    context: &'ctx FftContext,
    staging: Staging,
    size: u64,
}

impl<'ctx> Transfer<'ctx> {
    /// Allocate a zeroed, writable staging region of `size` bytes.
    ///
    /// Nothing on the device is touched until [`Transfer::end`].
    pub fn begin_upload(context: &'ctx FftContext, size: u64) -> Result<Self, FftError> {
        check_size(context, size)?;
        Ok(Self {
            context,
            staging: Staging::Upload(vec![0; size as usize]),
            size,
        })
    }

    /// Copy `size` bytes of `source` into fresh staging memory and map it
    /// for reading.
    pub fn begin_download(
        context: &'ctx FftContext,
        size: u64,
        source: &Buffer,
    ) -> Result<Self, FftError> {
        check_size(context, size)?;
        let staging = create_download_staging(context.device(), size);

        let mut encoder =
            context
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("fft_download_encoder"),
                });
        encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
        context.submit_and_wait(encoder)?;

        let (tx, rx) = std::sync::mpsc::channel();
        staging.slice(..).map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        context.wait(None)?;

        rx.recv()
            .map_err(|e| FftError::BufferMapFailed(e.to_string()))?
            .map_err(|e| FftError::BufferMapFailed(format!("{:?}", e)))?;

        Ok(Self {
            context,
            staging: Staging::Download(staging),
            size,
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Mutable access to the staging bytes of an upload.
    pub fn write_with<R>(&mut self, f: impl FnOnce(&mut [u8]) -> R) -> Result<R, FftError> {
        match &mut self.staging {
            Staging::Upload(bytes) => Ok(f(bytes.as_mut_slice())),
            Staging::Download(_) => Err(FftError::BufferMapFailed(
                "download staging is read-only".to_string(),
            )),
        }
    }

    /// Copy `bytes` to the start of an upload's staging region.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), FftError> {
        if bytes.len() as u64 > self.size {
            return Err(FftError::BufferMapFailed(format!(
                "{} bytes do not fit a {} byte staging buffer",
                bytes.len(),
                self.size
            )));
        }
        self.write_with(|staging| staging[..bytes.len()].copy_from_slice(bytes))
    }

    /// Read access to the staging bytes of a download.
    pub fn read_with<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R, FftError> {
        match &self.staging {
            Staging::Download(buffer) => {
                let view = buffer.slice(..).get_mapped_range();
                Ok(f(&view[..]))
            }
            Staging::Upload(_) => Err(FftError::BufferMapFailed(
                "upload staging is write-only".to_string(),
            )),
        }
    }

    /// Finish the transfer.
    ///
    /// For an upload with a `destination`, the staging bytes are copied into
    /// it and the call blocks until the copy completes. Any device staging
    /// buffer is unmapped and released.
    pub fn end(self, destination: Option<&Buffer>) -> Result<(), FftError> {
        match (self.staging, destination) {
            (Staging::Upload(bytes), Some(destination)) => {
                let device = self.context.device();
                let staging = create_upload_staging(device, &bytes);
                let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("fft_upload_encoder"),
                });
                encoder.copy_buffer_to_buffer(&staging, 0, destination, 0, self.size);
                let result = self.context.submit_and_wait(encoder);
                staging.destroy();
                result
            }
            (Staging::Upload(_), None) => Ok(()),
            (Staging::Download(staging), _) => {
                staging.unmap();
                staging.destroy();
                Ok(())
            }
        }
    }
}

fn check_size(context: &FftContext, size: u64) -> Result<(), FftError> {
    let max = context.limits().max_buffer_size;
    if size == 0 || size % wgpu::COPY_BUFFER_ALIGNMENT != 0 || size > max {
        return Err(FftError::ResourceAllocation(format!(
            "invalid staging size {} (max {}, alignment {})",
            size,
            max,
            wgpu::COPY_BUFFER_ALIGNMENT
        )));
    }
    Ok(())
}
