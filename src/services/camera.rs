//! Live camera capture.
//!
//! A [`CaptureSession`] owns the stream for as long as the capture view is
//! open and stops every track when dropped, including after a failed
//! snapshot.

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::models::image::{CapturedImage, ImageKind};
use crate::services::acquisition::AcquisitionError;

/// JPEG quality used for still snapshots.
const SNAPSHOT_QUALITY: u8 = 80;

/// Which physical camera to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    /// Rear camera, pointed at the label or garment.
    Environment,
    User,
}

/// A single uncompressed RGB frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

pub trait CameraDevice: Send {
    fn open(&mut self, facing: Facing) -> Result<Box<dyn CameraStream>, CameraError>;
}

pub trait CameraStream: Send {
    fn current_frame(&mut self) -> Result<Frame, CameraError>;
    fn stop(&mut self);
}

pub struct CaptureSession {
    stream: Option<Box<dyn CameraStream>>,
    error: Option<CameraError>,
}

impl CaptureSession {
    /// Request the environment-facing camera. Failure leaves the session open
    /// in an error state with no stream.
    pub fn open(device: &mut dyn CameraDevice) -> Self {
        match device.open(Facing::Environment) {
            Ok(stream) => Self {
                stream: Some(stream),
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Camera unavailable");
                Self {
                    stream: None,
                    error: Some(e),
                }
            }
        }
    }

    pub fn error(&self) -> Option<&CameraError> {
        self.error.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    /// Compress the current frame into a still image and close the session.
    /// A session that failed to open returns the error it opened with.
    pub fn snapshot(mut self, kind: ImageKind) -> Result<CapturedImage, CameraError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(self.error.take().unwrap_or(CameraError::NotStreaming));
        };
        let frame = stream.current_frame()?;
        let jpeg = encode_jpeg(&frame)?;
        CapturedImage::from_bytes(jpeg, kind).map_err(CameraError::Acquisition)
    }

    pub fn close(self) {}
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            tracing::debug!("Camera stream released");
        }
    }
}

fn encode_jpeg(frame: &Frame) -> Result<Vec<u8>, CameraError> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, SNAPSHOT_QUALITY)
        .write_image(&frame.rgb, frame.width, frame.height, ExtendedColorType::Rgb8)
        .map_err(CameraError::Image)?;
    Ok(out)
}

/// Rear camera exposed as a still file that an external grabber keeps
/// current (`fswebcam --loop`, a UVC daemon). Every frame re-reads the file.
pub struct SnapshotFileCamera {
    path: PathBuf,
}

impl SnapshotFileCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CameraDevice for SnapshotFileCamera {
    fn open(&mut self, facing: Facing) -> Result<Box<dyn CameraStream>, CameraError> {
        if facing != Facing::Environment {
            return Err(CameraError::NoDevice);
        }
        match std::fs::metadata(&self.path) {
            Ok(meta) if meta.is_file() => Ok(Box::new(SnapshotFileStream {
                path: self.path.clone(),
                stopped: false,
            })),
            Ok(_) => Err(CameraError::NoDevice),
            Err(e) => Err(device_error(e.kind())),
        }
    }
}

struct SnapshotFileStream {
    path: PathBuf,
    stopped: bool,
}

impl CameraStream for SnapshotFileStream {
    fn current_frame(&mut self) -> Result<Frame, CameraError> {
        if self.stopped {
            return Err(CameraError::NotStreaming);
        }
        let bytes = std::fs::read(&self.path).map_err(|e| device_error(e.kind()))?;
        let rgb = image::load_from_memory(&bytes)?.to_rgb8();
        Ok(Frame {
            width: rgb.width(),
            height: rgb.height(),
            rgb: rgb.into_raw(),
        })
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

fn device_error(kind: ErrorKind) -> CameraError {
    match kind {
        ErrorKind::PermissionDenied => CameraError::PermissionDenied,
        _ => CameraError::NoDevice,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("No camera device available")]
    NoDevice,

    #[error("Camera is not streaming")]
    NotStreaming,

    #[error("Failed to process camera frame: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Acquisition(AcquisitionError),
}
