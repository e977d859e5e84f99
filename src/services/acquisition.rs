use futures::stream::{FuturesUnordered, StreamExt};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::models::image::{CapturedImage, ImageKind};

impl CapturedImage {
    /// Wrap encoded bytes from an upload or snapshot, rejecting anything that
    /// is not a JPEG, PNG or WebP still.
    pub fn from_bytes(bytes: Vec<u8>, kind: ImageKind) -> Result<Self, AcquisitionError> {
        if bytes.is_empty() {
            return Err(AcquisitionError::Empty);
        }

        let format = image::guess_format(&bytes).map_err(|_| AcquisitionError::UnsupportedFormat)?;
        let mime_type = match format {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::WebP => "image/webp",
            _ => return Err(AcquisitionError::UnsupportedFormat),
        };

        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            mime_type,
            bytes,
        })
    }
}

/// Read several image files concurrently.
///
/// Results arrive in completion order, not argument order, each paired with
/// its path; every file becomes an independent [`CapturedImage`].
pub async fn load_files(
    paths: &[PathBuf],
    kind: ImageKind,
) -> Vec<(PathBuf, Result<CapturedImage, AcquisitionError>)> {
    let mut pending: FuturesUnordered<_> = paths
        .iter()
        .map(|p| async move { (p.clone(), load_file(p, kind).await) })
        .collect();

    let mut loaded = Vec::with_capacity(paths.len());
    while let Some((path, result)) = pending.next().await {
        if let Err(ref e) = result {
            tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable image file");
        }
        loaded.push((path, result));
    }
    loaded
}

async fn load_file(path: &Path, kind: ImageKind) -> Result<CapturedImage, AcquisitionError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| AcquisitionError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    CapturedImage::from_bytes(bytes, kind)
}

#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("Image payload is empty")]
    Empty,

    #[error("Unsupported image format (expected JPEG, PNG or WebP)")]
    UnsupportedFormat,

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}
