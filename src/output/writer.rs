//! Encoding grabbed frames to disk.

use chrono::{DateTime, Local};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Quality used for lossy output.
pub const JPEG_QUALITY: u8 = 95;

/// Format of the destination folder name, one folder per second.
pub const FOLDER_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Output file format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenshotFileType {
    /// Uncompressed bitmap.
    #[default]
    Bmp,
    /// Lossy, at [`JPEG_QUALITY`].
    Jpeg,
    /// Lossless.
    Png,
}

impl ScreenshotFileType {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Bmp => "bmp",
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("frame has {actual} bytes, expected {width}x{height} RGBA")]
    SizeMismatch { width: u32, height: u32, actual: usize },

    #[error("failed to create {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Writes RGBA8 frames of a fixed size in one file format.
#[derive(Clone, Copy, Debug)]
pub struct ImageWriter {
    file_type: ScreenshotFileType,
    width: u32,
    height: u32,
}

impl ImageWriter {
    pub fn new(file_type: ScreenshotFileType, width: u32, height: u32) -> Self {
        Self { file_type, width, height }
    }

    /// Bytes in one RGBA8 frame, `None` if that overflows.
    pub fn frame_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(4)
    }

    /// Path of frame `index` inside `destination`.
    pub fn shot_path(&self, destination: &Path, index: usize) -> PathBuf {
        destination.join(format!("{}.{}", index, self.file_type.extension()))
    }

    /// Writes one frame to `<destination>/<index>.<ext>`.
    pub fn save_shot_to_file(
        &self,
        destination: &Path,
        frame: &[u8],
        index: usize,
    ) -> Result<PathBuf, WriteError> {
        let path = self.shot_path(destination, index);
        let size_mismatch = || WriteError::SizeMismatch {
            width: self.width,
            height: self.height,
            actual: frame.len(),
        };
        if Some(frame.len()) != self.frame_len() {
            return Err(size_mismatch());
        }
        let img = RgbaImage::from_raw(self.width, self.height, frame.to_vec()).ok_or_else(size_mismatch)?;

        match self.file_type {
            ScreenshotFileType::Bmp => img
                .save_with_format(&path, ImageFormat::Bmp)
                .map_err(|source| WriteError::Encode { path: path.clone(), source })?,
            ScreenshotFileType::Png => img
                .save_with_format(&path, ImageFormat::Png)
                .map_err(|source| WriteError::Encode { path: path.clone(), source })?,
            ScreenshotFileType::Jpeg => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgba8(img).to_rgb8();
                let file = File::create(&path)
                    .map_err(|source| WriteError::Io { path: path.clone(), source })?;
                let mut writer = BufWriter::new(file);
                JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)
                    .encode_image(&rgb)
                    .map_err(|source| WriteError::Encode { path: path.clone(), source })?;
            }
        }
        Ok(path)
    }

    /// Writes every frame in order, numbering from 0.
    ///
    /// A failed frame is logged and skipped. Returns the number written.
    pub fn save_all(&self, destination: &Path, frames: &[Vec<u8>]) -> usize {
        let mut written = 0;
        for (index, frame) in frames.iter().enumerate() {
            match self.save_shot_to_file(destination, frame, index) {
                Ok(path) => {
                    written += 1;
                    debug!(
                        "Successfully wrote screenshot of dimensions {}x{} to {}",
                        self.width,
                        self.height,
                        path.display()
                    );
                }
                Err(e) => warn!(
                    "Failed to write screenshot of dimensions {}x{}: {}",
                    self.width, self.height, e
                ),
            }
        }
        written
    }
}

/// Returns the folder name for a session started at `started_at`.
pub fn destination_folder_name(started_at: &DateTime<Local>) -> String {
    started_at.format(FOLDER_TIMESTAMP_FORMAT).to_string()
}

/// Creates `<root>/<timestamp>` and returns it.
///
/// Creation failure is logged, not returned: the individual writes into the
/// missing folder will fail and be logged in turn.
pub fn create_destination_directory(root: &Path, started_at: &DateTime<Local>) -> PathBuf {
    let folder = root.join(destination_folder_name(started_at));
    if let Err(e) = fs::create_dir_all(&folder) {
        warn!("Failed to create screenshot folder {}: {}", folder.display(), e);
    }
    folder
}
