//! Persisting captured frames.
//!
//! This module provides:
//! - Per-frame encoding to BMP, JPEG or PNG (`ImageWriter`)
//! - Timestamped destination folders (`create_destination_directory`)

pub mod writer;

pub use writer::{
    create_destination_directory, destination_folder_name, ImageWriter, ScreenshotFileType,
    WriteError, JPEG_QUALITY,
};
