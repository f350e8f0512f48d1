//! Export module for TinyCapture
//!
//! Persists captured surfaces as PNG files on background workers.

mod png;
mod save;

pub use png::{encode_png, encode_surface, swap_red_blue};
pub use save::{CapturePersistence, SaveTask};

use capture::CaptureError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreateFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("PNG encoding error: {0}")]
    EncodeFailed(#[from] image::ImageError),

    #[error("Failed to write {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Bitmap readback failed: {0}")]
    Readback(#[from] CaptureError),

    #[error("Pixel buffer is {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("Failed to start save worker: {0}")]
    WorkerSpawn(std::io::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Folder created under the pictures directory
pub const SAVE_FOLDER: &str = "ScreenCapture";

/// Save configuration
#[derive(Debug, Clone)]
pub struct SaveConfig {
    pub directory: PathBuf,
    /// Background encode/write threads
    pub workers: usize,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            directory: default_save_directory(),
            workers: 2,
        }
    }
}

/// `<Pictures>/ScreenCapture`, falling back to the home directory and then
/// the working directory when there is no pictures folder.
pub fn default_save_directory() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(SAVE_FOLDER)
}
