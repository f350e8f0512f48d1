//! Hand-off of finished captures to a consumer such as a preview window

use capture::{BitmapSurface, FrameData};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Receives every successful capture before it is queued for saving.
///
/// The bitmap is only borrowed for the duration of the call; anything kept
/// must be copied out with [`BitmapSurface::to_frame`].
pub trait ResultHandoff: Send + Sync {
    fn on_capture(&self, bitmap: &BitmapSurface, destination: &Path);
}

/// Keeps a copy of the most recent capture
#[derive(Default)]
pub struct FrameRecorder {
    last: Mutex<Option<(FrameData, PathBuf)>>,
    count: AtomicUsize,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<FrameData> {
        self.last.lock().as_ref().map(|(frame, _)| frame.clone())
    }

    pub fn last_destination(&self) -> Option<PathBuf> {
        self.last.lock().as_ref().map(|(_, path)| path.clone())
    }

    /// Captures handed off so far
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl ResultHandoff for FrameRecorder {
    fn on_capture(&self, bitmap: &BitmapSurface, destination: &Path) {
        self.count.fetch_add(1, Ordering::SeqCst);
        match bitmap.to_frame() {
            Ok(frame) => *self.last.lock() = Some((frame, destination.to_path_buf())),
            Err(err) => tracing::warn!(%err, "could not copy capture for preview"),
        }
    }
}
