//! Overlay module for TinyCapture
//!
//! Provides the frozen-screenshot overlay used for interactive region
//! selection.

pub mod render;
pub mod screenshot;
pub mod scripted;
pub mod selection;
pub mod surface;

#[cfg(windows)]
pub mod window;

pub use render::{Canvas, Color, CompositeBuffers, Frame, OverlayRenderer, SizeLabel};
pub use screenshot::Screenshot;
pub use scripted::{ManualClock, ScriptStep, ScriptedPlatform, SurfaceLog};
pub use selection::{Clock, MonotonicClock, RedrawThrottle, RegionSelector, SelectorState};
pub use surface::{Key, OverlayEvent, OverlayPlatform, OverlaySurface};

#[cfg(windows)]
pub use window::OverlayWindow;

use capture::{CaptureError, Rect};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("Screenshot failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("Overlay surface error: {0}")]
    Surface(String),
}

#[cfg(windows)]
impl From<windows::core::Error> for OverlayError {
    fn from(err: windows::core::Error) -> Self {
        OverlayError::Surface(format!("Windows API error: {}", err))
    }
}

pub type OverlayResult<T> = Result<T, OverlayError>;

/// Selection outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// User selected a region (virtual-screen coordinates)
    Region(Rect),
    /// User cancelled, or the overlay could not be shown
    Cancelled,
}

/// Overlay appearance and pacing
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Strength of the black wash over the frozen desktop, 0-255. Low
    /// enough that the desktop stays legible.
    pub dim_alpha: u8,
    /// Minimum time between drag redraws
    pub redraw_interval: Duration,
    pub border_width: i32,
    pub border_color: Color,
    pub label_color: Color,
    pub label_background: Color,
    /// Selection top edge needed before the size label is drawn above it
    pub label_clearance: i32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            dim_alpha: 128,
            redraw_interval: Duration::from_millis(8),
            border_width: 2,
            border_color: Color::rgb(0, 120, 215),
            label_color: Color::rgb(255, 255, 0),
            label_background: Color::rgba(0, 0, 0, 160),
            label_clearance: 30,
        }
    }
}
