//! Screen capture module for TinyCapture
//!
//! Resolves virtual-screen geometry and copies display pixels into owned
//! bitmap surfaces.

pub mod events;
pub mod frame;
pub mod geometry;
pub mod grabber;
pub mod memory;

#[cfg(windows)]
pub mod gdi;

pub use events::{CaptureEvent, ChannelSink, EventSink, TracingSink};
pub use frame::{BitmapSurface, FrameData, HeapPixels, SurfaceStorage};
pub use geometry::{DisplayGeometry, WindowHandle};
pub use grabber::FrameGrabber;
pub use memory::{MemoryDisplay, MemoryWindow};

#[cfg(windows)]
pub use gdi::GdiDisplay;

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Invalid capture region: {width}x{height}")]
    InvalidRegion { width: i32, height: i32 },

    #[error("No foreground window to capture")]
    NoForegroundWindow,

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Screen capture is not supported on this platform")]
    Unsupported,
}

#[cfg(windows)]
impl From<windows::core::Error> for CaptureError {
    fn from(err: windows::core::Error) -> Self {
        CaptureError::CaptureFailed(err.to_string())
    }
}

pub type CaptureResult<T> = Result<T, CaptureError>;

/// Rectangle in virtual-screen pixels.
///
/// Edges are exclusive on the right and bottom. A rectangle with zero or
/// negative area is the "no selection" sentinel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const EMPTY: Rect = Rect::new(0, 0, 0, 0);

    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn from_origin_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x.saturating_add(width), y.saturating_add(height))
    }

    /// Rectangle spanned by two corner points, in any order
    pub fn from_points(a: (i32, i32), b: (i32, i32)) -> Self {
        Self::new(a.0.min(b.0), a.1.min(b.1), a.0.max(b.0), a.1.max(b.1))
    }

    /// Saturates instead of overflowing for edges far apart
    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn normalized(&self) -> Self {
        Self::from_points((self.left, self.top), (self.right, self.bottom))
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(
            self.left.saturating_add(dx),
            self.top.saturating_add(dy),
            self.right.saturating_add(dx),
            self.bottom.saturating_add(dy),
        )
    }

    pub fn inflate(&self, dx: i32, dy: i32) -> Self {
        Self::new(
            self.left.saturating_sub(dx),
            self.top.saturating_sub(dy),
            self.right.saturating_add(dx),
            self.bottom.saturating_add(dy),
        )
    }

    /// Smallest rectangle covering both. Degenerate inputs are ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        match (self.is_degenerate(), other.is_degenerate()) {
            (true, true) => Rect::EMPTY,
            (true, false) => *other,
            (false, true) => *self,
            (false, false) => Rect::new(
                self.left.min(other.left),
                self.top.min(other.top),
                self.right.max(other.right),
                self.bottom.max(other.bottom),
            ),
        }
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let rect = Rect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        (!rect.is_degenerate()).then_some(rect)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} at ({}, {})",
            self.width(),
            self.height(),
            self.left,
            self.top
        )
    }
}
