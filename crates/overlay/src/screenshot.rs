//! Virtual desktop snapshot

use crate::render::Canvas;
use crate::{OverlayError, OverlayResult};
use capture::{DisplayGeometry, FrameGrabber, Rect};

/// Screenshot data
pub struct Screenshot {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub virtual_left: i32,
    pub virtual_top: i32,
}

impl Screenshot {
    /// Capture the entire virtual desktop
    pub fn capture_virtual_desktop(
        geometry: &dyn DisplayGeometry,
        grabber: &dyn FrameGrabber,
    ) -> OverlayResult<Self> {
        Self::capture(grabber, geometry.virtual_screen_bounds())
    }

    /// Capture `bounds`; the result's local origin is `bounds`' top-left
    pub fn capture(grabber: &dyn FrameGrabber, bounds: Rect) -> OverlayResult<Self> {
        let surface = grabber.capture(bounds)?;
        let frame = surface.to_frame()?;

        Ok(Screenshot {
            data: frame.data,
            width: frame.width,
            height: frame.height,
            virtual_left: bounds.left,
            virtual_top: bounds.top,
        })
    }

    /// Convert screen coordinates to screenshot coordinates
    pub fn screen_to_local(&self, x: i32, y: i32) -> (i32, i32) {
        (x - self.virtual_left, y - self.virtual_top)
    }

    /// Convert screenshot coordinates to screen coordinates
    pub fn local_to_screen(&self, x: i32, y: i32) -> (i32, i32) {
        (x + self.virtual_left, y + self.virtual_top)
    }

    pub fn into_canvas(self) -> OverlayResult<Canvas> {
        let (width, height) = (self.width, self.height);
        Canvas::from_bgra(width, height, self.data)
            .ok_or_else(|| OverlayError::Surface(format!("snapshot does not fill {}x{}", width, height)))
    }
}
