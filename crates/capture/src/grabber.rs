//! Display pixel acquisition

use crate::{BitmapSurface, CaptureError, CaptureResult, Rect};
use std::sync::Arc;
use std::time::Instant;

/// Copies display pixels into owned surfaces.
///
/// Callers use [`FrameGrabber::capture`]; backends implement
/// [`FrameGrabber::copy_region`], which is only reached with a valid rect.
pub trait FrameGrabber: Send + Sync {
    /// Device copy of `rect` (virtual-screen coordinates, positive size)
    fn copy_region(&self, rect: Rect) -> CaptureResult<BitmapSurface>;

    fn capture(&self, rect: Rect) -> CaptureResult<BitmapSurface> {
        validate_region(&rect)?;

        let started = Instant::now();
        let surface = self.copy_region(rect)?;

        if surface.dimensions() != (rect.width() as u32, rect.height() as u32) {
            return Err(CaptureError::CaptureFailed(format!(
                "backend returned {}x{} for a {} request",
                surface.width(),
                surface.height(),
                rect
            )));
        }

        tracing::debug!(%rect, elapsed_us = started.elapsed().as_micros() as u64, "copied region");
        Ok(surface)
    }
}

impl<T: FrameGrabber + ?Sized> FrameGrabber for Arc<T> {
    fn copy_region(&self, rect: Rect) -> CaptureResult<BitmapSurface> {
        (**self).copy_region(rect)
    }

    fn capture(&self, rect: Rect) -> CaptureResult<BitmapSurface> {
        (**self).capture(rect)
    }
}

/// Reject rects with non-positive width or height, or with edges too far
/// apart for their extent to fit in an `i32`
pub fn validate_region(rect: &Rect) -> CaptureResult<()> {
    let overflows = rect.right.checked_sub(rect.left).is_none()
        || rect.bottom.checked_sub(rect.top).is_none();
    if overflows || rect.width() <= 0 || rect.height() <= 0 {
        return Err(CaptureError::InvalidRegion {
            width: rect.width(),
            height: rect.height(),
        });
    }
    Ok(())
}
