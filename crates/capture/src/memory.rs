//! In-memory display backend
//!
//! A synthetic virtual screen with its own pixels and window table. Used
//! on hosts without a native backend and throughout the test suites.

use crate::frame::byte_len;
use crate::geometry::{prefer_extended_frame, DisplayGeometry, WindowHandle};
use crate::grabber::FrameGrabber;
use crate::{BitmapSurface, CaptureError, CaptureResult, FrameData, Rect};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Window known to a [`MemoryDisplay`]
#[derive(Debug, Clone)]
pub struct MemoryWindow {
    pub handle: WindowHandle,
    /// Raw window rect, including shadow padding
    pub raw: Rect,
    /// Compositor frame bounds, if the compositor reports them
    pub extended: Option<Rect>,
}

pub struct MemoryDisplay {
    bounds: Rect,
    screen: FrameData,
    windows: Vec<MemoryWindow>,
    foreground: Option<WindowHandle>,
    copies: AtomicUsize,
    fail_copies: AtomicBool,
}

impl MemoryDisplay {
    /// Display covering `bounds`, filled with a position-derived pattern
    pub fn new(bounds: Rect) -> Self {
        let width = bounds.width().max(0) as u32;
        let height = bounds.height().max(0) as u32;
        let mut data = Vec::with_capacity(byte_len(width, height));
        for y in bounds.top..bounds.bottom {
            for x in bounds.left..bounds.right {
                data.extend_from_slice(&Self::pattern(x, y));
            }
        }
        Self::from_frame(bounds, FrameData::new(width, height, data))
    }

    /// Display covering `bounds` with caller-supplied BGRA pixels
    pub fn with_pixels(bounds: Rect, data: Vec<u8>) -> CaptureResult<Self> {
        let width = bounds.width().max(0) as u32;
        let height = bounds.height().max(0) as u32;
        if data.len() != byte_len(width, height) {
            return Err(CaptureError::CaptureFailed(format!(
                "{} bytes do not cover a {} display",
                data.len(),
                bounds
            )));
        }
        Ok(Self::from_frame(bounds, FrameData::new(width, height, data)))
    }

    fn from_frame(bounds: Rect, screen: FrameData) -> Self {
        Self {
            bounds,
            screen,
            windows: Vec::new(),
            foreground: None,
            copies: AtomicUsize::new(0),
            fail_copies: AtomicBool::new(false),
        }
    }

    /// BGRA value the default pattern puts at a virtual-screen point
    pub fn pattern(x: i32, y: i32) -> [u8; 4] {
        [x as u8, y as u8, (x ^ y) as u8, 0xFF]
    }

    pub fn with_window(mut self, window: MemoryWindow) -> Self {
        self.windows.push(window);
        self
    }

    pub fn with_foreground(mut self, handle: WindowHandle) -> Self {
        self.foreground = Some(handle);
        self
    }

    /// Make subsequent device copies fail, as a lost DC would
    pub fn fail_copies(&self, fail: bool) {
        self.fail_copies.store(fail, Ordering::SeqCst);
    }

    /// Number of device copies attempted so far
    pub fn copy_count(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }

    /// BGRA value at a virtual-screen point
    pub fn pixel_at(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        if !self.bounds.contains(x, y) {
            return None;
        }
        self.screen
            .pixel((x - self.bounds.left) as u32, (y - self.bounds.top) as u32)
    }
}

impl DisplayGeometry for MemoryDisplay {
    fn virtual_screen_bounds(&self) -> Rect {
        self.bounds
    }

    fn foreground_window(&self) -> Option<WindowHandle> {
        self.foreground
    }

    fn visual_bounds_of(&self, window: Option<WindowHandle>) -> CaptureResult<Rect> {
        let handle = window.ok_or(CaptureError::NoForegroundWindow)?;
        let window = self
            .windows
            .iter()
            .find(|w| w.handle == handle)
            .ok_or_else(|| CaptureError::CaptureFailed(format!("unknown window {:?}", handle)))?;
        Ok(prefer_extended_frame(window.raw, window.extended))
    }
}

impl FrameGrabber for MemoryDisplay {
    fn copy_region(&self, rect: Rect) -> CaptureResult<BitmapSurface> {
        self.copies.fetch_add(1, Ordering::SeqCst);
        if self.fail_copies.load(Ordering::SeqCst) {
            return Err(CaptureError::CaptureFailed("device copy failed".into()));
        }

        let local = rect.offset(-self.bounds.left, -self.bounds.top);
        let data = self.screen.copy_region(&local);
        BitmapSurface::from_bgra(rect.width() as u32, rect.height() as u32, data)
    }
}
