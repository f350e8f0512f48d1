//! Bitmap surfaces and owned frame copies

use crate::{CaptureError, CaptureResult, Rect};
use image::{ImageBuffer, RgbaImage};
use std::fmt;
use std::time::Instant;

/// Bytes per 32-bit pixel
pub const BYTES_PER_PIXEL: usize = 4;

/// Pixel store behind a [`BitmapSurface`].
///
/// Implementations release their backing resource in `Drop`.
pub trait SurfaceStorage: Send {
    /// Copy the whole surface into `out` as top-down BGRA rows
    fn read_pixels(&self, width: u32, height: u32, out: &mut [u8]) -> CaptureResult<()>;
}

/// Heap-backed pixel store
pub struct HeapPixels(pub Vec<u8>);

impl SurfaceStorage for HeapPixels {
    fn read_pixels(&self, _width: u32, _height: u32, out: &mut [u8]) -> CaptureResult<()> {
        if out.len() != self.0.len() {
            return Err(CaptureError::CaptureFailed(format!(
                "pixel buffer is {} bytes, expected {}",
                self.0.len(),
                out.len()
            )));
        }
        out.copy_from_slice(&self.0);
        Ok(())
    }
}

/// Owned 32bpp top-down surface produced by a frame grabber.
///
/// Not `Clone`: whoever holds the value owns the pixels, and dropping it
/// releases the backing store exactly once. Borrowers that need to keep the
/// pixels take a copy with [`BitmapSurface::to_frame`].
pub struct BitmapSurface {
    width: u32,
    height: u32,
    storage: Box<dyn SurfaceStorage>,
}

impl BitmapSurface {
    pub fn new(width: u32, height: u32, storage: Box<dyn SurfaceStorage>) -> Self {
        Self { width, height, storage }
    }

    /// Wrap an existing BGRA buffer
    pub fn from_bgra(width: u32, height: u32, data: Vec<u8>) -> CaptureResult<Self> {
        let expected = byte_len(width, height);
        if data.len() != expected {
            return Err(CaptureError::CaptureFailed(format!(
                "{}x{} surface needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self::new(width, height, Box::new(HeapPixels(data))))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn byte_len(&self) -> usize {
        byte_len(self.width, self.height)
    }

    /// Read the surface back into a contiguous BGRA buffer
    pub fn read_pixels(&self) -> CaptureResult<Vec<u8>> {
        let mut data = vec![0u8; self.byte_len()];
        self.storage.read_pixels(self.width, self.height, &mut data)?;
        Ok(data)
    }

    /// Independently owned copy of the pixels
    pub fn to_frame(&self) -> CaptureResult<FrameData> {
        Ok(FrameData {
            data: self.read_pixels()?,
            width: self.width,
            height: self.height,
            timestamp: Instant::now(),
        })
    }
}

impl fmt::Debug for BitmapSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitmapSurface")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Drop for BitmapSurface {
    fn drop(&mut self) {
        tracing::trace!(width = self.width, height = self.height, "releasing bitmap surface");
    }
}

pub(crate) fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * BYTES_PER_PIXEL
}

/// Owned BGRA pixels copied out of a surface
#[derive(Debug, Clone)]
pub struct FrameData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

impl FrameData {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            data,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    /// BGRA value at a frame-local pixel
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let px = self.data.get(offset..offset + BYTES_PER_PIXEL)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Convert BGRA data to RGBA image
    pub fn to_rgba_image(&self) -> CaptureResult<RgbaImage> {
        let mut rgba_data = self.data.clone();

        // Convert BGRA to RGBA
        for chunk in rgba_data.chunks_exact_mut(4) {
            chunk.swap(0, 2);
        }

        ImageBuffer::from_raw(self.width, self.height, rgba_data).ok_or_else(|| {
            CaptureError::CaptureFailed(format!(
                "frame data does not fill {}x{}",
                self.width, self.height
            ))
        })
    }

    /// Copy a frame-local rectangle. Pixels outside the frame read as zero.
    pub fn copy_region(&self, rect: &Rect) -> Vec<u8> {
        let width = rect.width().max(0) as usize;
        let height = rect.height().max(0) as usize;
        let mut out = vec![0u8; width * height * BYTES_PER_PIXEL];

        let bounds = Rect::new(0, 0, self.width as i32, self.height as i32);
        let Some(visible) = rect.intersection(&bounds) else {
            return out;
        };

        let row_bytes = visible.width() as usize * BYTES_PER_PIXEL;
        for y in visible.top..visible.bottom {
            let src = (y as usize * self.width as usize + visible.left as usize) * BYTES_PER_PIXEL;
            let dst = ((y - rect.top) as usize * width + (visible.left - rect.left) as usize)
                * BYTES_PER_PIXEL;
            out[dst..dst + row_bytes].copy_from_slice(&self.data[src..src + row_bytes]);
        }

        out
    }
}
