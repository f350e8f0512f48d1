//! GDI display backend

use crate::geometry::{prefer_extended_frame, virtual_or_primary, DisplayGeometry, WindowHandle};
use crate::grabber::FrameGrabber;
use crate::{BitmapSurface, CaptureError, CaptureResult, Rect, SurfaceStorage};
use windows::Win32::Foundation::{HWND, RECT};
use windows::Win32::Graphics::Dwm::{DwmGetWindowAttribute, DWMWA_EXTENDED_FRAME_BOUNDS};
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleDC, CreateDIBSection, DeleteDC, DeleteObject, GetDC, GetDIBits,
    ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, CAPTUREBLT, DIB_RGB_COLORS,
    HBITMAP, ROP_CODE, SRCCOPY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetForegroundWindow, GetSystemMetrics, GetWindowRect, SM_CXSCREEN, SM_CXVIRTUALSCREEN,
    SM_CYSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN, SM_YVIRTUALSCREEN,
};

/// Top-down 32bpp DIB header
pub fn dib_header(width: i32, height: i32) -> BITMAPINFO {
    BITMAPINFO {
        bmiHeader: BITMAPINFOHEADER {
            biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: width,
            biHeight: -height, // Top-down DIB
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            biSizeImage: 0,
            biXPelsPerMeter: 0,
            biYPelsPerMeter: 0,
            biClrUsed: 0,
            biClrImportant: 0,
        },
        bmiColors: [Default::default()],
    }
}

/// DIB section owned by a [`BitmapSurface`]
struct DibSection {
    // Stored raw so the storage can cross to the save thread
    bitmap: isize,
}

impl DibSection {
    fn handle(&self) -> HBITMAP {
        HBITMAP(self.bitmap as *mut std::ffi::c_void)
    }
}

impl SurfaceStorage for DibSection {
    fn read_pixels(&self, width: u32, height: u32, out: &mut [u8]) -> CaptureResult<()> {
        unsafe {
            let screen_dc = GetDC(None);
            if screen_dc.is_invalid() {
                return Err(CaptureError::CaptureFailed("Failed to get screen DC".into()));
            }

            let mut bmi = dib_header(width as i32, height as i32);
            let lines = GetDIBits(
                screen_dc,
                self.handle(),
                0,
                height,
                Some(out.as_mut_ptr() as *mut _),
                &mut bmi,
                DIB_RGB_COLORS,
            );
            ReleaseDC(None, screen_dc);

            if lines != height as i32 {
                return Err(CaptureError::CaptureFailed(format!(
                    "GetDIBits copied {} of {} rows",
                    lines, height
                )));
            }
        }
        Ok(())
    }
}

impl Drop for DibSection {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteObject(self.handle());
        }
    }
}

/// Live display via GDI
#[derive(Debug, Default, Clone, Copy)]
pub struct GdiDisplay;

impl GdiDisplay {
    pub fn new() -> Self {
        Self
    }
}

impl DisplayGeometry for GdiDisplay {
    fn virtual_screen_bounds(&self) -> Rect {
        unsafe {
            virtual_or_primary(
                (GetSystemMetrics(SM_XVIRTUALSCREEN), GetSystemMetrics(SM_YVIRTUALSCREEN)),
                (GetSystemMetrics(SM_CXVIRTUALSCREEN), GetSystemMetrics(SM_CYVIRTUALSCREEN)),
                (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)),
            )
        }
    }

    fn foreground_window(&self) -> Option<WindowHandle> {
        let hwnd = unsafe { GetForegroundWindow() };
        (!hwnd.is_invalid()).then(|| WindowHandle(hwnd.0 as isize))
    }

    fn visual_bounds_of(&self, window: Option<WindowHandle>) -> CaptureResult<Rect> {
        let handle = window.ok_or(CaptureError::NoForegroundWindow)?;
        let hwnd = HWND(handle.0 as *mut std::ffi::c_void);

        unsafe {
            let mut raw = RECT::default();
            GetWindowRect(hwnd, &mut raw)?;

            let mut frame = RECT::default();
            let extended = DwmGetWindowAttribute(
                hwnd,
                DWMWA_EXTENDED_FRAME_BOUNDS,
                &mut frame as *mut _ as *mut _,
                std::mem::size_of::<RECT>() as u32,
            )
            .ok()
            .map(|_| Rect::new(frame.left, frame.top, frame.right, frame.bottom));

            Ok(prefer_extended_frame(
                Rect::new(raw.left, raw.top, raw.right, raw.bottom),
                extended,
            ))
        }
    }
}

impl FrameGrabber for GdiDisplay {
    fn copy_region(&self, rect: Rect) -> CaptureResult<BitmapSurface> {
        let (width, height) = (rect.width(), rect.height());

        unsafe {
            let screen_dc = GetDC(None);
            if screen_dc.is_invalid() {
                return Err(CaptureError::CaptureFailed("Failed to get screen DC".into()));
            }

            let mem_dc = CreateCompatibleDC(screen_dc);
            if mem_dc.is_invalid() {
                ReleaseDC(None, screen_dc);
                return Err(CaptureError::CaptureFailed("CreateCompatibleDC failed".into()));
            }

            let bmi = dib_header(width, height);
            let mut bits = std::ptr::null_mut();
            let bitmap = match CreateDIBSection(screen_dc, &bmi, DIB_RGB_COLORS, &mut bits, None, 0)
            {
                Ok(bitmap) => bitmap,
                Err(e) => {
                    let _ = DeleteDC(mem_dc);
                    ReleaseDC(None, screen_dc);
                    return Err(e.into());
                }
            };
            // Owned from here on; any early return releases it
            let section = DibSection {
                bitmap: bitmap.0 as isize,
            };

            let old_bitmap = SelectObject(mem_dc, bitmap);

            // CAPTUREBLT pulls in layered (translucent) windows as well
            let blit = BitBlt(
                mem_dc,
                0,
                0,
                width,
                height,
                screen_dc,
                rect.left,
                rect.top,
                ROP_CODE(SRCCOPY.0 | CAPTUREBLT.0),
            );

            SelectObject(mem_dc, old_bitmap);
            let _ = DeleteDC(mem_dc);
            ReleaseDC(None, screen_dc);

            blit?;

            Ok(BitmapSurface::new(
                width as u32,
                height as u32,
                Box::new(section),
            ))
        }
    }
}
