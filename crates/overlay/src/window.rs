//! Win32 overlay window
//!
//! A layered, topmost popup covering the virtual screen. The window
//! procedure only translates messages into [`OverlayEvent`]s and queues
//! them per window; the selector pulls them through `next_event`.

use crate::render::{Color, Frame, SizeLabel};
use crate::surface::{Key, OverlayEvent, OverlayPlatform, OverlaySurface};
use crate::{OverlayError, OverlayResult};
use capture::gdi::dib_header;
use capture::Rect;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Once;
use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::{BOOL, COLORREF, HINSTANCE, HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, EndPaint, GetDC, GetStockObject, InvalidateRect, ReleaseDC, SelectObject, SetBkMode,
    SetDIBitsToDevice, SetTextColor, TextOutW, UpdateWindow, DEFAULT_GUI_FONT, DIB_RGB_COLORS,
    HDC, PAINTSTRUCT, TRANSPARENT,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Input::KeyboardAndMouse::{ReleaseCapture, SetCapture, VK_ESCAPE};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW, LoadCursorW,
    RegisterClassExW, SetForegroundWindow, SetLayeredWindowAttributes, ShowWindow,
    TranslateMessage, IDC_CROSS, LWA_ALPHA, MSG, SW_SHOW, WM_CLOSE, WM_DESTROY, WM_ERASEBKGND,
    WM_KEYDOWN, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MOUSEMOVE, WM_PAINT, WNDCLASSEXW,
    WS_EX_LAYERED, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP,
};

const OVERLAY_CLASS: PCWSTR = w!("TinyCaptureOverlay");

static REGISTER: Once = Once::new();

/// Pending events per live overlay window
static SESSIONS: Lazy<Mutex<HashMap<isize, VecDeque<OverlayEvent>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn register_class() -> OverlayResult<()> {
    let mut result: OverlayResult<()> = Ok(());
    REGISTER.call_once(|| unsafe {
        let hmodule = match GetModuleHandleW(None) {
            Ok(h) => h,
            Err(e) => {
                result = Err(e.into());
                return;
            }
        };
        let cursor = match LoadCursorW(None, IDC_CROSS) {
            Ok(c) => c,
            Err(e) => {
                result = Err(e.into());
                return;
            }
        };
        let wc = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            lpfnWndProc: Some(overlay_wnd_proc),
            hInstance: HINSTANCE(hmodule.0),
            hCursor: cursor,
            lpszClassName: OVERLAY_CLASS,
            ..Default::default()
        };

        let _ = RegisterClassExW(&wc);
    });

    result
}

fn key_of(hwnd: HWND) -> isize {
    hwnd.0 as isize
}

fn push_event(hwnd: HWND, event: OverlayEvent) {
    if let Some(queue) = SESSIONS.lock().get_mut(&key_of(hwnd)) {
        queue.push_back(event);
    }
}

fn pop_event(hwnd: HWND) -> Option<OverlayEvent> {
    SESSIONS.lock().get_mut(&key_of(hwnd))?.pop_front()
}

fn colorref(color: Color) -> COLORREF {
    COLORREF(color.r as u32 | (color.g as u32) << 8 | (color.b as u32) << 16)
}

/// Text goes straight to the window; its background is already in the
/// presented pixels
unsafe fn draw_label(hdc: HDC, label: &SizeLabel) {
    let text: Vec<u16> = label.text.encode_utf16().collect();
    let (x, y) = label.text_origin();

    let old_font = SelectObject(hdc, GetStockObject(DEFAULT_GUI_FONT));
    SetBkMode(hdc, TRANSPARENT);
    SetTextColor(hdc, colorref(label.color));
    let _ = TextOutW(hdc, x, y, &text);
    SelectObject(hdc, old_font);
}

fn point_of(lparam: LPARAM) -> (i32, i32) {
    // Signed: captured drags report negative coordinates
    let x = (lparam.0 & 0xFFFF) as i16 as i32;
    let y = ((lparam.0 >> 16) & 0xFFFF) as i16 as i32;
    (x, y)
}

unsafe extern "system" fn overlay_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_LBUTTONDOWN => {
            let (x, y) = point_of(lparam);
            push_event(hwnd, OverlayEvent::PointerDown { x, y });
            LRESULT(0)
        }

        WM_MOUSEMOVE => {
            let (x, y) = point_of(lparam);
            push_event(hwnd, OverlayEvent::PointerMove { x, y });
            LRESULT(0)
        }

        WM_LBUTTONUP => {
            let (x, y) = point_of(lparam);
            push_event(hwnd, OverlayEvent::PointerUp { x, y });
            LRESULT(0)
        }

        WM_KEYDOWN => {
            let code = wparam.0 as u32;
            let key = if code == VK_ESCAPE.0 as u32 {
                Key::Escape
            } else {
                Key::Other(code)
            };
            push_event(hwnd, OverlayEvent::KeyDown(key));
            LRESULT(0)
        }

        WM_PAINT => {
            let mut ps = PAINTSTRUCT::default();
            BeginPaint(hwnd, &mut ps);
            let damage = ps.rcPaint;
            let _ = EndPaint(hwnd, &ps);
            push_event(
                hwnd,
                OverlayEvent::Paint(Some(Rect::new(
                    damage.left,
                    damage.top,
                    damage.right,
                    damage.bottom,
                ))),
            );
            LRESULT(0)
        }

        // Everything is painted from the backbuffer
        WM_ERASEBKGND => LRESULT(1),

        WM_CLOSE | WM_DESTROY => {
            push_event(hwnd, OverlayEvent::Closed);
            LRESULT(0)
        }

        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

/// Creates native overlay windows
#[derive(Debug, Default, Clone, Copy)]
pub struct OverlayWindow;

impl OverlayPlatform for OverlayWindow {
    type Surface = NativeSurface;

    fn create_surface(&self, bounds: Rect) -> OverlayResult<NativeSurface> {
        register_class()?;

        unsafe {
            let hmodule = GetModuleHandleW(None)?;

            let hwnd = CreateWindowExW(
                WS_EX_LAYERED | WS_EX_TOPMOST | WS_EX_TOOLWINDOW,
                OVERLAY_CLASS,
                w!("TinyCapture Selection"),
                WS_POPUP,
                bounds.left,
                bounds.top,
                bounds.width(),
                bounds.height(),
                None,
                None,
                HINSTANCE(hmodule.0),
                None,
            )?;

            SESSIONS.lock().insert(key_of(hwnd), VecDeque::new());
            tracing::debug!(%bounds, "overlay window created");

            Ok(NativeSurface { hwnd })
        }
    }
}

pub struct NativeSurface {
    hwnd: HWND,
}

impl OverlaySurface for NativeSurface {
    fn set_opacity(&mut self, alpha: u8) -> OverlayResult<()> {
        unsafe { SetLayeredWindowAttributes(self.hwnd, COLORREF(0), alpha, LWA_ALPHA)? };
        Ok(())
    }

    fn show(&mut self) -> OverlayResult<()> {
        unsafe {
            let _ = ShowWindow(self.hwnd, SW_SHOW);
            let _ = SetForegroundWindow(self.hwnd);
            let _ = UpdateWindow(self.hwnd);
        }
        Ok(())
    }

    fn present(&mut self, frame: &Frame<'_>, region: Rect) -> OverlayResult<()> {
        let Some((clip, pixels)) = frame.canvas.region_bytes(region) else {
            return Ok(());
        };
        let header = dib_header(clip.width(), clip.height());

        unsafe {
            let hdc = GetDC(self.hwnd);
            if hdc.is_invalid() {
                return Err(OverlayError::Surface("GetDC failed".into()));
            }
            let lines = SetDIBitsToDevice(
                hdc,
                clip.left,
                clip.top,
                clip.width() as u32,
                clip.height() as u32,
                0,
                0,
                0,
                clip.height() as u32,
                pixels.as_ptr() as *const _,
                &header,
                DIB_RGB_COLORS,
            );
            if lines != 0 {
                if let Some(label) = frame.label.filter(|l| l.rect.intersection(&clip).is_some()) {
                    draw_label(hdc, label);
                }
            }
            ReleaseDC(self.hwnd, hdc);

            if lines == 0 {
                return Err(OverlayError::Surface(format!("SetDIBitsToDevice failed for {}", clip)));
            }
        }
        Ok(())
    }

    fn request_paint(&mut self, region: Rect) {
        let rect = RECT {
            left: region.left,
            top: region.top,
            right: region.right,
            bottom: region.bottom,
        };
        // WM_PAINT is only generated once the message queue is empty
        unsafe {
            let _ = InvalidateRect(self.hwnd, Some(&rect), BOOL(0));
        }
    }

    fn capture_pointer(&mut self) {
        unsafe {
            SetCapture(self.hwnd);
        }
    }

    fn release_pointer(&mut self) {
        unsafe {
            let _ = ReleaseCapture();
        }
    }

    fn next_event(&mut self) -> Option<OverlayEvent> {
        let mut msg = MSG::default();
        loop {
            if let Some(event) = pop_event(self.hwnd) {
                return Some(event);
            }

            unsafe {
                // 0 is WM_QUIT, -1 is an error
                if GetMessageW(&mut msg, None, 0, 0).0 <= 0 {
                    return None;
                }
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }
}

impl Drop for NativeSurface {
    fn drop(&mut self) {
        SESSIONS.lock().remove(&key_of(self.hwnd));
        unsafe {
            let _ = DestroyWindow(self.hwnd);
        }
        tracing::debug!("overlay window destroyed");
    }
}
