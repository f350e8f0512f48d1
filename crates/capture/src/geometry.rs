//! Virtual-screen and window geometry

use crate::{CaptureResult, Rect};

/// Opaque native window identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

pub trait DisplayGeometry: Send + Sync {
    /// Union of all monitors. Falls back to the primary monitor when the
    /// multi-monitor metrics are unavailable.
    fn virtual_screen_bounds(&self) -> Rect;

    /// Window that currently has the user's focus
    fn foreground_window(&self) -> Option<WindowHandle>;

    /// On-screen extent of `window`, without compositor shadow padding.
    ///
    /// Fails with `NoForegroundWindow` when `window` is `None`.
    fn visual_bounds_of(&self, window: Option<WindowHandle>) -> CaptureResult<Rect>;
}

/// Pick the compositor's extended frame over the raw window rect.
///
/// The raw rect includes the invisible resize border and drop shadow, so
/// it over-captures on composited desktops.
pub fn prefer_extended_frame(raw: Rect, extended: Option<Rect>) -> Rect {
    match extended {
        Some(frame) if !frame.is_degenerate() => frame,
        _ => raw,
    }
}

/// Virtual-screen rect from raw metrics, falling back to the primary
/// monitor when the virtual size is unknown.
pub fn virtual_or_primary(
    virtual_origin: (i32, i32),
    virtual_size: (i32, i32),
    primary_size: (i32, i32),
) -> Rect {
    if virtual_size.0 > 0 && virtual_size.1 > 0 {
        Rect::from_origin_size(virtual_origin.0, virtual_origin.1, virtual_size.0, virtual_size.1)
    } else {
        Rect::from_origin_size(0, 0, primary_size.0, primary_size.1)
    }
}
