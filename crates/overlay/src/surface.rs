//! Overlay surface and input abstraction
//!
//! The selector only sees these traits, so any event-delivery mechanism
//! (native message pump, channel, scripted queue) can drive it.

use crate::render::Frame;
use crate::OverlayResult;
use capture::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other(u32),
}

/// Input delivered to the overlay. Coordinates are surface-local.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayEvent {
    /// Primary button pressed
    PointerDown { x: i32, y: i32 },
    PointerMove { x: i32, y: i32 },
    /// Primary button released
    PointerUp { x: i32, y: i32 },
    KeyDown(Key),
    /// Part of the surface needs repainting (`None` = all of it)
    Paint(Option<Rect>),
    /// Surface was closed from outside
    Closed,
}

/// Topmost surface spanning the virtual screen.
///
/// Dropping the surface removes it from the screen.
pub trait OverlaySurface {
    fn set_opacity(&mut self, alpha: u8) -> OverlayResult<()>;

    fn show(&mut self) -> OverlayResult<()>;

    /// Copy `region` (surface-local) of the frame's canvas to the visible
    /// surface, then draw the frame's label text if it falls inside
    fn present(&mut self, frame: &Frame<'_>, region: Rect) -> OverlayResult<()>;

    /// Ask for a `Paint` covering `region` once pending input is drained
    fn request_paint(&mut self, region: Rect);

    /// Keep receiving pointer events even outside the surface
    fn capture_pointer(&mut self);

    fn release_pointer(&mut self);

    /// Block until the next input event. `None` once the source is gone.
    fn next_event(&mut self) -> Option<OverlayEvent>;
}

pub trait OverlayPlatform {
    type Surface: OverlaySurface;

    /// Create a hidden surface covering `bounds` (virtual-screen coordinates)
    fn create_surface(&self, bounds: Rect) -> OverlayResult<Self::Surface>;
}
