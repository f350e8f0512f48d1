//! Interactive region selection
//!
//! `RegionSelector::show` runs one blocking selection session:
//!
//! ```text
//! Idle -> AwaitingInput -> Dragging -> Completed
//!              |              |
//!              +--- Escape ---+-----> Cancelled
//! ```
//!
//! Everything runs on the calling thread; the session pulls events from
//! its surface until it reaches a terminal state.

use crate::render::OverlayRenderer;
use crate::screenshot::Screenshot;
use crate::surface::{Key, OverlayEvent, OverlayPlatform, OverlaySurface};
use crate::{OverlayConfig, OverlayResult, SelectionOutcome};
use capture::{CaptureEvent, DisplayGeometry, EventSink, FrameGrabber, Rect};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source for redraw pacing
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    Idle,
    AwaitingInput,
    Dragging,
    Completed,
    Cancelled,
}

impl SelectorState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SelectorState::Completed | SelectorState::Cancelled)
    }
}

/// Caps redraws to one per interval. Calls in between are dropped, so
/// only the latest pointer position ever gets drawn.
#[derive(Debug, Clone)]
pub struct RedrawThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl RedrawThrottle {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    /// Count `now` as a frame without asking
    pub fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }

    /// Whether a redraw may happen at `now`; records it if so
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Calculate selection rectangle from drag points.
///
/// Points are surface-local; `origin` is the surface's virtual-screen
/// position.
pub fn calc_selection_rect(anchor: (i32, i32), end: (i32, i32), origin: (i32, i32)) -> Rect {
    Rect::from_points(anchor, end).offset(origin.0, origin.1)
}

/// Check if selection is valid
pub fn is_valid_selection(rect: &Rect) -> bool {
    !rect.is_degenerate()
}

/// State of one overlay invocation. Owns the surface and both offscreen
/// buffers; dropping it tears all of them down.
struct SelectionSession<S: OverlaySurface> {
    surface: S,
    renderer: OverlayRenderer,
    state: SelectorState,
    anchor: (i32, i32),
    live: (i32, i32),
    origin: (i32, i32),
    throttle: RedrawThrottle,
    /// A throttled move has not been drawn yet
    pending: bool,
    result: Rect,
    redraws: u32,
}

impl<S: OverlaySurface> SelectionSession<S> {
    fn open<P>(
        platform: &P,
        bounds: Rect,
        grabber: &dyn FrameGrabber,
        config: &OverlayConfig,
    ) -> OverlayResult<Self>
    where
        P: OverlayPlatform<Surface = S>,
    {
        // Still hidden, so the snapshot doesn't include the overlay itself
        let mut surface = platform.create_surface(bounds)?;

        let screenshot = Screenshot::capture(grabber, bounds)?;
        let renderer = OverlayRenderer::new(screenshot, config.clone())?;

        surface.set_opacity(config.dim_alpha)?;
        surface.show()?;
        surface.present(&renderer.frame(), renderer.bounds())?;

        Ok(Self {
            surface,
            renderer,
            state: SelectorState::AwaitingInput,
            anchor: (0, 0),
            live: (0, 0),
            origin: (bounds.left, bounds.top),
            throttle: RedrawThrottle::new(config.redraw_interval),
            pending: false,
            result: Rect::EMPTY,
            redraws: 0,
        })
    }

    fn run(&mut self, clock: &dyn Clock) {
        while !self.state.is_terminal() {
            let Some(event) = self.surface.next_event() else {
                tracing::debug!("overlay event source closed");
                self.cancel();
                break;
            };

            if let Err(err) = self.handle(event, clock.now()) {
                tracing::warn!(%err, "overlay session aborted");
                self.cancel();
            }
        }
    }

    fn handle(&mut self, event: OverlayEvent, now: Instant) -> OverlayResult<()> {
        match (self.state, event) {
            (SelectorState::AwaitingInput, OverlayEvent::PointerDown { x, y }) => {
                self.anchor = (x, y);
                self.live = (x, y);
                self.state = SelectorState::Dragging;
                self.throttle.mark(now);
                self.surface.capture_pointer();
            }

            (SelectorState::Dragging, OverlayEvent::PointerMove { x, y }) => {
                self.live = (x, y);
                if self.throttle.ready(now) {
                    self.redraw()?;
                } else if !self.pending {
                    // Drawn on the next paint, which the surface sends once
                    // its input queue goes quiet
                    self.pending = true;
                    let stale = Rect::from_points(self.anchor, self.live).inflate(1, 1);
                    self.surface
                        .request_paint(self.renderer.last_decoration().union(&stale));
                }
            }

            (SelectorState::Dragging, OverlayEvent::PointerUp { x, y }) => {
                self.live = (x, y);
                self.pending = false;
                self.surface.release_pointer();
                self.result = calc_selection_rect(self.anchor, self.live, self.origin);
                self.state = SelectorState::Completed;
            }

            (_, OverlayEvent::KeyDown(Key::Escape)) => self.cancel(),

            (_, OverlayEvent::Paint(damage)) => {
                if self.pending {
                    self.throttle.mark(now);
                    self.redraw()?;
                }
                let region = damage.unwrap_or_else(|| self.renderer.bounds());
                self.surface.present(&self.renderer.frame(), region)?;
            }

            (_, OverlayEvent::Closed) => self.cancel(),

            _ => {}
        }
        Ok(())
    }

    fn redraw(&mut self) -> OverlayResult<()> {
        let selection = Rect::from_points(self.anchor, self.live);
        let dirty = self.renderer.redraw(selection);
        self.pending = false;
        if !dirty.is_degenerate() {
            self.surface.present(&self.renderer.frame(), dirty)?;
        }
        self.redraws += 1;
        Ok(())
    }

    fn cancel(&mut self) {
        if self.state == SelectorState::Dragging {
            self.surface.release_pointer();
        }
        self.state = SelectorState::Cancelled;
        self.result = Rect::EMPTY;
    }
}

/// Full-screen region picker
pub struct RegionSelector {
    geometry: Arc<dyn DisplayGeometry>,
    grabber: Arc<dyn FrameGrabber>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    config: OverlayConfig,
    state: SelectorState,
    selected: Rect,
    redraws: u32,
}

impl RegionSelector {
    pub fn new(
        geometry: Arc<dyn DisplayGeometry>,
        grabber: Arc<dyn FrameGrabber>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            geometry,
            grabber,
            events,
            clock: Arc::new(MonotonicClock),
            config: OverlayConfig::default(),
            state: SelectorState::Idle,
            selected: Rect::EMPTY,
            redraws: 0,
        }
    }

    pub fn with_config(mut self, config: OverlayConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Show the overlay and block until the user finishes or cancels.
    ///
    /// Returns `true` only for a completed drag with positive area; the
    /// rect is then available from [`RegionSelector::selected_region`].
    pub fn show<P: OverlayPlatform>(&mut self, platform: &P) -> bool {
        self.state = SelectorState::Idle;
        self.selected = Rect::EMPTY;
        self.redraws = 0;

        let bounds = self.geometry.virtual_screen_bounds();
        let opened = SelectionSession::<P::Surface>::open(
            platform,
            bounds,
            self.grabber.as_ref(),
            &self.config,
        );
        let mut session = match opened {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(%err, "failed to open selection overlay");
                self.state = SelectorState::Cancelled;
                self.events.emit(CaptureEvent::SelectionCancelled);
                return false;
            }
        };

        self.state = SelectorState::AwaitingInput;
        self.events.emit(CaptureEvent::SelectionStarted { bounds });

        session.run(self.clock.as_ref());

        self.state = session.state;
        self.selected = session.result;
        self.redraws = session.redraws;
        drop(session);

        if self.state == SelectorState::Completed && is_valid_selection(&self.selected) {
            self.events.emit(CaptureEvent::SelectionCompleted {
                rect: self.selected,
                redraws: self.redraws,
            });
            true
        } else {
            // A click without movement has no area; treat it as a cancel
            self.state = SelectorState::Cancelled;
            self.selected = Rect::EMPTY;
            self.events.emit(CaptureEvent::SelectionCancelled);
            false
        }
    }

    /// Selected rect in virtual-screen coordinates. Degenerate unless the
    /// last `show` returned `true`.
    pub fn selected_region(&self) -> Rect {
        self.selected
    }

    pub fn state(&self) -> SelectorState {
        self.state
    }

    pub fn outcome(&self) -> SelectionOutcome {
        if self.state == SelectorState::Completed {
            SelectionOutcome::Region(self.selected)
        } else {
            SelectionOutcome::Cancelled
        }
    }

    /// Redraws performed during the last session
    pub fn redraw_count(&self) -> u32 {
        self.redraws
    }
}
