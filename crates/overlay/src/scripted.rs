//! Scripted overlay platform
//!
//! Replays a fixed sequence of input events against an in-memory surface
//! and records everything the selector does to it. Lets the selection
//! state machine run headless.

use crate::render::{Canvas, Frame};
use crate::selection::Clock;
use crate::surface::{OverlayEvent, OverlayPlatform, OverlaySurface};
use crate::{OverlayError, OverlayResult};
use capture::Rect;
use parking_lot::{Mutex, MutexGuard};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStep {
    Event(OverlayEvent),
    /// Move the platform clock forward before the next event
    Advance(Duration),
}

/// Clock that only moves when told to
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// What happened to the scripted surface
#[derive(Default)]
pub struct SurfaceLog {
    pub created: Option<Rect>,
    pub opacity: Option<u8>,
    pub shown: bool,
    /// Regions passed to `present`, in order
    pub presents: Vec<Rect>,
    /// Regions passed to `request_paint`
    pub paint_requests: Vec<Rect>,
    pub pointer_captures: u32,
    pub pointer_releases: u32,
    pub dropped: bool,
    /// Visible contents, built up from presented regions only
    pub visible: Option<Canvas>,
    /// Label text drawn by each present that reached the label
    pub labels: Vec<String>,
}

pub struct ScriptedPlatform {
    script: Arc<Mutex<VecDeque<ScriptStep>>>,
    clock: ManualClock,
    log: Arc<Mutex<SurfaceLog>>,
    fail_create: bool,
}

impl ScriptedPlatform {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            script: Arc::new(Mutex::new(steps.into_iter().collect())),
            clock: ManualClock::new(),
            log: Arc::new(Mutex::new(SurfaceLog::default())),
            fail_create: false,
        }
    }

    /// Platform whose surfaces can never be created
    pub fn failing() -> Self {
        Self {
            fail_create: true,
            ..Self::new([])
        }
    }

    pub fn clock(&self) -> ManualClock {
        self.clock.clone()
    }

    pub fn log(&self) -> MutexGuard<'_, SurfaceLog> {
        self.log.lock()
    }

    pub fn remaining_steps(&self) -> usize {
        self.script.lock().len()
    }
}

impl OverlayPlatform for ScriptedPlatform {
    type Surface = ScriptedSurface;

    fn create_surface(&self, bounds: Rect) -> OverlayResult<ScriptedSurface> {
        if self.fail_create {
            return Err(OverlayError::Surface("scripted surface refused".into()));
        }

        {
            let mut log = self.log.lock();
            *log = SurfaceLog::default();
            log.created = Some(bounds);
            log.visible = Canvas::new(bounds.width() as u32, bounds.height() as u32);
        }

        Ok(ScriptedSurface {
            script: Arc::clone(&self.script),
            clock: self.clock.clone(),
            log: Arc::clone(&self.log),
        })
    }
}

pub struct ScriptedSurface {
    script: Arc<Mutex<VecDeque<ScriptStep>>>,
    clock: ManualClock,
    log: Arc<Mutex<SurfaceLog>>,
}

impl OverlaySurface for ScriptedSurface {
    fn set_opacity(&mut self, alpha: u8) -> OverlayResult<()> {
        self.log.lock().opacity = Some(alpha);
        Ok(())
    }

    fn show(&mut self) -> OverlayResult<()> {
        self.log.lock().shown = true;
        Ok(())
    }

    fn present(&mut self, frame: &Frame<'_>, region: Rect) -> OverlayResult<()> {
        let mut log = self.log.lock();
        log.presents.push(region);
        if let Some(visible) = log.visible.as_mut() {
            visible.copy_from(frame.canvas, region);
        }
        if let Some(label) = frame.label.filter(|l| l.rect.intersection(&region).is_some()) {
            log.labels.push(label.text.clone());
        }
        Ok(())
    }

    fn request_paint(&mut self, region: Rect) {
        // Paints only arrive when the script says so
        self.log.lock().paint_requests.push(region);
    }

    fn capture_pointer(&mut self) {
        self.log.lock().pointer_captures += 1;
    }

    fn release_pointer(&mut self) {
        self.log.lock().pointer_releases += 1;
    }

    fn next_event(&mut self) -> Option<OverlayEvent> {
        loop {
            match self.script.lock().pop_front()? {
                ScriptStep::Advance(by) => self.clock.advance(by),
                ScriptStep::Event(event) => return Some(event),
            }
        }
    }
}

impl Drop for ScriptedSurface {
    fn drop(&mut self) {
        self.log.lock().dropped = true;
    }
}
