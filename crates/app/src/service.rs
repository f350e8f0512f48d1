//! Capture triggers
//!
//! Each trigger resolves a rectangle, grabs it, hands the bitmap to the
//! optional [`ResultHandoff`] and queues it for saving.

use crate::handoff::ResultHandoff;
use capture::{
    CaptureEvent, CaptureResult, DisplayGeometry, EventSink, FrameGrabber, Rect,
};
use export::CapturePersistence;
use overlay::{OverlayConfig, OverlayPlatform, RegionSelector};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// What the user asked to capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    FullScreen,
    ActiveWindow,
    Region,
}

impl CaptureMode {
    /// File name prefix for saved captures
    pub fn file_prefix(self) -> &'static str {
        match self {
            CaptureMode::FullScreen => "FullScreen",
            CaptureMode::ActiveWindow => "Window",
            CaptureMode::Region => "Region",
        }
    }
}

pub struct CaptureService {
    geometry: Arc<dyn DisplayGeometry>,
    grabber: Arc<dyn FrameGrabber>,
    persistence: CapturePersistence,
    events: Arc<dyn EventSink>,
    handoff: Option<Arc<dyn ResultHandoff>>,
    overlay_config: OverlayConfig,
}

impl CaptureService {
    pub fn new(
        geometry: Arc<dyn DisplayGeometry>,
        grabber: Arc<dyn FrameGrabber>,
        persistence: CapturePersistence,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            geometry,
            grabber,
            persistence,
            events,
            handoff: None,
            overlay_config: OverlayConfig::default(),
        }
    }

    pub fn with_handoff(mut self, handoff: Arc<dyn ResultHandoff>) -> Self {
        self.handoff = Some(handoff);
        self
    }

    pub fn with_overlay_config(mut self, config: OverlayConfig) -> Self {
        self.overlay_config = config;
        self
    }

    pub fn persistence(&self) -> &CapturePersistence {
        &self.persistence
    }

    /// Capture every monitor
    pub fn capture_full_screen(&self) -> CaptureResult<PathBuf> {
        let bounds = self.geometry.virtual_screen_bounds();
        self.capture(CaptureMode::FullScreen, bounds)
    }

    /// Capture the foreground window as it appears on screen
    pub fn capture_active_window(&self) -> CaptureResult<PathBuf> {
        let bounds = self
            .geometry
            .visual_bounds_of(self.geometry.foreground_window())
            .map_err(|err| {
                self.events.emit(CaptureEvent::CaptureFailed {
                    rect: Rect::EMPTY,
                    reason: err.to_string(),
                });
                err
            })?;
        self.capture(CaptureMode::ActiveWindow, bounds)
    }

    pub fn capture_region(&self, rect: Rect) -> CaptureResult<PathBuf> {
        self.capture(CaptureMode::Region, rect)
    }

    /// Let the user drag out a region, then capture it.
    ///
    /// `Ok(None)` when the selection was cancelled; nothing is captured.
    pub fn select_and_capture_region<P: OverlayPlatform>(
        &self,
        platform: &P,
    ) -> CaptureResult<Option<PathBuf>> {
        let mut selector = RegionSelector::new(
            Arc::clone(&self.geometry),
            Arc::clone(&self.grabber),
            Arc::clone(&self.events),
        )
        .with_config(self.overlay_config.clone());

        if !selector.show(platform) {
            tracing::info!("region selection cancelled");
            return Ok(None);
        }
        self.capture_region(selector.selected_region()).map(Some)
    }

    fn capture(&self, mode: CaptureMode, rect: Rect) -> CaptureResult<PathBuf> {
        let start = Instant::now();
        let bitmap = match self.grabber.capture(rect) {
            Ok(bitmap) => bitmap,
            Err(err) => {
                self.events.emit(CaptureEvent::CaptureFailed {
                    rect,
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };
        self.events.emit(CaptureEvent::RegionCaptured {
            rect,
            elapsed: start.elapsed(),
        });

        let destination = self.persistence.destination_for(mode.file_prefix());
        if let Some(handoff) = &self.handoff {
            handoff.on_capture(&bitmap, &destination);
        }
        self.persistence.save_to(bitmap, destination.clone());

        tracing::debug!(?mode, path = %destination.display(), "capture queued for saving");
        Ok(destination)
    }
}
