//! TinyCapture application layer
//!
//! Wires geometry, grabbing, the selection overlay and PNG persistence
//! into the capture triggers used by the CLI.

pub mod handoff;
pub mod service;

pub use handoff::{FrameRecorder, ResultHandoff};
pub use service::{CaptureMode, CaptureService};

#[cfg(windows)]
pub use native::native_service;

#[cfg(windows)]
mod native {
    use crate::CaptureService;
    use capture::{EventSink, GdiDisplay};
    use export::{CapturePersistence, ExportResult, SaveConfig};
    use std::sync::Arc;

    /// Service backed by the live desktop
    pub fn native_service(
        config: SaveConfig,
        events: Arc<dyn EventSink>,
    ) -> ExportResult<CaptureService> {
        let display = Arc::new(GdiDisplay::new());
        let persistence = CapturePersistence::new(config, Arc::clone(&events))?;
        Ok(CaptureService::new(display.clone(), display, persistence, events))
    }
}
