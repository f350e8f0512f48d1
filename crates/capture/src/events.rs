//! Structured capture events
//!
//! Every component gets an [`EventSink`] at construction and reports
//! milestones and failures through it instead of writing its own logs.

use crate::Rect;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    RegionCaptured { rect: Rect, elapsed: Duration },
    CaptureFailed { rect: Rect, reason: String },
    SelectionStarted { bounds: Rect },
    SelectionCompleted { rect: Rect, redraws: u32 },
    SelectionCancelled,
    SaveQueued { path: PathBuf },
    SaveCompleted { path: PathBuf, width: u32, height: u32, elapsed: Duration },
    SaveFailed { path: PathBuf, reason: String },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: CaptureEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: CaptureEvent) {
        match event {
            CaptureEvent::RegionCaptured { rect, elapsed } => {
                tracing::info!(%rect, elapsed_ms = elapsed.as_millis() as u64, "region captured");
            }
            CaptureEvent::CaptureFailed { rect, reason } => {
                tracing::warn!(%rect, %reason, "capture failed");
            }
            CaptureEvent::SelectionStarted { bounds } => {
                tracing::debug!(%bounds, "selection overlay opened");
            }
            CaptureEvent::SelectionCompleted { rect, redraws } => {
                tracing::info!(%rect, redraws, "selection completed");
            }
            CaptureEvent::SelectionCancelled => {
                tracing::info!("selection cancelled");
            }
            CaptureEvent::SaveQueued { path } => {
                tracing::debug!(path = %path.display(), "save queued");
            }
            CaptureEvent::SaveCompleted { path, width, height, elapsed } => {
                tracing::info!(
                    path = %path.display(),
                    width,
                    height,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "capture saved"
                );
            }
            CaptureEvent::SaveFailed { path, reason } => {
                tracing::error!(path = %path.display(), %reason, "save failed");
            }
        }
    }
}

/// Sends events over a channel, for consumers on another thread
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<CaptureEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<CaptureEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: CaptureEvent) {
        // The receiver going away just means nobody is listening
        let _ = self.tx.send(event);
    }
}
