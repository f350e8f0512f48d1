//! Background PNG persistence

use crate::png::encode_surface;
use crate::{ExportError, ExportResult, SaveConfig};
use capture::{BitmapSurface, CaptureEvent, EventSink};
use chrono::Local;
use crossbeam_channel::{unbounded, Receiver, SendError, Sender};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// One queued save. Owns the bitmap until the task finishes.
pub struct SaveTask {
    pub bitmap: BitmapSurface,
    pub path: PathBuf,
}

impl SaveTask {
    pub fn new(bitmap: BitmapSurface, path: PathBuf) -> Self {
        Self { bitmap, path }
    }

    /// Encode and write the bitmap, returning its dimensions. The bitmap is
    /// released when this returns, whatever the outcome.
    pub fn run(self) -> ExportResult<(u32, u32)> {
        let SaveTask { bitmap, path } = self;
        let dimensions = bitmap.dimensions();

        let png = encode_surface(&bitmap)?;
        ensure_parent(&path)?;
        fs::write(&path, png).map_err(|source| ExportError::WriteFailed {
            path: path.clone(),
            source,
        })?;

        Ok(dimensions)
    }
}

fn ensure_parent(path: &Path) -> ExportResult<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|source| ExportError::DirectoryCreateFailed {
                path: dir.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

/// Run one task and report how it ended. A panicking task is reported as
/// a failure; unwinding still drops its bitmap.
fn process(task: SaveTask, events: &dyn EventSink) {
    let path = task.path.clone();
    let start = Instant::now();

    match panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
        Ok(Ok((width, height))) => events.emit(CaptureEvent::SaveCompleted {
            path,
            width,
            height,
            elapsed: start.elapsed(),
        }),
        Ok(Err(err)) => events.emit(CaptureEvent::SaveFailed {
            path,
            reason: err.to_string(),
        }),
        Err(payload) => {
            let reason = format!("Save task panicked: {}", panic_message(payload.as_ref()));
            tracing::error!(path = %path.display(), %reason, "save task aborted");
            events.emit(CaptureEvent::SaveFailed { path, reason });
        }
    }
}

fn worker_loop(rx: Receiver<SaveTask>, events: Arc<dyn EventSink>) {
    for task in rx {
        process(task, events.as_ref());
    }
    tracing::debug!("save worker exiting");
}

/// File stems handed out during the current timestamp
#[derive(Default)]
struct IssuedNames {
    stamp: String,
    counts: HashMap<String, u32>,
}

/// Fire-and-forget PNG writer.
///
/// Saves are queued to a small worker pool and never block the caller.
/// Dropping the persistence finishes everything already queued.
pub struct CapturePersistence {
    config: SaveConfig,
    events: Arc<dyn EventSink>,
    sender: Option<Sender<SaveTask>>,
    workers: Vec<JoinHandle<()>>,
    issued: Mutex<IssuedNames>,
}

impl CapturePersistence {
    pub fn new(config: SaveConfig, events: Arc<dyn EventSink>) -> ExportResult<Self> {
        let (tx, rx) = unbounded::<SaveTask>();

        let mut workers = Vec::with_capacity(config.workers.max(1));
        for index in 0..config.workers.max(1) {
            let rx = rx.clone();
            let events = Arc::clone(&events);
            let handle = thread::Builder::new()
                .name(format!("png-save-{}", index))
                .spawn(move || worker_loop(rx, events))
                .map_err(ExportError::WorkerSpawn)?;
            workers.push(handle);
        }

        tracing::debug!(workers = workers.len(), directory = %config.directory.display(), "save pool started");

        Ok(Self {
            config,
            events,
            sender: Some(tx),
            workers,
            issued: Mutex::new(IssuedNames::default()),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    /// `<directory>/<base_name>_<yyyyMMdd_HHmmss_fff>.png`, local time.
    ///
    /// A name already handed out in the same millisecond, or already on
    /// disk, gets a `_1`, `_2`, ... suffix instead.
    pub fn destination_for(&self, base_name: &str) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S_%3f").to_string();
        self.unique_destination(base_name, &stamp)
    }

    fn unique_destination(&self, base_name: &str, stamp: &str) -> PathBuf {
        let mut issued = self.issued.lock();
        if issued.stamp != stamp {
            issued.stamp = stamp.to_string();
            issued.counts.clear();
        }

        let mut n = issued.counts.get(base_name).map_or(0, |last| last + 1);
        loop {
            let name = match n {
                0 => format!("{}_{}.png", base_name, stamp),
                n => format!("{}_{}_{}.png", base_name, stamp, n),
            };
            let path = self.config.directory.join(name);
            if !path.exists() {
                issued.counts.insert(base_name.to_string(), n);
                return path;
            }
            n += 1;
        }
    }

    /// Queue `bitmap` under a timestamped name and return where it will land
    pub fn save(&self, bitmap: BitmapSurface, base_name: &str) -> PathBuf {
        let path = self.destination_for(base_name);
        self.save_to(bitmap, path.clone());
        path
    }

    /// Queue `bitmap` for writing to `path`
    pub fn save_to(&self, bitmap: BitmapSurface, path: impl Into<PathBuf>) {
        let task = SaveTask::new(bitmap, path.into());
        self.events.emit(CaptureEvent::SaveQueued {
            path: task.path.clone(),
        });

        let Some(sender) = self.sender.as_ref() else {
            process(task, self.events.as_ref());
            return;
        };
        if let Err(SendError(task)) = sender.send(task) {
            // Every worker is gone; still honor the save
            tracing::warn!("save pool unavailable, saving on caller thread");
            process(task, self.events.as_ref());
        }
    }
}

impl Drop for CapturePersistence {
    fn drop(&mut self) {
        drop(self.sender.take());
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("save worker panicked");
            }
        }
    }
}
