use app::{CaptureService, FrameRecorder};
use capture::{
    CaptureError, CaptureEvent, ChannelSink, MemoryDisplay, MemoryWindow, Rect, WindowHandle,
};
use crossbeam_channel::Receiver;
use export::{CapturePersistence, SaveConfig};
use overlay::{Key, OverlayEvent, ScriptStep, ScriptedPlatform};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const BOUNDS: Rect = Rect::new(-64, -16, 64, 48);

struct Harness {
    _tmp: TempDir,
    dir: PathBuf,
    display: Arc<MemoryDisplay>,
    recorder: Arc<FrameRecorder>,
    events: Receiver<CaptureEvent>,
    service: CaptureService,
}

fn harness(display: MemoryDisplay) -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("shots");
    let display = Arc::new(display);
    let recorder = Arc::new(FrameRecorder::new());
    let (sink, events) = ChannelSink::new();
    let sink = Arc::new(sink);

    let config = SaveConfig {
        directory: dir.clone(),
        workers: 1,
    };
    let persistence = CapturePersistence::new(config, sink.clone()).unwrap();
    let service = CaptureService::new(display.clone(), display.clone(), persistence, sink)
        .with_handoff(recorder.clone());

    Harness {
        _tmp: tmp,
        dir,
        display,
        recorder,
        events,
        service,
    }
}

impl Harness {
    /// Drop the service, which waits for every queued save
    fn flush(self) -> (TempDir, PathBuf, Vec<CaptureEvent>) {
        let Harness {
            _tmp,
            dir,
            events,
            service,
            ..
        } = self;
        drop(service);
        (_tmp, dir, events.try_iter().collect())
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name().unwrap().to_str().unwrap()
}

fn rgba_of(bgra: [u8; 4]) -> [u8; 4] {
    [bgra[2], bgra[1], bgra[0], bgra[3]]
}

#[test]
fn full_screen_capture_saves_whole_virtual_screen() {
    let h = harness(MemoryDisplay::new(BOUNDS));

    let path = h.service.capture_full_screen().unwrap();
    assert!(file_name(&path).starts_with("FullScreen_"));
    assert_eq!(h.recorder.count(), 1);
    assert_eq!(h.recorder.last_destination().as_deref(), Some(path.as_path()));

    let (_tmp, _, events) = h.flush();
    let image = image::open(&path).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (128, 64));
    assert_eq!(image.get_pixel(0, 0).0, rgba_of(MemoryDisplay::pattern(-64, -16)));

    assert!(events.iter().any(|e| matches!(e, CaptureEvent::RegionCaptured { rect, .. } if *rect == BOUNDS)));
    assert!(events.iter().any(|e| matches!(e, CaptureEvent::SaveCompleted { path: p, .. } if *p == path)));
}

#[test]
fn active_window_uses_compositor_bounds() {
    let window = MemoryWindow {
        handle: WindowHandle(7),
        raw: Rect::new(-10, -10, 50, 40),
        extended: Some(Rect::new(-3, -10, 43, 33)),
    };
    let display = MemoryDisplay::new(BOUNDS)
        .with_window(window)
        .with_foreground(WindowHandle(7));
    let h = harness(display);

    let path = h.service.capture_active_window().unwrap();
    assert!(file_name(&path).starts_with("Window_"));

    let frame = h.recorder.last_frame().unwrap();
    assert_eq!((frame.width, frame.height), (46, 43));
    assert_eq!(frame.pixel(0, 0), Some(MemoryDisplay::pattern(-3, -10)));

    let (_tmp, _, _) = h.flush();
    assert_eq!(image::open(&path).unwrap().to_rgba8().dimensions(), (46, 43));
}

#[test]
fn active_window_without_foreground_fails_without_file() {
    let h = harness(MemoryDisplay::new(BOUNDS));

    let err = h.service.capture_active_window().unwrap_err();
    assert!(matches!(err, CaptureError::NoForegroundWindow));
    assert_eq!(h.display.copy_count(), 0);
    assert_eq!(h.recorder.count(), 0);

    let (_tmp, dir, events) = h.flush();
    assert!(!dir.exists());
    assert!(matches!(events.as_slice(), [CaptureEvent::CaptureFailed { .. }]));
}

#[test]
fn invalid_region_is_rejected_before_grabbing() {
    let h = harness(MemoryDisplay::new(BOUNDS));

    let err = h.service.capture_region(Rect::new(10, 10, 10, 30)).unwrap_err();
    assert!(matches!(
        err,
        CaptureError::InvalidRegion {
            width: 0,
            height: 20
        }
    ));
    assert_eq!(h.display.copy_count(), 0);

    let (_tmp, dir, _) = h.flush();
    assert!(!dir.exists());
}

#[test]
fn region_capture_keeps_exact_dimensions() {
    let h = harness(MemoryDisplay::new(BOUNDS));
    let path = h
        .service
        .capture_region(Rect::from_origin_size(-20, 0, 33, 17))
        .unwrap();
    assert!(file_name(&path).starts_with("Region_"));

    let (_tmp, _, _) = h.flush();
    let image = image::open(&path).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (33, 17));
    assert_eq!(image.get_pixel(32, 16).0, rgba_of(MemoryDisplay::pattern(12, 16)));
}

#[test]
fn selected_region_is_captured() {
    let h = harness(MemoryDisplay::new(BOUNDS));
    let platform = ScriptedPlatform::new([
        ScriptStep::Event(OverlayEvent::PointerDown { x: 10, y: 10 }),
        ScriptStep::Event(OverlayEvent::PointerMove { x: 40, y: 30 }),
        ScriptStep::Event(OverlayEvent::PointerUp { x: 40, y: 30 }),
    ]);

    let path = h.service.select_and_capture_region(&platform).unwrap().unwrap();
    assert!(file_name(&path).starts_with("Region_"));
    // One snapshot for the overlay, one for the region itself
    assert_eq!(h.display.copy_count(), 2);

    let (_tmp, _, events) = h.flush();
    assert!(events.iter().any(|e| matches!(
        e,
        CaptureEvent::SelectionCompleted { rect, .. } if *rect == Rect::new(-54, -6, -24, 14)
    )));
    assert_eq!(image::open(&path).unwrap().to_rgba8().dimensions(), (30, 20));
}

#[test]
fn cancelled_selection_captures_nothing() {
    let h = harness(MemoryDisplay::new(BOUNDS));
    let platform = ScriptedPlatform::new([ScriptStep::Event(OverlayEvent::KeyDown(Key::Escape))]);

    assert_eq!(h.service.select_and_capture_region(&platform).unwrap(), None);
    assert_eq!(h.display.copy_count(), 1);
    assert_eq!(h.recorder.count(), 0);

    let (_tmp, dir, _) = h.flush();
    assert!(!dir.exists());
}
