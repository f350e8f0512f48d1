use capture::{CaptureEvent, ChannelSink, MemoryDisplay, Rect};
use overlay::{
    Color, Key, OverlayEvent, RegionSelector, ScriptStep, ScriptedPlatform, SelectionOutcome,
    SelectorState,
};
use std::sync::Arc;
use std::time::Duration;

const BOUNDS: Rect = Rect::new(-100, -50, 300, 250);

fn down(x: i32, y: i32) -> ScriptStep {
    ScriptStep::Event(OverlayEvent::PointerDown { x, y })
}

fn moved(x: i32, y: i32) -> ScriptStep {
    ScriptStep::Event(OverlayEvent::PointerMove { x, y })
}

fn up(x: i32, y: i32) -> ScriptStep {
    ScriptStep::Event(OverlayEvent::PointerUp { x, y })
}

fn wait(ms: u64) -> ScriptStep {
    ScriptStep::Advance(Duration::from_millis(ms))
}

fn escape() -> ScriptStep {
    ScriptStep::Event(OverlayEvent::KeyDown(Key::Escape))
}

/// Colour channels roughly halved, as a black wash at alpha 128 leaves them
fn assert_dimmed(shown: [u8; 4], desktop: [u8; 4]) {
    for c in 0..3 {
        let expected = desktop[c] as i32 * 127 / 255;
        assert!(
            (shown[c] as i32 - expected).abs() <= 1,
            "channel {c}: shown {shown:?}, desktop {desktop:?}"
        );
    }
}

struct Fixture {
    display: Arc<MemoryDisplay>,
    selector: RegionSelector,
    events: crossbeam_channel::Receiver<CaptureEvent>,
}

fn fixture(platform: &ScriptedPlatform) -> Fixture {
    let display = Arc::new(MemoryDisplay::new(BOUNDS));
    let (sink, events) = ChannelSink::new();
    let selector = RegionSelector::new(display.clone(), display.clone(), Arc::new(sink))
        .with_clock(Arc::new(platform.clock()));
    Fixture {
        display,
        selector,
        events,
    }
}

#[test]
fn forward_drag_selects_region_in_screen_coordinates() {
    let platform = ScriptedPlatform::new([
        down(10, 10),
        wait(10),
        moved(60, 80),
        wait(10),
        moved(110, 160),
        up(110, 160),
    ]);
    let mut fx = fixture(&platform);

    assert!(fx.selector.show(&platform));
    assert_eq!(fx.selector.state(), SelectorState::Completed);
    assert_eq!(fx.selector.selected_region(), Rect::new(-90, -40, 10, 110));
    assert_eq!(
        fx.selector.outcome(),
        SelectionOutcome::Region(Rect::new(-90, -40, 10, 110))
    );
    assert_eq!(fx.display.copy_count(), 1);

    let events: Vec<_> = fx.events.try_iter().collect();
    assert_eq!(
        events,
        vec![
            CaptureEvent::SelectionStarted { bounds: BOUNDS },
            CaptureEvent::SelectionCompleted {
                rect: Rect::new(-90, -40, 10, 110),
                redraws: 2,
            },
        ]
    );
}

#[test]
fn reversed_drag_selects_same_region() {
    let platform = ScriptedPlatform::new([down(110, 160), wait(20), moved(10, 10), up(10, 10)]);
    let mut fx = fixture(&platform);

    assert!(fx.selector.show(&platform));
    assert_eq!(fx.selector.selected_region(), Rect::new(-90, -40, 10, 110));
}

#[test]
fn surface_is_dimmed_shown_and_torn_down() {
    let platform = ScriptedPlatform::new([down(10, 10), wait(10), moved(50, 50), up(50, 50)]);
    let mut fx = fixture(&platform);

    assert!(fx.selector.show(&platform));

    let log = platform.log();
    assert_eq!(log.created, Some(BOUNDS));
    assert_eq!(log.opacity, Some(128));
    assert!(log.shown);
    assert!(log.dropped);
    assert_eq!(log.pointer_captures, 1);
    assert_eq!(log.pointer_releases, 1);
    // First present is the whole frozen desktop
    assert_eq!(log.presents.first(), Some(&Rect::new(0, 0, 400, 300)));
}

#[test]
fn redraws_only_touch_the_decorated_area() {
    let platform = ScriptedPlatform::new([down(10, 10), wait(10), moved(50, 50), up(50, 50)]);
    let mut fx = fixture(&platform);
    assert!(fx.selector.show(&platform));

    let log = platform.log();
    let partial = &log.presents[1..];
    assert!(!partial.is_empty());
    for region in partial {
        assert!(region.width() < 400 && region.height() < 300, "{}", region);
    }

    // Far corner still shows the frozen, dimmed desktop
    let visible = log.visible.as_ref().unwrap();
    assert_dimmed(visible.pixel(390, 290).unwrap(), MemoryDisplay::pattern(290, 240));
}

#[test]
fn backdrop_is_dimmed_everywhere() {
    let platform = ScriptedPlatform::new([escape()]);
    let mut fx = fixture(&platform);
    assert!(!fx.selector.show(&platform));

    let log = platform.log();
    let visible = log.visible.as_ref().unwrap();
    let mut identical = 0;
    for y in (0..300).step_by(7) {
        for x in (0..400).step_by(7) {
            let shown = visible.pixel(x, y).unwrap();
            let desktop = MemoryDisplay::pattern(x + BOUNDS.left, y + BOUNDS.top);
            assert_dimmed(shown, desktop);
            identical += (shown == desktop) as u32;
        }
    }
    // Only all-black desktop pixels survive the wash unchanged
    assert!(identical <= 1, "{identical} pixels undimmed");
}

#[test]
fn throttled_move_is_drawn_on_next_paint() {
    let platform = ScriptedPlatform::new([
        down(10, 10),
        wait(10),
        moved(50, 50),
        wait(2),
        moved(90, 120),
        ScriptStep::Event(OverlayEvent::Paint(Some(Rect::new(0, 0, 1, 1)))),
        escape(),
    ]);
    let mut fx = fixture(&platform);
    assert!(!fx.selector.show(&platform));
    assert_eq!(fx.selector.redraw_count(), 2);

    let log = platform.log();
    assert_eq!(log.paint_requests.len(), 1);
    assert!(log.paint_requests[0].contains(90, 120));

    // The second redraw's border sits at the latest pointer position
    let visible = log.visible.as_ref().unwrap();
    let border = Color::rgb(0, 120, 215).to_bgra();
    assert_eq!(visible.pixel(90, 80), Some(border));
    assert_ne!(visible.pixel(50, 80), Some(border));
}

#[test]
fn size_label_reaches_the_surface() {
    let platform = ScriptedPlatform::new([down(20, 100), wait(10), moved(70, 140), up(70, 140)]);
    let mut fx = fixture(&platform);
    assert!(fx.selector.show(&platform));

    assert_eq!(platform.log().labels, vec!["50x40".to_string()]);
}

#[test]
fn escape_cancels_with_empty_region() {
    let platform = ScriptedPlatform::new([escape()]);
    let mut fx = fixture(&platform);

    assert!(!fx.selector.show(&platform));
    assert_eq!(fx.selector.state(), SelectorState::Cancelled);
    assert_eq!(fx.selector.selected_region(), Rect::EMPTY);
    assert_eq!(fx.selector.outcome(), SelectionOutcome::Cancelled);
    assert!(platform.log().dropped);

    let events: Vec<_> = fx.events.try_iter().collect();
    assert_eq!(events.last(), Some(&CaptureEvent::SelectionCancelled));
}

#[test]
fn escape_mid_drag_releases_pointer() {
    let platform = ScriptedPlatform::new([down(10, 10), wait(10), moved(40, 40), escape()]);
    let mut fx = fixture(&platform);

    assert!(!fx.selector.show(&platform));
    assert_eq!(fx.selector.selected_region(), Rect::EMPTY);
    assert_eq!(platform.log().pointer_releases, 1);
}

#[test]
fn click_without_drag_is_cancelled() {
    let platform = ScriptedPlatform::new([down(25, 25), up(25, 25)]);
    let mut fx = fixture(&platform);

    assert!(!fx.selector.show(&platform));
    assert_eq!(fx.selector.state(), SelectorState::Cancelled);
    assert_eq!(fx.selector.selected_region(), Rect::EMPTY);
}

#[test]
fn drag_moves_are_throttled() {
    let mut steps = vec![down(0, 0)];
    for i in 1..=100 {
        steps.push(wait(1));
        steps.push(moved(i, i));
    }
    steps.push(up(100, 100));
    let platform = ScriptedPlatform::new(steps);
    let mut fx = fixture(&platform);

    assert!(fx.selector.show(&platform));
    assert_eq!(fx.selector.redraw_count(), 12);
    assert_eq!(fx.selector.selected_region(), Rect::new(-100, -50, 0, 50));
}

#[test]
fn closed_event_source_cancels() {
    let platform = ScriptedPlatform::new([down(10, 10), wait(10), moved(30, 30)]);
    let mut fx = fixture(&platform);

    assert!(!fx.selector.show(&platform));
    assert_eq!(fx.selector.state(), SelectorState::Cancelled);
    assert_eq!(platform.log().pointer_releases, 1);
}

#[test]
fn paint_requests_are_presented() {
    let damage = Rect::new(0, 0, 5, 5);
    let platform = ScriptedPlatform::new([
        ScriptStep::Event(OverlayEvent::Paint(Some(damage))),
        ScriptStep::Event(OverlayEvent::Closed),
    ]);
    let mut fx = fixture(&platform);

    assert!(!fx.selector.show(&platform));
    assert!(platform.log().presents.contains(&damage));
}

#[test]
fn surface_creation_failure_cancels_without_snapshot() {
    let platform = ScriptedPlatform::failing();
    let mut fx = fixture(&platform);

    assert!(!fx.selector.show(&platform));
    assert_eq!(fx.selector.state(), SelectorState::Cancelled);
    assert_eq!(fx.display.copy_count(), 0);
    let events: Vec<_> = fx.events.try_iter().collect();
    assert_eq!(events, vec![CaptureEvent::SelectionCancelled]);
}

#[test]
fn snapshot_failure_leaves_no_surface_behind() {
    let platform = ScriptedPlatform::new([down(10, 10), up(50, 50)]);
    let mut fx = fixture(&platform);
    fx.display.fail_copies(true);

    assert!(!fx.selector.show(&platform));
    let log = platform.log();
    assert!(!log.shown);
    assert!(log.dropped);
    assert_eq!(platform.remaining_steps(), 2);
}

#[test]
fn selector_can_run_again() {
    let platform = ScriptedPlatform::new([escape(), down(0, 0), wait(10), moved(20, 20), up(20, 20)]);
    let mut fx = fixture(&platform);

    assert!(!fx.selector.show(&platform));
    assert!(fx.selector.show(&platform));
    assert_eq!(fx.selector.selected_region(), Rect::new(-100, -50, -80, -30));
    assert_eq!(fx.display.copy_count(), 2);
}
