//! Offscreen compositing for the overlay
//!
//! The renderer keeps two canvases the size of the virtual screen: a
//! snapshot taken once when the overlay opens and dimmed in place, and a
//! backbuffer that is patched in place. Each redraw restores only the area
//! the previous decoration covered, draws the new one, and reports the
//! dirty rect so the surface can present just that part.
//!
//! The size label's text is not rasterized here. The renderer reserves and
//! backs its rect; the surface draws the glyphs when it presents.

use crate::screenshot::Screenshot;
use crate::{OverlayConfig, OverlayResult};
use capture::frame::BYTES_PER_PIXEL;
use capture::Rect;
use tiny_skia::{Paint, PathBuilder, Pixmap, Stroke, Transform};

/// Nominal advance of one label character
const LABEL_CHAR_WIDTH: i32 = 8;
/// Nominal label line height
const LABEL_LINE_HEIGHT: i32 = 16;
/// Space between the label text and its background edge
pub const LABEL_PADDING: i32 = 2;
/// Distance from the label's top edge to the selection's top edge
const LABEL_OFFSET: i32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_bgra(self) -> [u8; 4] {
        [self.b, self.g, self.r, self.a]
    }

    fn paint(self) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color_rgba8(self.r, self.g, self.b, self.a);
        paint.anti_alias = false;
        paint
    }
}

fn sk_rect(rect: Rect) -> Option<tiny_skia::Rect> {
    if rect.is_degenerate() {
        return None;
    }
    tiny_skia::Rect::from_ltrb(
        rect.left as f32,
        rect.top as f32,
        rect.right as f32,
        rect.bottom as f32,
    )
}

/// CPU drawing surface backed by a tiny-skia pixmap.
///
/// Pixel accessors speak BGRA like the rest of the capture pipeline.
#[derive(Debug, Clone)]
pub struct Canvas {
    pixmap: Pixmap,
}

impl Canvas {
    /// Transparent canvas; `None` for a zero-sized one
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Pixmap::new(width, height).map(|pixmap| Self { pixmap })
    }

    /// Wrap opaque BGRA screen pixels; `None` if the buffer does not match
    /// the size
    pub fn from_bgra(width: u32, height: u32, mut data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * BYTES_PER_PIXEL {
            return None;
        }
        // Screen grabs carry no meaningful alpha
        for px in data.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.swap(0, 2);
            px[3] = 0xFF;
        }
        let size = tiny_skia::IntSize::from_wh(width, height)?;
        Pixmap::from_vec(data, size).map(|pixmap| Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width() as i32, self.height() as i32)
    }

    /// BGRA value at (x, y)
    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        if !self.bounds().contains(x, y) {
            return None;
        }
        let px = self.pixmap.pixel(x as u32, y as u32)?;
        Some([px.blue(), px.green(), px.red(), px.alpha()])
    }

    fn offset(&self, x: i32, y: i32) -> usize {
        (y as usize * self.width() as usize + x as usize) * BYTES_PER_PIXEL
    }

    /// Source-over fill, so a translucent color blends with what is there
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some(rect) = sk_rect(rect) else {
            return;
        };
        self.pixmap
            .fill_rect(rect, &color.paint(), Transform::identity(), None);
    }

    /// Border of `width` pixels centred on the edges of `rect`
    pub fn stroke_rect(&mut self, rect: Rect, width: i32, color: Color) {
        let Some(rect) = sk_rect(rect) else {
            return;
        };
        let path = PathBuilder::from_rect(rect);
        let stroke = Stroke {
            width: width.max(1) as f32,
            ..Stroke::default()
        };
        self.pixmap.stroke_path(
            &path,
            &color.paint(),
            &stroke,
            Transform::identity(),
            None,
        );
    }

    /// Copy `rect` from a canvas of the same size
    pub fn copy_from(&mut self, src: &Canvas, rect: Rect) {
        debug_assert_eq!(
            (self.width(), self.height()),
            (src.width(), src.height())
        );
        let Some(clip) = rect
            .intersection(&self.bounds())
            .and_then(|r| r.intersection(&src.bounds()))
        else {
            return;
        };
        for y in clip.top..clip.bottom {
            let start = self.offset(clip.left, y);
            let end = self.offset(clip.right, y);
            self.pixmap.data_mut()[start..end].copy_from_slice(&src.pixmap.data()[start..end]);
        }
    }

    /// Pixels of `rect` as a packed top-down BGRA block, with the clipped
    /// rect
    pub fn region_bytes(&self, rect: Rect) -> Option<(Rect, Vec<u8>)> {
        let clip = rect.intersection(&self.bounds())?;
        let mut out = Vec::with_capacity(
            clip.width() as usize * clip.height() as usize * BYTES_PER_PIXEL,
        );
        for y in clip.top..clip.bottom {
            let row = &self.pixmap.data()[self.offset(clip.left, y)..self.offset(clip.right, y)];
            for px in row.chunks_exact(BYTES_PER_PIXEL) {
                out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
            }
        }
        Some((clip, out))
    }
}

/// Size readout drawn above the selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeLabel {
    /// Backed area, surface-local
    pub rect: Rect,
    pub text: String,
    pub color: Color,
}

impl SizeLabel {
    /// Where the text's top-left corner goes
    pub fn text_origin(&self) -> (i32, i32) {
        (self.rect.left + LABEL_PADDING, self.rect.top + LABEL_PADDING)
    }
}

/// Space reserved for `text`, padding included
pub fn text_extent(text: &str) -> (i32, i32) {
    let n = text.chars().count() as i32;
    if n == 0 {
        return (0, 0);
    }
    (
        n * LABEL_CHAR_WIDTH + 2 * LABEL_PADDING,
        LABEL_LINE_HEIGHT + 2 * LABEL_PADDING,
    )
}

/// What a surface needs to present: the backbuffer plus the label to draw
/// over it
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub canvas: &'a Canvas,
    pub label: Option<&'a SizeLabel>,
}

/// Static dimmed snapshot plus the mutable backbuffer
#[derive(Debug, Clone)]
pub struct CompositeBuffers {
    pub snapshot: Canvas,
    pub backbuffer: Canvas,
}

impl CompositeBuffers {
    /// Darken `snapshot` with black at `dim_alpha` and start the
    /// backbuffer from the result
    pub fn new(mut snapshot: Canvas, dim_alpha: u8) -> Self {
        if dim_alpha > 0 {
            let bounds = snapshot.bounds();
            snapshot.fill_rect(bounds, Color::rgba(0, 0, 0, dim_alpha));
        }
        let backbuffer = snapshot.clone();
        Self { snapshot, backbuffer }
    }
}

/// Overlay renderer
pub struct OverlayRenderer {
    buffers: CompositeBuffers,
    config: OverlayConfig,
    last_decoration: Rect,
    label: Option<SizeLabel>,
}

impl OverlayRenderer {
    /// Create a new renderer with screenshot
    pub fn new(screenshot: Screenshot, config: OverlayConfig) -> OverlayResult<Self> {
        let snapshot = screenshot.into_canvas()?;
        Ok(Self::from_canvas(snapshot, config))
    }

    fn from_canvas(snapshot: Canvas, config: OverlayConfig) -> Self {
        Self {
            buffers: CompositeBuffers::new(snapshot, config.dim_alpha),
            config,
            last_decoration: Rect::EMPTY,
            label: None,
        }
    }

    pub fn backbuffer(&self) -> &Canvas {
        &self.buffers.backbuffer
    }

    pub fn snapshot(&self) -> &Canvas {
        &self.buffers.snapshot
    }

    pub fn frame(&self) -> Frame<'_> {
        Frame {
            canvas: &self.buffers.backbuffer,
            label: self.label.as_ref(),
        }
    }

    pub fn label(&self) -> Option<&SizeLabel> {
        self.label.as_ref()
    }

    pub fn bounds(&self) -> Rect {
        self.buffers.backbuffer.bounds()
    }

    /// Area covered by the most recent decoration (surface-local)
    pub fn last_decoration(&self) -> Rect {
        self.last_decoration
    }

    /// Redraw the selection decoration for `selection` (surface-local,
    /// normalized) and return the dirty rect to present.
    pub fn redraw(&mut self, selection: Rect) -> Rect {
        let previous = self.last_decoration;
        if !previous.is_degenerate() {
            self.buffers.backbuffer.copy_from(&self.buffers.snapshot, previous);
        }

        let decoration = self.decorate(selection);
        self.last_decoration = decoration;

        previous
            .union(&decoration)
            .intersection(&self.bounds())
            .unwrap_or(Rect::EMPTY)
    }

    fn decorate(&mut self, selection: Rect) -> Rect {
        let border = self.config.border_width.max(1);
        let mut covered = selection.inflate(border, border);

        self.label = self.label_rect(selection).map(|rect| SizeLabel {
            rect,
            text: size_label(selection),
            color: self.config.label_color,
        });
        if let Some(label) = &self.label {
            self.buffers
                .backbuffer
                .fill_rect(label.rect, self.config.label_background);
            covered = covered.union(&label.rect);
        }

        self.buffers
            .backbuffer
            .stroke_rect(selection, border, self.config.border_color);

        covered.intersection(&self.bounds()).unwrap_or(Rect::EMPTY)
    }

    /// Where the size label goes, if there is room above the selection
    pub fn label_rect(&self, selection: Rect) -> Option<Rect> {
        if selection.top < self.config.label_clearance {
            return None;
        }
        let (w, h) = text_extent(&size_label(selection));
        Some(Rect::from_origin_size(
            selection.left,
            selection.top - LABEL_OFFSET,
            w,
            h,
        ))
    }
}

/// "WIDTHxHEIGHT" text for a selection
pub fn size_label(selection: Rect) -> String {
    format!("{}x{}", selection.width(), selection.height())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(width: u32, height: u32) -> Canvas {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 0x40, 0xFF]);
            }
        }
        Canvas::from_bgra(width, height, data).unwrap()
    }

    fn renderer(width: u32, height: u32) -> OverlayRenderer {
        OverlayRenderer::from_canvas(snapshot(width, height), OverlayConfig::default())
    }

    #[test]
    fn stroke_covers_edges_only() {
        let mut canvas = Canvas::new(20, 20).unwrap();
        let blue = Color::rgb(0, 0, 255);
        canvas.stroke_rect(Rect::new(5, 5, 15, 15), 2, blue);

        assert_eq!(canvas.pixel(5, 5), Some(blue.to_bgra()));
        assert_eq!(canvas.pixel(4, 10), Some(blue.to_bgra()));
        assert_eq!(canvas.pixel(10, 10), Some([0, 0, 0, 0]));
        assert_eq!(canvas.pixel(2, 2), Some([0, 0, 0, 0]));
    }

    #[test]
    fn canvas_keeps_bgra_order() {
        let canvas = Canvas::from_bgra(1, 1, vec![10, 20, 30, 0]).unwrap();
        // Alpha forced opaque
        assert_eq!(canvas.pixel(0, 0), Some([10, 20, 30, 0xFF]));
        assert!(Canvas::from_bgra(2, 2, vec![0; 15]).is_none());
        assert!(Canvas::new(0, 10).is_none());
    }

    #[test]
    fn snapshot_is_dimmed_once() {
        let r = renderer(64, 64);
        let original = snapshot(64, 64);

        let bright = original.pixel(63, 63).unwrap();
        let dimmed = r.snapshot().pixel(63, 63).unwrap();
        for c in 0..3 {
            let expected = bright[c] as i32 * 127 / 255;
            assert!((dimmed[c] as i32 - expected).abs() <= 1, "channel {c}: {dimmed:?}");
        }
        assert_eq!(r.backbuffer().pixel(63, 63), Some(dimmed));

        let undimmed = OverlayRenderer::from_canvas(
            snapshot(8, 8),
            OverlayConfig {
                dim_alpha: 0,
                ..OverlayConfig::default()
            },
        );
        assert_eq!(undimmed.snapshot().pixel(7, 7), snapshot(8, 8).pixel(7, 7));
    }

    #[test]
    fn label_is_skipped_near_top_edge() {
        let r = renderer(200, 200);
        assert!(r.label_rect(Rect::new(10, 10, 110, 160)).is_none());
        let label = r.label_rect(Rect::new(10, 40, 110, 160)).unwrap();
        assert_eq!(label.top, 16);
        assert_eq!(label.left, 10);
        assert_eq!(label.width(), text_extent("100x120").0);
        assert_eq!(label.width(), 7 * 8 + 4);
    }

    #[test]
    fn redraw_publishes_label_for_the_surface() {
        let mut r = renderer(200, 200);
        r.redraw(Rect::new(10, 40, 110, 160));
        let label = r.frame().label.cloned().unwrap();
        assert_eq!(label.text, "100x120");
        assert_eq!(label.text_origin(), (12, 18));
        // Backed, so it reads against any desktop
        assert_ne!(r.backbuffer().pixel(12, 18), r.snapshot().pixel(12, 18));

        r.redraw(Rect::new(10, 10, 30, 30));
        assert!(r.label().is_none());
        assert_eq!(r.backbuffer().pixel(12, 18), r.snapshot().pixel(12, 18));
    }

    #[test]
    fn redraw_restores_previous_decoration() {
        let mut r = renderer(200, 200);
        let first = Rect::new(50, 60, 150, 160);
        let dirty = r.redraw(first);
        assert!(dirty.contains(49, 59));
        assert_ne!(r.backbuffer().pixel(50, 60), r.snapshot().pixel(50, 60));

        let second = Rect::new(20, 40, 30, 50);
        let dirty = r.redraw(second);

        // Old border is gone, new one is drawn, dirty spans both
        assert_eq!(r.backbuffer().pixel(150, 160), r.snapshot().pixel(150, 160));
        assert_eq!(r.backbuffer().pixel(50, 60), r.snapshot().pixel(50, 60));
        assert_ne!(r.backbuffer().pixel(20, 40), r.snapshot().pixel(20, 40));
        assert!(dirty.contains(20, 40) && dirty.contains(150, 160));
    }

    #[test]
    fn redraw_dirty_rect_is_bounded_by_decoration() {
        let mut r = renderer(400, 300);
        let dirty = r.redraw(Rect::new(100, 100, 120, 110));
        // Selection plus stroke, widened by the "20x10" label above it
        assert_eq!(dirty, Rect::new(98, 76, 144, 112));
    }

    #[test]
    fn everything_outside_decorations_matches_snapshot() {
        let mut r = renderer(120, 120);
        r.redraw(Rect::new(10, 40, 60, 90));
        r.redraw(Rect::new(30, 50, 100, 110));
        let decoration = r.last_decoration();

        for y in 0..120 {
            for x in 0..120 {
                if !decoration.contains(x, y) {
                    assert_eq!(r.backbuffer().pixel(x, y), r.snapshot().pixel(x, y), "({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn region_bytes_clips_to_canvas() {
        let canvas = snapshot(10, 10);
        let (clip, bytes) = canvas.region_bytes(Rect::new(8, 8, 20, 20)).unwrap();
        assert_eq!(clip, Rect::new(8, 8, 10, 10));
        assert_eq!(bytes.len(), 2 * 2 * 4);
        assert_eq!(&bytes[0..4], &[8, 8, 0x40, 0xFF]);
        assert!(canvas.region_bytes(Rect::new(20, 20, 30, 30)).is_none());
    }
}
