//! PNG encoding for captured surfaces

use crate::{ExportError, ExportResult};
use capture::frame::BYTES_PER_PIXEL;
use capture::BitmapSurface;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

/// Swap the red and blue channels in place (BGRA <-> RGBA).
///
/// Works on four pixels at a time; a trailing partial batch is finished
/// pixel by pixel.
pub fn swap_red_blue(pixels: &mut [u8]) {
    let mut batches = pixels.chunks_exact_mut(4 * BYTES_PER_PIXEL);
    for batch in &mut batches {
        batch.swap(0, 2);
        batch.swap(4, 6);
        batch.swap(8, 10);
        batch.swap(12, 14);
    }
    for pixel in batches.into_remainder().chunks_exact_mut(BYTES_PER_PIXEL) {
        pixel.swap(0, 2);
    }
}

/// Encode tightly packed RGBA8 rows as a PNG
pub fn encode_png(width: u32, height: u32, rgba: &[u8]) -> ExportResult<Vec<u8>> {
    let expected = width as usize * height as usize * BYTES_PER_PIXEL;
    if rgba.len() != expected {
        return Err(ExportError::BufferSize {
            expected,
            actual: rgba.len(),
        });
    }

    let mut out = Vec::new();
    PngEncoder::new(&mut out).write_image(rgba, width, height, ExtendedColorType::Rgba8)?;
    Ok(out)
}

/// Read a surface back and encode it
pub fn encode_surface(bitmap: &BitmapSurface) -> ExportResult<Vec<u8>> {
    let mut pixels = bitmap.read_pixels()?;
    swap_red_blue(&mut pixels);
    encode_png(bitmap.width(), bitmap.height(), &pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_covers_batches_and_remainder() {
        // 5 pixels: one full batch of 4 plus one left over
        let mut pixels: Vec<u8> = (0..5u8).flat_map(|i| [i, 100 + i, 200 + i, 255]).collect();
        swap_red_blue(&mut pixels);
        for (i, px) in pixels.chunks_exact(4).enumerate() {
            let i = i as u8;
            assert_eq!(px, [200 + i, 100 + i, i, 255]);
        }
    }

    #[test]
    fn encode_rejects_short_buffer() {
        let err = encode_png(2, 2, &[0u8; 12]).unwrap_err();
        assert!(matches!(
            err,
            ExportError::BufferSize {
                expected: 16,
                actual: 12
            }
        ));
    }

    #[test]
    fn encoded_surface_decodes_with_original_colors() {
        let bgra = vec![10, 20, 30, 255, 40, 50, 60, 128];
        let bitmap = BitmapSurface::from_bgra(2, 1, bgra).unwrap();
        let png = encode_surface(&bitmap).unwrap();

        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert_eq!(decoded.get_pixel(0, 0).0, [30, 20, 10, 255]);
        assert_eq!(decoded.get_pixel(1, 0).0, [60, 50, 40, 128]);
    }
}
