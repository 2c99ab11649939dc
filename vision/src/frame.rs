use nalgebra::Vector2;
use rayon::prelude::*;

use crate::error::VisionError;
use crate::transform::AffineTransform;

pub const OPAQUE_BLACK: u32 = 0xFF00_0000;

/// Owned width x height buffer of packed 0xAARRGGBB pixels. Allocated once
/// and overwritten in place in steady state.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize) -> PixelBuffer {
        PixelBuffer {
            width,
            height,
            pixels: vec![OPAQUE_BLACK; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn get(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: u32) {
        self.pixels[y * self.width + x] = value;
    }

    /// Overwrites the whole buffer from a raw camera delivery. The source
    /// must match the buffer extent exactly; no reallocation happens here.
    pub fn copy_from(&mut self, raw: &[u32]) -> Result<(), VisionError> {
        if raw.len() != self.pixels.len() {
            return Err(VisionError::InvalidGeometry(format!(
                "raw frame has {} pixels, buffer holds {}",
                raw.len(),
                self.pixels.len()
            )));
        }
        self.pixels.copy_from_slice(raw);
        Ok(())
    }
}

/// Populates `dst` from `src` through `transform` (source -> destination).
/// Each destination pixel is inverse-mapped and sampled nearest-neighbor;
/// pixels falling outside the source become opaque black.
pub fn warp_into(
    src: &PixelBuffer,
    dst: &mut PixelBuffer,
    transform: &AffineTransform,
) -> Result<(), VisionError> {
    let inverse = transform.invert()?;
    let (src_w, src_h) = (src.width, src.height);
    let dst_w = dst.width;

    dst.pixels
        .par_chunks_mut(dst_w)
        .enumerate()
        .for_each(|(dy, row)| {
            for (dx, out) in row.iter_mut().enumerate() {
                // Sample at the pixel center.
                let p = inverse.apply(Vector2::new(dx as f32 + 0.5, dy as f32 + 0.5));
                let (sx, sy) = (p.x.floor() as i64, p.y.floor() as i64);
                *out = if sx >= 0 && sy >= 0 && (sx as usize) < src_w && (sy as usize) < src_h {
                    src.pixels[sy as usize * src_w + sx as usize]
                } else {
                    OPAQUE_BLACK
                };
            }
        });

    Ok(())
}

/// Fixed RGB -> gray conversion with the usual luma weights, gray replicated
/// into all three channels, alpha untouched.
pub fn grayscale_in_place(buf: &mut PixelBuffer) {
    buf.pixels.par_iter_mut().for_each(|px| {
        let a = *px & 0xFF00_0000;
        let r = (*px >> 16) & 0xFF;
        let g = (*px >> 8) & 0xFF;
        let b = *px & 0xFF;
        let gray = (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u32;
        let gray = gray.min(255);
        *px = a | (gray << 16) | (gray << 8) | gray;
    });
}
