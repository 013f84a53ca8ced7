//! CPU rendering of the particle overlay.
//!
//! This module provides:
//! - A checked view over the host's row-major RGB8 pixel buffer
//! - The per-pixel visibility field particles are drawn into
//! - Compositing of that field onto the frame (mix toward white)

mod overlay;

pub use overlay::{render_overlay, strength, VisibilityField};

use thiserror::Error;

/// Errors raised when wrapping a pixel buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Invalid frame dimensions {width}x{height} for a buffer of {len} bytes")]
    InvalidDimensions { width: i64, height: i64, len: usize },
}

/// Mutable view over an RGB8 frame supplied by the host.
#[derive(Debug)]
pub struct RgbFrame<'a> {
    data: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> RgbFrame<'a> {
    /// Wrap `data` as a `width` x `height` frame, three bytes per pixel.
    pub fn new(data: &'a mut [u8], width: i64, height: i64) -> Result<Self, FrameError> {
        let invalid = FrameError::InvalidDimensions {
            width,
            height,
            len: data.len(),
        };
        if width <= 0 || height <= 0 || width > u32::MAX as i64 || height > u32::MAX as i64 {
            return Err(invalid);
        }
        let expected = (width as u64)
            .checked_mul(height as u64)
            .and_then(|px| px.checked_mul(3));
        if expected != Some(data.len() as u64) {
            return Err(invalid);
        }

        Ok(Self {
            data,
            width: width as u32,
            height: height as u32,
        })
    }

    /// Wrap an `image` buffer.
    pub fn from_image(img: &'a mut image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            data: img,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 3
    }

    pub fn get(&self, x: u32, y: u32) -> [u8; 3] {
        let i = self.index(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    pub fn set(&mut self, x: u32, y: u32, color: [u8; 3]) {
        let i = self.index(x, y);
        self.data[i..i + 3].copy_from_slice(&color);
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.data
    }
}

/// Linear mix of two colors; `fac` 0 keeps `a`, 1 gives `b`.
pub fn mix_colors(a: [u8; 3], b: [u8; 3], fac: f64) -> [u8; 3] {
    let fac = fac.clamp(0.0, 1.0);
    let mut out = [0u8; 3];
    for c in 0..3 {
        let v = a[c] as f64 + (b[c] as f64 - a[c] as f64) * fac;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}
