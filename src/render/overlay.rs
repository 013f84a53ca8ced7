//! Particle overlay: soft discs max-combined into a visibility field.

use super::{mix_colors, RgbFrame};
use crate::particles::Particle;

const WHITE: [u8; 3] = [255, 255, 255];

/// Visibility of a particle of the given age, in `[0, 1]`.
///
/// 1 at birth, 0 once the age reaches the lifetime, falling quadratically.
pub fn strength(age: f64, lifetime: f64) -> f64 {
    let t = age / lifetime;
    (1.0 - t * t).clamp(0.0, 1.0)
}

/// Per-pixel grayscale factor in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct VisibilityField {
    width: u32,
    height: u32,
    data: Vec<f64>,
}

impl VisibilityField {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f64 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Raise the pixel to `value` if it is brighter. Overlaps never add up.
    #[inline]
    pub fn max_in(&mut self, x: u32, y: u32, value: f64) {
        let v = &mut self.data[y as usize * self.width as usize + x as usize];
        if value > *v {
            *v = value;
        }
    }

    /// Draw a disc whose value falls linearly from `peak` at the centre to 0
    /// at `radius`.
    pub fn draw_disc(&mut self, cx: f64, cy: f64, radius: f64, peak: f64) {
        if radius <= 0.0 || peak <= 0.0 {
            return;
        }

        let max_x = self.width as f64 - 1.0;
        let max_y = self.height as f64 - 1.0;
        if cx + radius < 0.0 || cy + radius < 0.0 || cx - radius > max_x || cy - radius > max_y {
            return;
        }

        let x_min = (cx - radius).floor().clamp(0.0, max_x) as u32;
        let x_max = (cx + radius).ceil().clamp(0.0, max_x) as u32;
        let y_min = (cy - radius).floor().clamp(0.0, max_y) as u32;
        let y_max = (cy + radius).ceil().clamp(0.0, max_y) as u32;

        for y in y_min..=y_max {
            for x in x_min..=x_max {
                let dist = (x as f64 - cx).hypot(y as f64 - cy);
                let fac = (peak * (1.0 - dist / radius)).clamp(0.0, peak);
                if fac > 0.0 {
                    self.max_in(x, y, fac);
                }
            }
        }
    }

    /// Draw every particle still visible at `frame`.
    pub fn draw_particles(
        &mut self,
        particles: &[Particle],
        frame: f64,
        lifetime: f64,
        base_radius: f64,
    ) -> usize {
        let mut drawn = 0;
        for p in particles {
            let s = strength(p.age(frame), lifetime);
            if s <= 0.0 {
                continue;
            }
            self.draw_disc(p.x, p.y, base_radius * s, s);
            drawn += 1;
        }
        drawn
    }

    /// Mix each pixel of `frame` toward white by its visibility.
    pub fn composite(&self, frame: &mut RgbFrame<'_>) {
        debug_assert_eq!((frame.width(), frame.height()), (self.width, self.height));
        for y in 0..self.height {
            for x in 0..self.width {
                let fac = self.get(x, y);
                if fac > 0.0 {
                    let mixed = mix_colors(frame.get(x, y), WHITE, fac);
                    frame.set(x, y, mixed);
                }
            }
        }
    }
}

/// Draw particles and composite them onto `frame` in one go.
pub fn render_overlay(
    frame: &mut RgbFrame<'_>,
    particles: &[Particle],
    frame_number: f64,
    lifetime: f64,
    base_radius: f64,
) -> usize {
    let mut field = VisibilityField::new(frame.width(), frame.height());
    let drawn = field.draw_particles(particles, frame_number, lifetime, base_radius);
    field.composite(frame);
    drawn
}
