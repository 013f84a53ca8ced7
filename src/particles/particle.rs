//! The particle record.

/// One ember.
///
/// Laid out as five consecutive `f64`s so a record maps directly onto the
/// 40-byte cache entry.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Particle {
    /// Position in pixels.
    pub x: f64,
    pub y: f64,
    /// Velocity in pixels per frame. Negative `vy` moves up.
    pub vx: f64,
    pub vy: f64,
    /// Frame the particle was spawned.
    pub birth: f64,
}

impl Particle {
    pub fn new(x: f64, y: f64, vx: f64, vy: f64, birth: f64) -> Self {
        Self {
            x,
            y,
            vx,
            vy,
            birth,
        }
    }

    /// Frames since spawn.
    #[inline]
    pub fn age(&self, frame: f64) -> f64 {
        frame - self.birth
    }

    /// Whether the particle belongs in the next snapshot.
    pub fn survives(&self, frame: f64, width: u32, height: u32, lifetime_frames: f64) -> bool {
        self.x >= 0.0
            && self.x < width as f64
            && self.y >= 0.0
            && self.y < height as f64
            && self.age(frame) <= lifetime_frames
    }

    /// Fields in record order.
    pub fn to_fields(self) -> [f64; 5] {
        bytemuck::cast(self)
    }

    pub fn from_fields(fields: [f64; 5]) -> Self {
        bytemuck::cast(fields)
    }
}
