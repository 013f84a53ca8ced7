//! Particle lifecycle: spawn, integrate, retire.
//!
//! One call advances the simulation by exactly one frame. Particles are never
//! flagged as dead; retirement is a filter that splits the integrated list into
//! the set drawn this frame and the set carried into the next.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::params::FrameRates;
use super::Particle;
use crate::keyboard::{self, KeyError, NUM_WHITE_KEYS};
use crate::notes::NoteEvent;

/// Output of one simulation step.
#[derive(Debug, Clone, Default)]
pub struct FrameStep {
    /// Every particle after integration, including those retiring this frame.
    pub rendered: Vec<Particle>,
    /// Particles that stay in bounds and within their lifetime.
    pub surviving: Vec<Particle>,
    /// Particles spawned this frame.
    pub spawned: usize,
}

/// RNG for `frame` derived from a sequence seed.
///
/// The same `(seed, frame)` pair always yields the same stream, so a frame can
/// be replayed from its input cache alone.
pub fn frame_rng(seed: u64, frame: i64) -> StdRng {
    let mixed = seed ^ (frame as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    StdRng::seed_from_u64(mixed)
}

/// Uniform sample in `[a, b)`; degenerate ranges return `a`.
fn uniform<R: Rng + ?Sized>(rng: &mut R, a: f64, b: f64) -> f64 {
    a + (b - a) * rng.random::<f64>()
}

/// Number of particles a held key emits this frame.
pub fn spawn_count<R: Rng + ?Sized>(rng: &mut R, particles_per_frame: f64) -> usize {
    (particles_per_frame * uniform(rng, 0.5, 2.0)).round() as usize
}

/// Wind direction at a point. `x` and `y` are in keyboard units, `t` in seconds.
pub fn wind(x: f64, y: f64, t: f64) -> (f64, f64) {
    let angle = (x + y) * 2.0 + t;
    (angle.cos(), angle.sin())
}

/// Advances particles one frame at a time for a fixed frame size.
#[derive(Debug, Clone)]
pub struct Simulation {
    width: u32,
    height: u32,
    rates: FrameRates,
    max_particles: Option<usize>,
}

impl Simulation {
    pub fn new(width: u32, height: u32, rates: FrameRates) -> Self {
        Self {
            width,
            height,
            rates,
            max_particles: None,
        }
    }

    /// Cap the persisted particle count.
    pub fn with_max_particles(mut self, max: Option<usize>) -> Self {
        self.max_particles = max;
        self
    }

    pub fn rates(&self) -> &FrameRates {
        &self.rates
    }

    /// Emit new particles for every note held at `frame`.
    ///
    /// With a particle cap set, at most that many are emitted per call.
    pub fn spawn<R: Rng + ?Sized>(
        &self,
        particles: &mut Vec<Particle>,
        frame: i64,
        notes: &[NoteEvent],
        rng: &mut R,
    ) -> Result<usize, KeyError> {
        let y = keyboard::spawn_y(self.height);
        let x_vel = self.rates.x_vel;
        let y_vel = self.rates.y_vel;
        let before = particles.len();
        // New particles outlive old ones under the cap, so one frame never
        // needs more than `max` of them.
        let mut budget = self.max_particles.unwrap_or(usize::MAX);

        for note in notes.iter().filter(|n| n.is_active(frame as f64)) {
            let x = keyboard::spawn_x(note.key, self.width)?;
            let count = spawn_count(rng, self.rates.particles_per_frame).min(budget);
            budget -= count;
            for _ in 0..count {
                let vx = uniform(rng, -x_vel, x_vel);
                let vy = uniform(rng, -y_vel, -y_vel / 2.0);
                particles.push(Particle::new(x, y, vx, vy, frame as f64));
            }
        }

        Ok(particles.len() - before)
    }

    /// Move one particle forward by one frame.
    ///
    /// Order matters: position, drag, gravity, wind, then buoyancy.
    pub fn integrate(&self, p: &mut Particle, frame: i64) {
        let r = &self.rates;
        let px_to_coord = NUM_WHITE_KEYS as f64 / self.width as f64;
        let frame = frame as f64;

        p.x += p.vx;
        p.y += p.vy;
        p.vx *= r.air_resist;
        p.vy *= r.air_resist;
        p.vy += r.gravity;

        let (wx, wy) = wind(p.x * px_to_coord, p.y * px_to_coord, frame / r.fps);
        p.vx += wx * r.wind_strength;
        p.vy += wy * r.wind_strength;

        // Goes negative past the nominal lifetime and starts pulling down.
        let heat = 1.0 - p.age(frame) / r.lifetime;
        p.vy -= heat * r.heat_strength;
    }

    /// Run one frame: spawn from held notes, integrate everything, then split
    /// off the survivors.
    pub fn step<R: Rng + ?Sized>(
        &self,
        prior: Vec<Particle>,
        frame: i64,
        notes: &[NoteEvent],
        rng: &mut R,
    ) -> Result<FrameStep, KeyError> {
        let mut particles = prior;
        let spawned = self.spawn(&mut particles, frame, notes, rng)?;

        for p in particles.iter_mut() {
            self.integrate(p, frame);
        }

        let mut surviving: Vec<Particle> = particles
            .iter()
            .filter(|p| p.survives(frame as f64, self.width, self.height, self.rates.lifetime))
            .copied()
            .collect();
        self.evict_oldest(&mut surviving);

        log::debug!(
            "Frame {}: spawned {}, rendering {}, carrying {}",
            frame,
            spawned,
            particles.len(),
            surviving.len()
        );

        Ok(FrameStep {
            rendered: particles,
            surviving,
            spawned,
        })
    }

    fn evict_oldest(&self, particles: &mut Vec<Particle>) {
        let Some(max) = self.max_particles else {
            return;
        };
        if particles.len() <= max {
            return;
        }

        let excess = particles.len() - max;
        particles.sort_by(|a, b| a.birth.total_cmp(&b.birth));
        particles.drain(..excess);
        log::warn!("Particle cap {} reached, evicted {} oldest", max, excess);
    }
}
