//! Per-frame entry point and frame-sequence driver.
//!
//! Each frame invocation loads the previous particle snapshot, advances the
//! simulation one step, draws every integrated particle, and persists the
//! survivors for the next invocation. Invocations for one note track must
//! run in frame order; nothing here detects concurrent or out-of-order use.

mod sequence;

pub use sequence::{SequenceConfig, SequenceRenderer};

use std::path::Path;

use crate::keyboard::{check_key, KeyError};
use crate::notes::NoteEvent;
use crate::particles::{
    cache, frame_rng, CacheError, FrameStep, ParamsError, ParticleParams, Simulation,
    SimulationState,
};
use crate::render::{FrameError, RgbFrame, VisibilityField};

/// Errors that can occur rendering a frame.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("Parameter error: {0}")]
    Params(#[from] ParamsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What one frame produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub frame: i64,
    pub spawned: usize,
    /// Particles drawn with non-zero strength.
    pub drawn: usize,
    /// Particles written to the next snapshot.
    pub carried: usize,
}

/// The ember effect for a fixed set of parameters.
#[derive(Debug, Clone)]
pub struct ParticleEffect {
    params: ParticleParams,
}

impl ParticleEffect {
    pub fn new(params: ParticleParams) -> Result<Self, PipelineError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &ParticleParams {
        &self.params
    }

    /// Advance the simulation and compute the overlay without touching the
    /// pixel buffer. Nothing observable happens until the caller composites.
    pub fn prepare(
        &self,
        width: u32,
        height: u32,
        frame: i64,
        notes: &[NoteEvent],
        prior: SimulationState,
    ) -> Result<(FrameStep, VisibilityField, usize), PipelineError> {
        for note in notes {
            check_key(note.key as i64)?;
        }

        let rates = self.params.per_frame();
        let sim = Simulation::new(width, height, rates).with_max_particles(self.params.max_particles);
        let step = match self.params.seed {
            Some(seed) => sim.step(prior.particles, frame, notes, &mut frame_rng(seed, frame))?,
            None => sim.step(prior.particles, frame, notes, &mut rand::rng())?,
        };

        let mut field = VisibilityField::new(width, height);
        let drawn = field.draw_particles(
            &step.rendered,
            frame as f64,
            rates.lifetime,
            self.params.radius_for_width(width),
        );

        Ok((step, field, drawn))
    }

    /// Render one frame onto `pixels` from an in-memory prior state, returning
    /// the state for the next frame.
    pub fn render_frame(
        &self,
        pixels: &mut RgbFrame<'_>,
        frame: i64,
        notes: &[NoteEvent],
        prior: SimulationState,
    ) -> Result<(SimulationState, FrameReport), PipelineError> {
        let (step, field, drawn) =
            self.prepare(pixels.width(), pixels.height(), frame, notes, prior)?;
        field.composite(pixels);

        let report = FrameReport {
            frame,
            spawned: step.spawned,
            drawn,
            carried: step.surviving.len(),
        };
        Ok((SimulationState::new(step.surviving), report))
    }
}

/// Render the ember overlay for one frame, chaining state through cache files.
///
/// `cache_in` is the previous frame's output, or an empty path on the first
/// frame. The new snapshot is written atomically to `cache_out`. On any error
/// the pixel buffer is left untouched and no cache file is written.
#[allow(clippy::too_many_arguments)]
pub fn render_particles(
    pixels: &mut [u8],
    width: i64,
    height: i64,
    frame: i64,
    cache_in: &Path,
    cache_out: &Path,
    notes: &[NoteEvent],
    params: &ParticleParams,
) -> Result<FrameReport, PipelineError> {
    let mut image = RgbFrame::new(pixels, width, height)?;
    let effect = ParticleEffect::new(params.clone())?;

    let prior = SimulationState::new(cache::load(cache_in)?);
    let (step, field, drawn) = effect.prepare(image.width(), image.height(), frame, notes, prior)?;

    // Persist before compositing so a failed write leaves the frame as it was.
    cache::store(cache_out, &step.surviving)?;
    field.composite(&mut image);

    Ok(FrameReport {
        frame,
        spawned: step.spawned,
        drawn,
        carried: step.surviving.len(),
    })
}
