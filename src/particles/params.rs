//! Physical parameters of the ember simulation.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on `pps / fps`, the mean emission per held key per frame.
pub const MAX_PARTICLES_PER_FRAME: f64 = 100_000.0;

/// Errors loading or validating parameters.
#[derive(Error, Debug)]
pub enum ParamsError {
    #[error("Failed to read parameter file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse parameters: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid parameter {name}: {value}")]
    Invalid { name: &'static str, value: f64 },
}

/// Parameters for the particle effect, in per-second units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleParams {
    /// Output frame rate.
    pub fps: u32,
    /// Particles emitted per second for each held key.
    pub pps: f64,
    /// Fraction of velocity kept after one second of drag.
    pub air_resist: f64,
    /// Nominal particle lifetime in seconds.
    pub lifetime: f64,
    /// Maximum horizontal launch speed, pixels per frame.
    pub x_vel: f64,
    /// Maximum upward launch speed, pixels per frame.
    pub y_vel: f64,
    /// Wind acceleration, pixels per frame per second.
    pub wind_strength: f64,
    /// Buoyancy of a fresh particle, pixels per frame per second.
    pub heat_strength: f64,
    /// Downward acceleration, pixels per frame per second.
    pub gravity: f64,
    /// Radius of a fresh particle in pixels. Defaults to `width / 750`.
    pub radius: Option<f64>,
    /// Upper bound on persisted particles; the oldest are evicted first.
    pub max_particles: Option<usize>,
    /// Seed for reproducible spawning. `None` draws from the thread RNG.
    pub seed: Option<u64>,
}

impl Default for ParticleParams {
    fn default() -> Self {
        Self {
            fps: 30,
            pps: 30.0,
            air_resist: 0.2,
            lifetime: 3.0,
            x_vel: 1.5,
            y_vel: 4.0,
            wind_strength: 2.0,
            heat_strength: 1.0,
            gravity: 1.0,
            radius: None,
            max_particles: None,
            seed: None,
        }
    }
}

impl ParticleParams {
    /// Parse parameters from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ParamsError> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Read parameters from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ParamsError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check every value is usable by the unit conversion and integrator.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let invalid = |name, value| Err(ParamsError::Invalid { name, value });

        if self.fps == 0 {
            return invalid("fps", 0.0);
        }
        let finite = [
            ("pps", self.pps),
            ("air_resist", self.air_resist),
            ("lifetime", self.lifetime),
            ("x_vel", self.x_vel),
            ("y_vel", self.y_vel),
            ("wind_strength", self.wind_strength),
            ("heat_strength", self.heat_strength),
            ("gravity", self.gravity),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return invalid(name, value);
            }
        }
        if self.pps < 0.0 || self.pps / self.fps as f64 > MAX_PARTICLES_PER_FRAME {
            return invalid("pps", self.pps);
        }
        if self.lifetime <= 0.0 {
            return invalid("lifetime", self.lifetime);
        }
        if self.air_resist <= 0.0 {
            return invalid("air_resist", self.air_resist);
        }
        if let Some(radius) = self.radius {
            if !radius.is_finite() || radius < 0.0 {
                return invalid("radius", radius);
            }
        }
        Ok(())
    }

    /// Convert per-second rates into per-frame quantities.
    pub fn per_frame(&self) -> FrameRates {
        let fps = self.fps as f64;
        FrameRates {
            fps,
            particles_per_frame: self.pps / fps,
            air_resist: self.air_resist.powf(1.0 / fps),
            lifetime: self.lifetime * fps,
            x_vel: self.x_vel,
            y_vel: self.y_vel,
            wind_strength: self.wind_strength / fps,
            heat_strength: self.heat_strength / (fps / 2.0),
            gravity: self.gravity / fps,
        }
    }

    /// Base particle radius for a frame of the given width.
    pub fn radius_for_width(&self, width: u32) -> f64 {
        self.radius.unwrap_or(width as f64 / 750.0)
    }
}

/// Parameters converted to per-frame units, computed once per invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRates {
    pub fps: f64,
    pub particles_per_frame: f64,
    /// Velocity multiplier applied each frame.
    pub air_resist: f64,
    /// Lifetime in frames.
    pub lifetime: f64,
    pub x_vel: f64,
    pub y_vel: f64,
    pub wind_strength: f64,
    pub heat_strength: f64,
    pub gravity: f64,
}
