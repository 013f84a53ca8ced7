//! Emberfall Core
//!
//! Per-frame ember particles for piano performance videos.
//!
//! # Features
//!
//! - Keyboard geometry shared by every effect (key centres, spawn points)
//! - Note events and the flat note blob handed over by a host
//! - Particle simulation with spawn, drag, wind, buoyancy and retirement
//! - Binary particle cache carrying state between frame invocations
//! - CPU overlay renderer (soft discs, max-combined, mixed toward white)
//! - Frame-sequence driver over file or in-memory snapshot stores
//! - Python bindings via PyO3 (when `python` feature is enabled)

pub mod keyboard;
pub mod notes;
pub mod particles;
pub mod pipeline;
pub mod render;

// Re-export commonly used types
pub use keyboard::{key_position_fraction, spawn_x, spawn_y, KeyError};
pub use notes::{decode_notes, encode_notes, NoteError, NoteEvent};
pub use particles::{
    CacheError, FileStore, MemoryStore, Particle, ParticleParams, SimulationState, SnapshotStore,
};
pub use pipeline::{
    render_particles, FrameReport, ParticleEffect, PipelineError, SequenceConfig,
    SequenceRenderer,
};
pub use render::{FrameError, RgbFrame};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python_bindings {
    use crate::notes::NoteEvent;
    use crate::particles::ParticleParams;
    use crate::pipeline::{self, PipelineError};
    use pyo3::exceptions::{PyIOError, PyValueError};
    use pyo3::prelude::*;
    use pyo3::types::PyByteArray;
    use std::path::Path;

    fn to_py_err(e: PipelineError) -> PyErr {
        match e {
            PipelineError::Cache(_) | PipelineError::Io(_) => PyIOError::new_err(e.to_string()),
            _ => PyValueError::new_err(e.to_string()),
        }
    }

    /// Simulate and draw particles onto an RGB8 image buffer in place.
    #[pyfunction]
    #[pyo3(signature = (pixels, width, height, frame, cache_in, cache_out, keys, starts, ends, fps=30, pps=30.0, air_resist=0.2, lifetime=3.0, x_vel=1.5, y_vel=4.0, wind_strength=2.0, heat_strength=1.0, gravity=1.0, seed=None))]
    #[allow(clippy::too_many_arguments)]
    fn render_ptcls(
        pixels: &Bound<'_, PyByteArray>,
        width: i64,
        height: i64,
        frame: i64,
        cache_in: &str,
        cache_out: &str,
        keys: Vec<i64>,
        starts: Vec<f64>,
        ends: Vec<f64>,
        fps: u32,
        pps: f64,
        air_resist: f64,
        lifetime: f64,
        x_vel: f64,
        y_vel: f64,
        wind_strength: f64,
        heat_strength: f64,
        gravity: f64,
        seed: Option<u64>,
    ) -> PyResult<usize> {
        if keys.len() != starts.len() || keys.len() != ends.len() {
            return Err(PyValueError::new_err(
                "keys, starts and ends must have the same length",
            ));
        }

        let notes = keys
            .iter()
            .zip(starts.iter().zip(ends.iter()))
            .map(|(&key, (&start, &end))| {
                let key = crate::keyboard::check_key(key)
                    .map_err(|e| PyValueError::new_err(e.to_string()))?;
                Ok(NoteEvent::new(key, start, end))
            })
            .collect::<PyResult<Vec<_>>>()?;

        let params = ParticleParams {
            fps,
            pps,
            air_resist,
            lifetime,
            x_vel,
            y_vel,
            wind_strength,
            heat_strength,
            gravity,
            seed,
            ..Default::default()
        };

        // SAFETY: the GIL is held for the whole call and no Python code runs
        // while the slice is alive, so nothing can resize the bytearray.
        let data = unsafe { pixels.as_bytes_mut() };
        let report = pipeline::render_particles(
            data,
            width,
            height,
            frame,
            Path::new(cache_in),
            Path::new(cache_out),
            &notes,
            &params,
        )
        .map_err(to_py_err)?;

        Ok(report.carried)
    }

    /// Centre of a key as a fraction of the keyboard width.
    #[pyfunction]
    fn key_pos(key: i64) -> PyResult<f64> {
        let key = crate::keyboard::check_key(key).map_err(|e| PyValueError::new_err(e.to_string()))?;
        crate::keyboard::key_position_fraction(key).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Emberfall Python module
    #[pymodule]
    pub fn emberfall(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add("__version__", env!("CARGO_PKG_VERSION"))?;
        m.add_function(wrap_pyfunction!(render_ptcls, m)?)?;
        m.add_function(wrap_pyfunction!(key_pos, m)?)?;
        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python_bindings::*;
