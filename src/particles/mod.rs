//! Ember particle simulation.
//!
//! This module provides:
//! - The fixed-layout particle record
//! - The binary cache codec carrying state between frame invocations
//! - Snapshot stores (per-frame files, in-memory)
//! - Physical parameters and their per-frame conversion
//! - The lifecycle engine: spawn, integrate, retire

pub mod cache;
pub mod params;
pub mod particle;
pub mod simulation;
pub mod store;

// Re-export commonly used types
pub use cache::CacheError;
pub use params::{FrameRates, ParamsError, ParticleParams};
pub use particle::Particle;
pub use simulation::{frame_rng, spawn_count, FrameStep, Simulation};
pub use store::{FileStore, MemoryStore, SimulationState, SnapshotStore};
