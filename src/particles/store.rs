//! Snapshot stores: where the particle state lives between frames.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::cache::{self, CacheError};
use super::Particle;

/// Particle state handed from one frame to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationState {
    pub particles: Vec<Particle>,
}

impl SimulationState {
    pub fn new(particles: Vec<Particle>) -> Self {
        Self { particles }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

/// Backend persisting the state written after each frame.
///
/// `load(frame)` returns what `store(frame, ..)` wrote. Callers must serialize
/// access per note track; stores do no locking.
pub trait SnapshotStore {
    /// State stored after `frame`.
    fn load(&self, frame: i64) -> Result<SimulationState, CacheError>;

    /// Persist the state left after rendering `frame`.
    fn store(&mut self, frame: i64, state: &SimulationState) -> Result<(), CacheError>;

    /// Whether a state exists for `frame`.
    fn contains(&self, frame: i64) -> bool;
}

/// One cache file per frame in a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache file holding the state after `frame`.
    pub fn path_for(&self, frame: i64) -> PathBuf {
        self.dir.join(format!("ptcls_{}.bin", frame))
    }
}

impl SnapshotStore for FileStore {
    fn load(&self, frame: i64) -> Result<SimulationState, CacheError> {
        cache::load(&self.path_for(frame)).map(SimulationState::new)
    }

    fn store(&mut self, frame: i64, state: &SimulationState) -> Result<(), CacheError> {
        cache::store(&self.path_for(frame), &state.particles)
    }

    fn contains(&self, frame: i64) -> bool {
        self.path_for(frame).is_file()
    }
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    states: HashMap<i64, SimulationState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self, frame: i64) -> Result<SimulationState, CacheError> {
        self.states
            .get(&frame)
            .cloned()
            .ok_or_else(|| CacheError::Corrupt {
                path: PathBuf::from(format!("memory:{}", frame)),
                reason: "no state stored for frame".to_string(),
            })
    }

    fn store(&mut self, frame: i64, state: &SimulationState) -> Result<(), CacheError> {
        self.states.insert(frame, state.clone());
        Ok(())
    }

    fn contains(&self, frame: i64) -> bool {
        self.states.contains_key(&frame)
    }
}
