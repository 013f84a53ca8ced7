//! Render a contiguous range of frames, chaining particle state through a
//! snapshot store.

use super::{FrameReport, ParticleEffect, PipelineError};
use crate::notes::{last_end_frame, NoteEvent};
use crate::particles::{SimulationState, SnapshotStore};
use crate::render::RgbFrame;

/// Frame range and canvas for a sequence render.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceConfig {
    pub width: u32,
    pub height: u32,
    /// First frame, inclusive. Negative values are lead-in before the first note.
    pub frame_start: i64,
    /// Last frame, exclusive.
    pub frame_end: i64,
    /// Color each frame starts from.
    pub background: [u8; 3],
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            frame_start: 0,
            frame_end: 0,
            background: [0, 0, 0],
        }
    }
}

impl SequenceConfig {
    /// Frame range covering all notes plus margins in seconds on either side.
    pub fn for_notes(
        notes: &[NoteEvent],
        width: u32,
        height: u32,
        fps: u32,
        margin_start: f64,
        margin_end: f64,
    ) -> Self {
        let fps = fps as f64;
        Self {
            width,
            height,
            frame_start: (-fps * margin_start).floor() as i64,
            frame_end: (last_end_frame(notes) + fps * margin_end).ceil() as i64,
            ..Default::default()
        }
    }

    pub fn total_frames(&self) -> usize {
        (self.frame_end - self.frame_start).max(0) as usize
    }
}

/// Drives an effect frame by frame, persisting state after each one.
pub struct SequenceRenderer<S: SnapshotStore> {
    effect: ParticleEffect,
    store: S,
    config: SequenceConfig,
}

impl<S: SnapshotStore> SequenceRenderer<S> {
    pub fn new(effect: ParticleEffect, store: S, config: SequenceConfig) -> Self {
        Self {
            effect,
            store,
            config,
        }
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Render every frame of the sequence.
    pub fn render<F>(
        &mut self,
        notes: &[NoteEvent],
        sink: F,
        progress_callback: Option<&dyn Fn(f32)>,
    ) -> Result<Vec<FrameReport>, PipelineError>
    where
        F: FnMut(i64, &RgbFrame<'_>) -> std::io::Result<()>,
    {
        let start = self.config.frame_start;
        self.resume_from(start, notes, sink, progress_callback)
    }

    /// Render from `frame` to the end of the sequence.
    ///
    /// Unless `frame` is the first frame, the state stored after `frame - 1`
    /// must already exist in the store.
    pub fn resume_from<F>(
        &mut self,
        frame: i64,
        notes: &[NoteEvent],
        mut sink: F,
        progress_callback: Option<&dyn Fn(f32)>,
    ) -> Result<Vec<FrameReport>, PipelineError>
    where
        F: FnMut(i64, &RgbFrame<'_>) -> std::io::Result<()>,
    {
        let config = self.config.clone();
        let frame = frame.max(config.frame_start);
        let mut state = if frame == config.frame_start {
            SimulationState::default()
        } else {
            self.store.load(frame - 1)?
        };

        log::info!(
            "Rendering frames {}..{} ({} carried particles)",
            frame,
            config.frame_end,
            state.len()
        );

        let total = config.total_frames().max(1);
        let pixel_count = config.width as usize * config.height as usize;
        let mut buf = Vec::with_capacity(pixel_count * 3);
        let mut reports = Vec::new();

        for f in frame..config.frame_end {
            buf.clear();
            for _ in 0..pixel_count {
                buf.extend_from_slice(&config.background);
            }
            let mut image = RgbFrame::new(&mut buf, config.width as i64, config.height as i64)?;

            let (next, report) = self.effect.render_frame(&mut image, f, notes, state)?;
            self.store.store(f, &next)?;
            sink(f, &image)?;

            state = next;
            reports.push(report);

            if let Some(callback) = progress_callback {
                let done = (f - config.frame_start + 1) as f32;
                callback(done / total as f32);
            }
        }

        Ok(reports)
    }
}
