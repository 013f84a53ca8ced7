//! Note events and the flat note blob handed over by the host.
//!
//! The blob layout is `i32 count` followed by `count` records of
//! `{f64 start, f64 end, u8 note, u8 velocity}`, 18 bytes each, no padding,
//! little-endian.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keyboard::{check_key, KeyError};

/// MIDI note number of the lowest piano key.
pub const MIDI_NOTE_OFFSET: u8 = 21;

/// Size of one encoded note record in bytes.
pub const NOTE_RECORD_SIZE: usize = 2 * 8 + 2;

/// Errors that can occur while decoding notes.
#[derive(Error, Debug)]
pub enum NoteError {
    #[error("Failed to read note file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Note blob truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Note blob declares a negative count: {0}")]
    NegativeCount(i32),

    #[error("Too many notes for one blob: {0}")]
    TooMany(usize),

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// One held key: the interval of frames during which it is down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Key index, 0..=87.
    pub key: u8,
    /// Frame the key is pressed.
    pub start_frame: f64,
    /// Frame the key is released.
    pub end_frame: f64,
    /// MIDI velocity.
    pub velocity: u8,
}

impl NoteEvent {
    pub fn new(key: u8, start_frame: f64, end_frame: f64) -> Self {
        Self {
            key,
            start_frame,
            end_frame,
            velocity: 64,
        }
    }

    /// Build from a MIDI note number (21 = lowest A).
    pub fn from_midi(
        note: u8,
        velocity: u8,
        start_frame: f64,
        end_frame: f64,
    ) -> Result<Self, KeyError> {
        let key = check_key(note as i64 - MIDI_NOTE_OFFSET as i64)?;
        Ok(Self {
            key,
            start_frame,
            end_frame,
            velocity,
        })
    }

    /// Whether the key is held at `frame`. The interval is open on both ends,
    /// so reversed intervals are never active.
    pub fn is_active(&self, frame: f64) -> bool {
        self.start_frame < frame && frame < self.end_frame
    }

    /// Length of the note in frames.
    pub fn duration(&self) -> f64 {
        self.end_frame - self.start_frame
    }
}

/// Decode a note blob. Trailing bytes past the declared count are ignored.
pub fn decode_notes(data: &[u8]) -> Result<Vec<NoteEvent>, NoteError> {
    let header: [u8; 4] = data
        .get(..4)
        .and_then(|h| h.try_into().ok())
        .ok_or(NoteError::Truncated {
            expected: 4,
            actual: data.len(),
        })?;
    let count = i32::from_le_bytes(header);
    if count < 0 {
        return Err(NoteError::NegativeCount(count));
    }

    let count = count as usize;
    let expected = blob_len(count).ok_or(NoteError::Truncated {
        expected: usize::MAX,
        actual: data.len(),
    })?;
    if data.len() < expected {
        return Err(NoteError::Truncated {
            expected,
            actual: data.len(),
        });
    }

    data[4..expected]
        .chunks_exact(NOTE_RECORD_SIZE)
        .map(|rec| {
            let start = le_f64(&rec[0..8]);
            let end = le_f64(&rec[8..16]);
            let key = check_key(rec[16] as i64)?;
            Ok(NoteEvent {
                key,
                start_frame: start,
                end_frame: end,
                velocity: rec[17],
            })
        })
        .collect()
}

fn le_f64(bytes: &[u8]) -> f64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    f64::from_le_bytes(buf)
}

fn blob_count(len: usize) -> Result<i32, NoteError> {
    i32::try_from(len).map_err(|_| NoteError::TooMany(len))
}

fn blob_len(count: usize) -> Option<usize> {
    count.checked_mul(NOTE_RECORD_SIZE)?.checked_add(4)
}

/// Encode notes into a blob readable by [`decode_notes`].
pub fn encode_notes(notes: &[NoteEvent]) -> Result<Vec<u8>, NoteError> {
    let count = blob_count(notes.len())?;
    let mut out = Vec::with_capacity(blob_len(notes.len()).unwrap_or(4));
    out.extend_from_slice(&count.to_le_bytes());
    for note in notes {
        out.extend_from_slice(&note.start_frame.to_le_bytes());
        out.extend_from_slice(&note.end_frame.to_le_bytes());
        out.push(note.key);
        out.push(note.velocity);
    }
    Ok(out)
}

/// Read a note blob from disk.
pub fn read_notes_file(path: &Path) -> Result<Vec<NoteEvent>, NoteError> {
    let data = std::fs::read(path)?;
    decode_notes(&data)
}

/// Last end frame of any note, or 0 when there are none.
pub fn last_end_frame(notes: &[NoteEvent]) -> f64 {
    notes.iter().map(|n| n.end_frame).fold(0.0, f64::max)
}
