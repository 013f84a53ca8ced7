//! Keyboard geometry and frame-coordinate mapping.
//!
//! Every effect positions itself relative to an 88-key piano drawn across the
//! full width of the lower half of the frame. This module converts key numbers
//! and event frames into pixel coordinates:
//! - Horizontal key centres and extents
//! - Particle spawn points on the keyboard line
//! - Vertical position of a falling note event

use thiserror::Error;

/// Number of keys on the keyboard.
pub const NUM_KEYS: u8 = 88;

/// Number of white keys on the keyboard.
pub const NUM_WHITE_KEYS: u32 = 52;

/// Errors raised by the coordinate mapper.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyError {
    #[error("Key {0} is outside the keyboard range 0..=87")]
    InvalidKey(i64),
}

/// Reject keys outside `0..=87`.
pub fn check_key(key: i64) -> Result<u8, KeyError> {
    if (0..NUM_KEYS as i64).contains(&key) {
        Ok(key as u8)
    } else {
        Err(KeyError::InvalidKey(key))
    }
}

/// Whether the key is white. Key 0 is the lowest A.
pub fn is_white_key(key: u8) -> bool {
    !matches!(key % 12, 1 | 4 | 6 | 9 | 11)
}

/// Position of the centre of the key along the keyboard.
///
/// Returns a fraction from 0 (left edge of the first key) to 1 (right edge of
/// the last). Adjacent white keys are a full white width apart; a step that
/// touches a black key is half a white width.
pub fn key_position_fraction(key: u8) -> Result<f64, KeyError> {
    let key = check_key(key as i64)?;
    let white_width = 1.0 / NUM_WHITE_KEYS as f64;

    let mut pos = 0.0;
    let mut last_white = false;
    for k in 0..=key {
        let white = is_white_key(k);
        if white && last_white {
            pos += white_width;
        } else {
            pos += white_width / 2.0;
        }
        last_white = white;
    }

    Ok(pos)
}

/// X coordinate where particles for `key` are emitted.
pub fn spawn_x(key: u8, width: u32) -> Result<f64, KeyError> {
    Ok(key_position_fraction(key)? * width as f64)
}

/// Y coordinate of the keyboard line. The keyboard occupies the lower half.
pub fn spawn_y(height: u32) -> f64 {
    height as f64 / 2.0
}

/// Left and right pixel coordinates of a key.
///
/// White keys are `width / 52` wide; black keys are that times
/// `black_width_fac`.
pub fn key_bounds(key: u8, width: u32, black_width_fac: f64) -> Result<(f64, f64), KeyError> {
    let center = spawn_x(key, width)?;
    let white_width = width as f64 / NUM_WHITE_KEYS as f64;
    let key_width = if is_white_key(key) {
        white_width
    } else {
        white_width * black_width_fac
    };
    let half = key_width / 2.0;

    Ok((center - half, center + half))
}

/// Vertical pixel coordinate of a note event falling toward the keyboard.
///
/// `speed` is in half-screens per second. At `frame == event_frame` the event
/// sits exactly on the keyboard line; earlier frames place it above.
pub fn event_y(event_frame: f64, frame: f64, height: u32, fps: u32, speed: f64) -> f64 {
    let half = height as f64 / 2.0;
    let px_per_frame = speed * half / fps as f64;
    half + px_per_frame * (frame - event_frame)
}

/// X coordinates of the octave separator lines, one left of every C.
pub fn octave_line_xs(width: u32) -> Vec<u32> {
    let half_white = 1.0 / NUM_WHITE_KEYS as f64 / 2.0;
    (3..NUM_KEYS)
        .step_by(12)
        .filter_map(|key| key_position_fraction(key).ok())
        .map(|pos| (width as f64 * (pos - half_white)).max(0.0) as u32)
        .collect()
}
