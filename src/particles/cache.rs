//! Particle cache codec.
//!
//! A cache file is the complete particle state at one frame boundary:
//! `i32 count` followed by `count` records of
//! `{f64 x, f64 y, f64 vx, f64 vy, f64 birth}`, little-endian, no padding.
//! It is the only thing carried from one frame's invocation to the next.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

use super::Particle;

/// Size of the count header in bytes.
pub const HEADER_SIZE: usize = 4;

/// Size of one particle record in bytes.
pub const RECORD_SIZE: usize = std::mem::size_of::<Particle>();

/// Errors that can occur reading or writing a particle cache.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Particle cache {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Failed to write particle cache {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    fn corrupt(path: &Path, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Count header for `len` particles. Fails if `len` does not fit an `i32`.
fn count_header(len: usize) -> std::io::Result<[u8; HEADER_SIZE]> {
    let count = i32::try_from(len).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} particles do not fit the cache count header", len),
        )
    })?;
    Ok(count.to_le_bytes())
}

/// Byte length of a cache declaring `count` records, if addressable.
fn encoded_len(count: usize) -> Option<usize> {
    count.checked_mul(RECORD_SIZE)?.checked_add(HEADER_SIZE)
}

/// Encode a particle set into cache bytes.
pub fn encode(particles: &[Particle]) -> std::io::Result<Vec<u8>> {
    let header = count_header(particles.len())?;
    let mut out = Vec::with_capacity(encoded_len(particles.len()).unwrap_or(HEADER_SIZE));
    out.extend_from_slice(&header);
    for p in particles {
        for field in p.to_fields() {
            out.extend_from_slice(&field.to_le_bytes());
        }
    }
    Ok(out)
}

/// Decode cache bytes. `path` only labels errors.
///
/// Fails if the data is shorter than the header declares. Bytes past the
/// declared records are ignored.
pub fn decode(data: &[u8], path: &Path) -> Result<Vec<Particle>, CacheError> {
    if data.len() < HEADER_SIZE {
        return Err(CacheError::corrupt(
            path,
            format!("{} bytes is too short for the count header", data.len()),
        ));
    }

    let mut header = [0u8; HEADER_SIZE];
    header.copy_from_slice(&data[..HEADER_SIZE]);
    let count = i32::from_le_bytes(header);
    if count < 0 {
        return Err(CacheError::corrupt(path, format!("negative count {}", count)));
    }

    let count = count as usize;
    let expected = encoded_len(count).ok_or_else(|| {
        CacheError::corrupt(path, format!("count {} overflows the address space", count))
    })?;
    if data.len() < expected {
        return Err(CacheError::corrupt(
            path,
            format!(
                "header declares {} particles ({} bytes) but file has {} bytes",
                count,
                expected,
                data.len()
            ),
        ));
    }
    if data.len() > expected {
        log::warn!(
            "Ignoring {} trailing bytes in particle cache {}",
            data.len() - expected,
            path.display()
        );
    }

    let particles = data[HEADER_SIZE..expected]
        .chunks_exact(RECORD_SIZE)
        .map(|rec| {
            let mut fields = [0.0f64; 5];
            for (field, bytes) in fields.iter_mut().zip(rec.chunks_exact(8)) {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(bytes);
                *field = f64::from_le_bytes(buf);
            }
            Particle::from_fields(fields)
        })
        .collect();

    Ok(particles)
}

/// Load the particle set stored at `path`.
///
/// An empty path means there is no previous frame and yields an empty set.
/// A non-empty path that cannot be read is treated as corrupt.
pub fn load(path: &Path) -> Result<Vec<Particle>, CacheError> {
    if path.as_os_str().is_empty() {
        return Ok(Vec::new());
    }

    let data = std::fs::read(path).map_err(|e| CacheError::corrupt(path, e.to_string()))?;
    decode(&data, path)
}

/// Write a fresh cache file at `path`, replacing any existing file.
///
/// The bytes are written to a temporary file in the same directory and
/// renamed over the target, so readers never observe a partial cache.
pub fn store(path: &Path, particles: &[Particle]) -> Result<(), CacheError> {
    let write_failed = |source: std::io::Error| CacheError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if path.as_os_str().is_empty() {
        return Err(write_failed(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "empty cache path",
        )));
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let bytes = encode(particles).map_err(write_failed)?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_failed)?;
    tmp.write_all(&bytes).map_err(write_failed)?;
    tmp.flush().map_err(write_failed)?;
    tmp.persist(path).map_err(|e| write_failed(e.error))?;

    log::debug!("Wrote {} particles to {}", particles.len(), path.display());
    Ok(())
}
