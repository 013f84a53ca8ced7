//! Example: Render embers for a synthetic phrase to PNG frames.
//!
//! Particle state is chained through per-frame cache files, exactly as a host
//! driving one invocation per frame would do.
//!
//! Run with:
//!     RUST_LOG=info cargo run --example render_sequence [params.json]

use anyhow::Context;
use emberfall::{FileStore, NoteEvent, ParticleEffect, ParticleParams, SequenceConfig, SequenceRenderer};
use std::path::Path;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let params = match std::env::args().nth(1) {
        Some(path) => ParticleParams::from_json_file(&path)
            .with_context(|| format!("loading parameters from {}", path))?,
        None => ParticleParams {
            seed: Some(2022),
            radius: Some(2.5),
            ..Default::default()
        },
    };

    // C major arpeggio, half a second per note, overlapping.
    let fps = params.fps as f64;
    let notes: Vec<NoteEvent> = [39u8, 43, 46, 51, 46, 43, 39]
        .iter()
        .enumerate()
        .map(|(i, &key)| {
            let start = i as f64 * fps / 2.0;
            NoteEvent::new(key, start, start + fps)
        })
        .collect();

    let out_dir = Path::new("ember_frames");
    let cache_dir = out_dir.join("cache");
    std::fs::create_dir_all(&cache_dir)?;

    let config = SequenceConfig::for_notes(&notes, 640, 360, params.fps, 0.5, 2.0);
    println!(
        "Rendering frames {}..{} at {}x{}",
        config.frame_start, config.frame_end, config.width, config.height
    );

    let effect = ParticleEffect::new(params)?;
    let mut renderer = SequenceRenderer::new(effect, FileStore::new(&cache_dir), config.clone());

    let progress = |p: f32| {
        if (p * 100.0) as u32 % 10 == 0 {
            println!("  Progress: {:.0}%", p * 100.0);
        }
    };

    let reports = renderer.render(
        &notes,
        |frame, img| {
            let path = out_dir.join(format!("frame_{:05}.png", frame - config.frame_start));
            image::save_buffer(
                &path,
                img.as_bytes(),
                img.width(),
                img.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(std::io::Error::other)
        },
        Some(&progress),
    )?;

    let peak = reports.iter().map(|r| r.carried).max().unwrap_or(0);
    println!("\nDone! {} frames in {}", reports.len(), out_dir.display());
    println!("Peak live particles: {}", peak);

    Ok(())
}
