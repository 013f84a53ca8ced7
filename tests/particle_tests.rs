//! Integration tests for the per-frame particle entry point.


use emberfall::particles::{cache, spawn_count, Simulation};
use emberfall::render::strength;
use emberfall::{
    key_position_fraction, render_particles, CacheError, NoteEvent, Particle, PipelineError,
};
use particle_fixtures::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;

// ==================== Cache Codec ====================

#[test]
fn test_cache_round_trip_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ptcls.bin");
    let particles: Vec<Particle> = (0..50)
        .map(|i| {
            let f = i as f64;
            Particle::new(f * 3.1, 119.0 - f * 0.7, f.sin(), -f.cos(), -f / 3.0)
        })
        .collect();

    cache::store(&path, &particles).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 4 + 50 * 40);
    assert_eq!(cache::load(&path).unwrap(), particles);
    assert_eq!(cache::encode(&cache::load(&path).unwrap()).unwrap(), bytes);
}

#[test]
fn test_empty_cache_path_starts_empty() {
    assert!(cache::load(Path::new("")).unwrap().is_empty());
}

// ==================== End-to-end Frame ====================

#[test]
fn test_first_frame_single_note() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("frame_0.bin");
    let notes = [NoteEvent::new(40, -1.0, 100.0)];
    let params = emberfall::ParticleParams {
        pps: 30.0,
        fps: 30,
        radius: Some(3.0),
        ..seeded_params(11)
    };
    let mut pixels = black_frame();

    let report = render_particles(
        &mut pixels,
        WIDTH as i64,
        HEIGHT as i64,
        0,
        Path::new(""),
        &out,
        &notes,
        &params,
    )
    .unwrap();

    // round(1 * uniform(0.5, 2)) is 1 or 2.
    assert!((1..=2).contains(&report.spawned));
    assert_eq!(report.carried, report.spawned);

    let stored = cache::load(&out).unwrap();
    assert_eq!(stored.len(), report.spawned);
    let spawn_x = key_position_fraction(40).unwrap() * WIDTH as f64;
    let spawn_y = HEIGHT as f64 / 2.0;
    for p in &stored {
        assert_eq!(p.birth, 0.0);
        // One step from the spawn point at the launch velocity.
        assert!((p.x - spawn_x).abs() <= params.x_vel);
        assert!(p.y <= spawn_y - params.y_vel / 2.0);
        assert!(p.y >= spawn_y - params.y_vel);
    }
    assert!(pixels.iter().any(|&b| b > 0));
}

#[test]
fn test_no_notes_no_particles() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("frame_0.bin");
    let mut pixels = black_frame();
    let report = render_particles(
        &mut pixels,
        WIDTH as i64,
        HEIGHT as i64,
        0,
        Path::new(""),
        &out,
        &[],
        &seeded_params(1),
    )
    .unwrap();

    assert_eq!(report.spawned, 0);
    assert!(cache::load(&out).unwrap().is_empty());
    assert_eq!(std::fs::read(&out).unwrap(), 0i32.to_le_bytes());
    assert!(pixels.iter().all(|&b| b == 0));
}

// ==================== Lifecycle ====================

#[test]
fn test_ages_never_exceed_lifetime_across_chain() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let params = seeded_params(3);
    let lifetime_frames = params.lifetime * params.fps as f64;
    let notes = phrase();

    let mut cache_in = std::path::PathBuf::new();
    let mut seen_particles = false;
    for frame in 0..160i64 {
        let cache_out = dir.path().join(format!("{}.bin", frame));
        let mut pixels = black_frame();
        render_particles(
            &mut pixels,
            WIDTH as i64,
            HEIGHT as i64,
            frame,
            &cache_in,
            &cache_out,
            &notes,
            &params,
        )
        .unwrap();

        let stored = cache::load(&cache_out).unwrap();
        seen_particles |= !stored.is_empty();
        for p in &stored {
            let age = frame as f64 - p.birth;
            assert!(age >= 0.0, "particle born after frame {}", frame);
            assert!(age <= lifetime_frames, "expired particle kept at {}", frame);
            assert!(p.x >= 0.0 && p.x < WIDTH as f64);
            assert!(p.y >= 0.0 && p.y < HEIGHT as f64);
        }
        cache_in = cache_out;
    }

    assert!(seen_particles);
    // Last note ends at 50 and lifetime is 90 frames.
    assert!(cache::load(&cache_in).unwrap().is_empty());
}

#[test]
fn test_out_of_bounds_particle_drawn_but_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let cache_in = dir.path().join("in.bin");
    let cache_out = dir.path().join("out.bin");
    let y = 60.0;
    cache::store(
        &cache_in,
        &[
            Particle::new(0.5, y, -2.0, 0.0, 4.0),
            Particle::new(80.0, y, 0.0, 0.0, 4.0),
        ],
    )
    .unwrap();

    let params = emberfall::ParticleParams {
        radius: Some(4.0),
        ..still_params()
    };
    let mut pixels = black_frame();
    let report = render_particles(
        &mut pixels,
        WIDTH as i64,
        HEIGHT as i64,
        5,
        &cache_in,
        &cache_out,
        &[],
        &params,
    )
    .unwrap();

    assert_eq!(report.drawn, 2);
    assert_eq!(report.carried, 1);
    assert_eq!(cache::load(&cache_out).unwrap()[0].x, 80.0);

    // The retiring particle sits at x = -1.5 but its disc reaches column 0.
    let idx = (60 * WIDTH as usize) * 3;
    assert!(pixels[idx] > 0);
}

#[test]
fn test_strength_decay() {
    assert_eq!(strength(0.0, 45.0), 1.0);
    assert_eq!(strength(45.0, 45.0), 0.0);
    let values: Vec<f64> = (0..=45).map(|a| strength(a as f64, 45.0)).collect();
    assert!(values.windows(2).all(|w| w[1] < w[0]));
}

#[test]
fn test_spawn_counts_stay_in_jitter_range() {
    let params = emberfall::ParticleParams {
        pps: 10.0,
        fps: 30,
        ..Default::default()
    };
    let rates = params.per_frame();
    let lo = (rates.particles_per_frame * 0.5).round() as usize;
    let hi = (rates.particles_per_frame * 2.0).round() as usize;

    let sim = Simulation::new(WIDTH, HEIGHT, rates);
    let notes = [NoteEvent::new(44, 0.0, 61.0)];
    let run = |seed| {
        let mut rng = StdRng::seed_from_u64(seed);
        (1..=60)
            .map(|frame| {
                let mut particles = Vec::new();
                sim.spawn(&mut particles, frame, &notes, &mut rng).unwrap()
            })
            .collect::<Vec<_>>()
    };

    let counts = run(21);
    assert!(counts.iter().all(|&n| lo <= n && n <= hi));
    assert_eq!(counts, run(21));

    let mut rng = StdRng::seed_from_u64(21);
    for _ in 0..200 {
        let n = spawn_count(&mut rng, 10.0);
        assert!((5..=20).contains(&n));
    }
}

// ==================== Failure Handling ====================

#[test]
fn test_corrupt_cache_aborts_frame() {
    let dir = tempfile::tempdir().unwrap();
    let cache_in = dir.path().join("in.bin");
    let cache_out = dir.path().join("out.bin");
    let mut bytes = cache::encode(&[Particle::new(10.0, 10.0, 0.0, 0.0, 0.0)]).unwrap();
    bytes[0] = 9;
    std::fs::write(&cache_in, bytes).unwrap();

    let mut pixels = vec![7u8; (WIDTH * HEIGHT * 3) as usize];
    let err = render_particles(
        &mut pixels,
        WIDTH as i64,
        HEIGHT as i64,
        1,
        &cache_in,
        &cache_out,
        &phrase(),
        &seeded_params(1),
    )
    .unwrap_err();

    assert!(matches!(err, PipelineError::Cache(CacheError::Corrupt { .. })));
    assert!(pixels.iter().all(|&b| b == 7));
    assert!(!cache_out.exists());
}

#[test]
fn test_unwritable_cache_leaves_frame_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let cache_out = dir.path().join("missing").join("out.bin");
    let mut pixels = black_frame();
    let err = render_particles(
        &mut pixels,
        WIDTH as i64,
        HEIGHT as i64,
        5,
        Path::new(""),
        &cache_out,
        &phrase(),
        &seeded_params(1),
    )
    .unwrap_err();

    assert!(matches!(err, PipelineError::Cache(CacheError::WriteFailed { .. })));
    assert!(pixels.iter().all(|&b| b == 0));
}

#[test]
fn test_invalid_dimensions_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let cache_out = dir.path().join("out.bin");
    let mut pixels = black_frame();
    for (w, h) in [(0, HEIGHT as i64), (WIDTH as i64, -1), (WIDTH as i64 + 1, HEIGHT as i64)] {
        let err = render_particles(
            &mut pixels,
            w,
            h,
            0,
            Path::new(""),
            &cache_out,
            &[],
            &seeded_params(1),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Frame(_)));
    }
    assert!(!cache_out.exists());
}

#[test]
fn test_invalid_key_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let cache_out = dir.path().join("out.bin");
    let mut pixels = black_frame();
    let err = render_particles(
        &mut pixels,
        WIDTH as i64,
        HEIGHT as i64,
        0,
        Path::new(""),
        &cache_out,
        &[NoteEvent::new(88, -5.0, 5.0)],
        &seeded_params(1),
    )
    .unwrap_err();

    assert!(matches!(err, PipelineError::Key(_)));
    assert!(!cache_out.exists());
}

#[test]
fn test_failed_frame_keeps_existing_cache_out() {
    let dir = tempfile::tempdir().unwrap();
    let cache_in = dir.path().join("in.bin");
    let cache_out = dir.path().join("out.bin");
    std::fs::write(&cache_in, [9u8, 0, 0, 0, 1, 2]).unwrap();
    cache::store(&cache_out, &[Particle::new(20.0, 30.0, 1.0, -1.0, 2.0)]).unwrap();
    let previous = std::fs::read(&cache_out).unwrap();

    let mut pixels = black_frame();
    let err = render_particles(
        &mut pixels,
        WIDTH as i64,
        HEIGHT as i64,
        3,
        &cache_in,
        &cache_out,
        &phrase(),
        &seeded_params(1),
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::Cache(CacheError::Corrupt { .. })));
    assert_eq!(std::fs::read(&cache_out).unwrap(), previous);

    let err = render_particles(
        &mut pixels,
        WIDTH as i64,
        HEIGHT as i64,
        3,
        Path::new(""),
        &cache_out,
        &[NoteEvent::new(30, 0.0, 9.0), NoteEvent::new(88, 0.0, 9.0)],
        &seeded_params(1),
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::Key(_)));
    assert_eq!(std::fs::read(&cache_out).unwrap(), previous);
    assert!(pixels.iter().all(|&b| b == 0));
}

#[test]
fn test_reversed_note_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let cache_out = dir.path().join("out.bin");
    let mut pixels = black_frame();
    let report = render_particles(
        &mut pixels,
        WIDTH as i64,
        HEIGHT as i64,
        5,
        Path::new(""),
        &cache_out,
        &[NoteEvent::new(30, 10.0, 0.0)],
        &seeded_params(1),
    )
    .unwrap();
    assert_eq!(report.spawned, 0);
}
