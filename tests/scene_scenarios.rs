//! End-to-end scene timelines driven through the director at 60 Hz.
//!
//! Run with: cargo test --test scene_scenarios

use enso::animation::DrawPhase;
use enso::config::{CurveVariant, SceneConfig};
use enso::curve::generate_path;
use enso::director::{Layer, SceneDirector};
use enso::ribbon::build_ribbon;

const DT: f32 = 1.0 / 60.0;

fn mount_default() -> SceneDirector {
    SceneDirector::mount(SceneConfig::default()).expect("default scene mounts")
}

/// Tick until `done` holds, returning the elapsed time, or None after `limit` ticks.
fn run_until(director: &mut SceneDirector, limit: usize, done: impl Fn(&SceneDirector) -> bool) -> Option<f32> {
    for _ in 0..limit {
        director.advance(DT);
        if done(director) {
            return Some(director.state().elapsed_time);
        }
    }
    None
}

#[test]
fn test_draw_completes_after_delay_plus_two_hundred_ticks() {
    let mut director = mount_default();

    let t = run_until(&mut director, 1000, |d| d.state().draw_progress >= 1.0)
        .expect("draw should complete");

    // 0.6 s delay + 200 steps at 60 Hz.
    assert!((t - 3.93).abs() < 0.05, "draw completed at {}", t);
    assert_eq!(director.state().draw_progress, 1.0);
    assert_eq!(director.state().reveal_progress, 0.0);
}

#[test]
fn test_reveal_waits_for_full_draw() {
    let mut director = mount_default();
    let mut last_draw = 0.0;
    for _ in 0..1000 {
        director.advance(DT);
        let state = *director.state();
        assert!(state.draw_progress >= last_draw, "draw progress went backwards");
        if state.draw_progress < 1.0 {
            assert_eq!(state.reveal_progress, 0.0);
        }
        last_draw = state.draw_progress;
    }
    assert_eq!(director.phase(), DrawPhase::FullyRevealed);
    assert_eq!(director.state().reveal_progress, 1.0);
}

#[test]
fn test_reveal_takes_about_two_seconds() {
    let mut director = mount_default();
    let drawn = run_until(&mut director, 1000, |d| d.state().draw_progress >= 1.0).unwrap();
    let revealed = run_until(&mut director, 1000, |d| d.state().reveal_progress >= 1.0).unwrap();
    let expected = director.config().reveal_duration_secs(60.0);
    assert!((revealed - drawn - expected).abs() < 0.05, "reveal took {}", revealed - drawn);
}

#[test]
fn test_phases_advance_in_order() {
    let mut director = mount_default();
    let mut phases = Vec::new();
    for _ in 0..1000 {
        if let Some(phase) = director.advance(DT) {
            phases.push(phase);
        }
    }
    assert_eq!(
        phases,
        vec![DrawPhase::Drawing, DrawPhase::Drawn, DrawPhase::Revealing, DrawPhase::FullyRevealed]
    );
}

#[test]
fn test_scroll_midway_moves_camera_and_shrinks_foreground() {
    let mut director = mount_default();
    director.on_scroll(400.0, 1000.0);
    assert_eq!(director.state().scroll_progress, 0.5);

    director.advance(DT);
    let snapshot = director.snapshot();
    assert!((snapshot.camera.depth() - 7.0).abs() < 1e-6);
    assert!((snapshot.foreground.scale - 0.925).abs() < 1e-6);
    assert!((snapshot.canvas_opacity - 0.7).abs() < 1e-6);
}

#[test]
fn test_scroll_is_clamped_and_reversible() {
    let mut director = mount_default();
    director.on_scroll(5000.0, 1000.0);
    assert_eq!(director.state().scroll_progress, 1.0);
    director.on_scroll(-50.0, 1000.0);
    assert_eq!(director.state().scroll_progress, 0.0);
    director.on_scroll(100.0, 0.0);
    assert_eq!(director.state().scroll_progress, 0.0);
}

#[test]
fn test_teardown_mid_draw_freezes_state() {
    let mut director = mount_default();
    run_until(&mut director, 1000, |d| d.state().draw_progress >= 0.5).expect("reaches half");

    director.teardown();
    let frozen = *director.state();
    let ticks = director.ticks();

    for _ in 0..120 {
        assert!(director.advance(DT).is_none());
    }
    director.on_scroll(400.0, 1000.0);

    assert_eq!(*director.state(), frozen);
    assert_eq!(director.ticks(), ticks);
    assert!(director.is_torn_down());
}

#[test]
fn test_teardown_before_delay_never_draws() {
    let mut director = mount_default();
    director.advance(DT);
    director.teardown();
    for _ in 0..600 {
        director.advance(DT);
    }
    assert_eq!(director.phase(), DrawPhase::NotStarted);
    assert_eq!(director.state().draw_progress, 0.0);
}

#[test]
fn test_closed_circle_scene_has_seamless_loop() {
    let config = SceneConfig::closed_circle();
    let path = generate_path(&config).unwrap();
    let points = path.points();
    assert_eq!(points.len(), config.segment_count as usize + 1);
    assert_eq!(points[0].position, points[points.len() - 1].position);

    let director = SceneDirector::mount(config).unwrap();
    assert_eq!(director.config().variant, CurveVariant::ClosedCircle);
    assert!(!director.layers().contains(&Layer::Rings));
}

#[test]
fn test_ribbon_counts_match_segment_count() {
    let config = SceneConfig::open_arc();
    let path = generate_path(&config).unwrap();
    let mesh = build_ribbon(&path, config.brush_width).unwrap();
    let n = config.segment_count as usize + 1;
    assert_eq!(mesh.vertex_count(), 2 * n);
    assert_eq!(mesh.indices().len(), 6 * (n - 1));
    assert!(mesh.indices().iter().all(|&i| (i as usize) < mesh.vertex_count()));
}

#[test]
fn test_config_file_overrides_and_sanitizes() {
    let path = std::env::temp_dir().join(format!("enso_scene_{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "segmentCount": 64, "timing": { "drawStep": -1.0 } }"#).unwrap();

    let config = SceneConfig::from_json_file(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(config.segment_count, 64);
    assert_eq!(config.timing.draw_step, SceneConfig::default().timing.draw_step);
    assert_eq!(config.base_radius, SceneConfig::default().base_radius);
}
