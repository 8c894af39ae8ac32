//! Scene director.
//!
//! Owns the animation state, the frame schedule and the scene geometry. The
//! host calls [`SceneDirector::frame`] once per display refresh and
//! [`SceneDirector::on_scroll`] whenever the page scrolls; the renderer only
//! ever sees the read-only [`FrameSnapshot`] produced afterwards.

use serde::Serialize;

use crate::animation::{scroll_progress, AnimationState, DrawPhase, ForegroundTransform, Sequencer};
use crate::camera::CameraPose;
use crate::config::SceneConfig;
use crate::curve::generate_path;
use crate::particles::{ParticleField, ParticleInstance};
use crate::ribbon::{build_ribbon, GeometryError, RibbonMesh};
use crate::rings::{GlowRing, RingPose};
use crate::schedule::{CancelToken, FrameScheduler, Task};
use crate::shading::RibbonStyle;

/// Host overlay fades as the page scrolls away from the hero.
pub const CANVAS_FADE: f32 = 0.6;

/// Render layers, back to front.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Layer {
    BackgroundBloom,
    OuterGlow,
    Brush,
    Particles,
    Rings,
}

/// Static geometry built once at mount.
#[derive(Clone, Debug)]
pub struct SceneGeometry {
    pub brush: RibbonMesh,
    pub glow: RibbonMesh,
}

impl SceneGeometry {
    pub fn build(config: &SceneConfig) -> Result<Self, GeometryError> {
        let path = generate_path(config)?;
        Ok(Self {
            brush: build_ribbon(&path, config.brush_width)?,
            glow: build_ribbon(&path, config.glow_width)?,
        })
    }
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSnapshot {
    pub state: AnimationState,
    pub phase: DrawPhase,
    pub foreground: ForegroundTransform,
    pub camera: CameraPose,
    pub canvas_opacity: f32,
    pub layers: Vec<Layer>,
    #[serde(skip)]
    pub particles: Vec<ParticleInstance>,
    pub particle_opacity: f32,
    pub rings: Vec<RingPose>,
}

pub struct SceneDirector {
    config: SceneConfig,
    geometry: SceneGeometry,
    state: AnimationState,
    sequencer: Sequencer,
    schedule: FrameScheduler,
    foreground: ForegroundTransform,
    camera: CameraPose,
    particles: Option<ParticleField>,
    rings: Vec<GlowRing>,
    ticks: u64,
    /// Set after the first warning about an unusable viewport height.
    viewport_warned: bool,
}

impl SceneDirector {
    /// Build the scene and schedule the delayed draw-in.
    ///
    /// Fails fast on invalid geometry rather than rendering a partial mesh.
    pub fn mount(config: SceneConfig) -> Result<Self, GeometryError> {
        let config = config.sanitize();
        let geometry = SceneGeometry::build(&config)?;
        let state = AnimationState::default();

        let mut schedule = FrameScheduler::new(CancelToken::new());
        schedule.schedule_after(0.0, config.timing.startup_delay_secs, Task::BeginDrawing);

        let particles = config
            .enable_particles
            .then(|| ParticleField::new(config.particle_count as usize, config.particle_seed));
        let rings = if config.enable_rings {
            vec![GlowRing::inner(&config.colors), GlowRing::outer(&config.colors)]
        } else {
            Vec::new()
        };

        log::info!(
            "Enso scene mounted: {:?}, {} segments, draw starts in {:.2}s",
            config.variant,
            config.segment_count,
            config.timing.startup_delay_secs
        );

        Ok(Self {
            sequencer: Sequencer::new(&config.timing),
            foreground: ForegroundTransform::from_state(&state),
            camera: CameraPose::from_scroll(0.0),
            config,
            geometry,
            state,
            schedule,
            particles,
            rings,
            ticks: 0,
            viewport_warned: false,
        })
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn geometry(&self) -> &SceneGeometry {
        &self.geometry
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    pub fn phase(&self) -> DrawPhase {
        self.sequencer.phase()
    }

    pub fn foreground(&self) -> &ForegroundTransform {
        &self.foreground
    }

    pub fn camera(&self) -> &CameraPose {
        &self.camera
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn ribbon_style(&self) -> RibbonStyle {
        RibbonStyle {
            variant: self.config.variant,
            hotspot: self.config.hotspot,
            colors: self.config.colors,
        }
    }

    /// Token shared with host-side listeners; cancelled on teardown.
    pub fn cancel_token(&self) -> CancelToken {
        self.schedule.token().clone()
    }

    pub fn is_torn_down(&self) -> bool {
        self.schedule.token().is_cancelled()
    }

    /// One display-refresh tick at `elapsed` seconds since mount.
    ///
    /// Returns the phase entered during this tick, if any. A clock that runs
    /// backwards is held at its last value.
    pub fn frame(&mut self, elapsed: f32) -> Option<DrawPhase> {
        if self.is_torn_down() {
            return None;
        }
        if elapsed.is_finite() && elapsed > self.state.elapsed_time {
            self.state.elapsed_time = elapsed;
        }
        self.ticks += 1;

        let before = self.sequencer.phase();
        let now = self.state.elapsed_time;
        for task in self.schedule.take_due(now) {
            self.run(task);
        }
        for task in self.schedule.tick_tasks() {
            self.run(task);
        }

        self.foreground = ForegroundTransform::from_state(&self.state);
        self.camera = CameraPose::from_scroll(self.state.scroll_progress);

        let after = self.sequencer.phase();
        (after != before).then_some(after)
    }

    /// Tick by a frame delta instead of an absolute clock.
    pub fn advance(&mut self, dt: f32) -> Option<DrawPhase> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.frame(self.state.elapsed_time + dt)
    }

    fn run(&mut self, task: Task) {
        if self.is_torn_down() {
            return;
        }
        match task {
            Task::BeginDrawing => {
                if self.sequencer.begin_drawing().is_some() {
                    log::info!("Enso draw-in started at {:.3}s", self.state.elapsed_time);
                    self.schedule.register_tick(Task::Progress);
                }
            }
            Task::Progress => {
                match self.sequencer.tick(&mut self.state) {
                    Some(DrawPhase::Drawn) => {
                        log::info!("Enso stroke complete at {:.3}s", self.state.elapsed_time);
                    }
                    Some(DrawPhase::FullyRevealed) => {
                        log::info!("Enso reveal complete at {:.3}s", self.state.elapsed_time);
                        self.schedule.unregister_tick(Task::Progress);
                    }
                    Some(phase) => log::debug!("Enso phase -> {:?}", phase),
                    None => {}
                }
            }
        }
    }

    /// Recompute scroll progress from the host's scroll position.
    pub fn on_scroll(&mut self, scroll_offset: f32, viewport_height: f32) {
        if self.is_torn_down() {
            return;
        }
        if viewport_height.is_nan() || viewport_height <= 0.0 {
            if !self.viewport_warned {
                log::warn!("Ignoring viewport height {} for scroll", viewport_height);
                self.viewport_warned = true;
            }
        } else {
            self.viewport_warned = false;
        }
        self.state.scroll_progress = scroll_progress(scroll_offset, viewport_height);
    }

    /// Cancel pending timers and tick registrations. Idempotent.
    pub fn teardown(&mut self) {
        if self.is_torn_down() {
            return;
        }
        self.schedule.cancel_all();
        log::info!(
            "Enso scene torn down after {} ticks ({:?}, draw {:.3})",
            self.ticks,
            self.sequencer.phase(),
            self.state.draw_progress
        );
    }

    /// Layers present in this scene, back to front.
    pub fn layers(&self) -> Vec<Layer> {
        let mut layers = vec![Layer::BackgroundBloom, Layer::OuterGlow, Layer::Brush];
        if self.particles.is_some() {
            layers.push(Layer::Particles);
        }
        if !self.rings.is_empty() {
            layers.push(Layer::Rings);
        }
        layers
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        let t = self.state.elapsed_time;
        FrameSnapshot {
            state: self.state,
            phase: self.sequencer.phase(),
            foreground: self.foreground,
            camera: self.camera,
            canvas_opacity: 1.0 - self.state.scroll_progress * CANVAS_FADE,
            layers: self.layers(),
            particles: self
                .particles
                .as_ref()
                .map(|field| field.instances_at(t))
                .unwrap_or_default(),
            particle_opacity: ParticleField::opacity_at(t),
            rings: self.rings.iter().map(|r| r.pose_at(t, &self.foreground)).collect(),
        }
    }

    pub fn rings(&self) -> &[GlowRing] {
        &self.rings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn run_ticks(director: &mut SceneDirector, n: usize) {
        for _ in 0..n {
            director.advance(DT);
        }
    }

    #[test]
    fn test_mount_initial_state() {
        let director = SceneDirector::mount(SceneConfig::default()).unwrap();
        assert_eq!(*director.state(), AnimationState::default());
        assert_eq!(director.phase(), DrawPhase::NotStarted);
        assert_eq!(director.geometry().brush.vertex_count(), 402);
        assert_eq!(director.camera().depth(), 6.0);
    }

    #[test]
    fn test_startup_delay_holds_draw() {
        let mut director = SceneDirector::mount(SceneConfig::default()).unwrap();
        run_ticks(&mut director, 30);
        assert_eq!(director.state().draw_progress, 0.0);
        assert_eq!(director.phase(), DrawPhase::NotStarted);
        assert!(director.state().elapsed_time > 0.49);
    }

    #[test]
    fn test_frame_reports_transitions() {
        let mut config = SceneConfig::default();
        config.timing.startup_delay_secs = 0.0;
        config.timing.draw_step = 0.5;
        config.timing.reveal_step = 1.0;
        let mut director = SceneDirector::mount(config).unwrap();

        let mut phases = Vec::new();
        for _ in 0..6 {
            if let Some(p) = director.advance(DT) {
                phases.push(p);
            }
        }
        assert_eq!(phases, vec![DrawPhase::Drawing, DrawPhase::Drawn, DrawPhase::FullyRevealed]);
    }

    #[test]
    fn test_clock_never_runs_backwards() {
        let mut director = SceneDirector::mount(SceneConfig::default()).unwrap();
        director.frame(2.0);
        director.frame(1.0);
        director.frame(f32::NAN);
        assert_eq!(director.state().elapsed_time, 2.0);
    }

    #[test]
    fn test_scroll_updates_camera_next_tick() {
        let mut director = SceneDirector::mount(SceneConfig::default()).unwrap();
        director.on_scroll(400.0, 1000.0);
        assert_eq!(director.state().scroll_progress, 0.5);
        director.advance(DT);
        assert!((director.camera().depth() - 7.0).abs() < 1e-6);
        director.on_scroll(0.0, 1000.0);
        director.advance(DT);
        assert_eq!(director.camera().depth(), 6.0);
    }

    #[test]
    fn test_layers_follow_flags() {
        let mut config = SceneConfig::closed_circle();
        config.enable_particles = false;
        let director = SceneDirector::mount(config).unwrap();
        assert_eq!(
            director.layers(),
            vec![Layer::BackgroundBloom, Layer::OuterGlow, Layer::Brush]
        );
        assert!(director.snapshot().particles.is_empty());

        let director = SceneDirector::mount(SceneConfig::open_arc()).unwrap();
        let snap = director.snapshot();
        assert_eq!(snap.layers.last(), Some(&Layer::Rings));
        assert_eq!(snap.particles.len(), 160);
        assert_eq!(snap.rings.len(), 2);
    }

    #[test]
    fn test_teardown_is_idempotent_and_final() {
        let mut director = SceneDirector::mount(SceneConfig::default()).unwrap();
        let token = director.cancel_token();
        director.teardown();
        director.teardown();
        assert!(token.is_cancelled());
        assert!(director.frame(10.0).is_none());
        director.on_scroll(500.0, 1000.0);
        assert_eq!(*director.state(), AnimationState::default());
    }

    #[test]
    fn test_canvas_opacity() {
        let mut director = SceneDirector::mount(SceneConfig::default()).unwrap();
        director.on_scroll(2000.0, 1000.0);
        assert!((director.snapshot().canvas_opacity - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_closed_two_segments_mounts() {
        let mut config = SceneConfig::closed_circle();
        config.segment_count = 2;
        let director = SceneDirector::mount(config).unwrap();
        assert_eq!(director.config().segment_count, 3);
        assert_eq!(director.geometry().brush.vertex_count(), 8);
    }

    #[test]
    fn test_bad_viewport_warns_once() {
        let mut director = SceneDirector::mount(SceneConfig::default()).unwrap();
        director.on_scroll(100.0, 0.0);
        assert!(director.viewport_warned);
        director.on_scroll(200.0, f32::NAN);
        assert!(director.viewport_warned);
        assert_eq!(director.state().scroll_progress, 0.0);

        director.on_scroll(400.0, 1000.0);
        assert!(!director.viewport_warned);
        assert_eq!(director.state().scroll_progress, 0.5);
    }
}
