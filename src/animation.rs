//! Animation state and its progression rules.
//!
//! `AnimationState` is the only mutable state the layers observe. The
//! `Sequencer` enforces the one-directional draw → reveal ordering; scroll is
//! derived directly from host input and is independent of the phase.

use serde::Serialize;

use crate::config::{steps_to_complete, TimingParams};

/// Fraction of the viewport height that maps to full scroll progress.
pub const SCROLL_DISTANCE_FRACTION: f32 = 0.8;

/// Snapshot of everything time- or scroll-dependent in the scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationState {
    /// Seconds since the scene was mounted.
    pub elapsed_time: f32,
    /// Fraction of the stroke revealed, [0, 1].
    pub draw_progress: f32,
    /// Fraction of the background bloom revealed, [0, 1].
    pub reveal_progress: f32,
    /// Fraction of the fixed scroll distance consumed, [0, 1].
    pub scroll_progress: f32,
}

/// Map a scroll offset to progress: `clamp(offset / (height * 0.8), 0, 1)`.
///
/// Non-finite input or a non-positive viewport height yields 0.
pub fn scroll_progress(scroll_offset: f32, viewport_height: f32) -> f32 {
    if !scroll_offset.is_finite() || !viewport_height.is_finite() || viewport_height <= 0.0 {
        return 0.0;
    }
    (scroll_offset / (viewport_height * SCROLL_DISTANCE_FRACTION)).clamp(0.0, 1.0)
}

/// Draw/reveal lifecycle. Transitions only ever move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DrawPhase {
    NotStarted,
    Drawing,
    /// Stroke complete; reveal starts on the next tick.
    Drawn,
    Revealing,
    FullyRevealed,
}

/// Steps draw and reveal progress one tick at a time.
#[derive(Clone, Debug)]
pub struct Sequencer {
    phase: DrawPhase,
    draw_step: f32,
    reveal_step: f32,
    draw_steps_total: u32,
    reveal_steps_total: u32,
    draw_steps: u32,
    reveal_steps: u32,
}

impl Sequencer {
    pub fn new(timing: &TimingParams) -> Self {
        Self {
            phase: DrawPhase::NotStarted,
            draw_step: timing.draw_step,
            reveal_step: timing.reveal_step,
            draw_steps_total: steps_to_complete(timing.draw_step),
            reveal_steps_total: steps_to_complete(timing.reveal_step),
            draw_steps: 0,
            reveal_steps: 0,
        }
    }

    pub fn phase(&self) -> DrawPhase {
        self.phase
    }

    /// Leave `NotStarted`. Has no effect in any later phase.
    pub fn begin_drawing(&mut self) -> Option<DrawPhase> {
        if self.phase == DrawPhase::NotStarted {
            self.phase = DrawPhase::Drawing;
            Some(self.phase)
        } else {
            None
        }
    }

    /// Advance one tick, returning the new phase if this tick changed it.
    pub fn tick(&mut self, state: &mut AnimationState) -> Option<DrawPhase> {
        match self.phase {
            DrawPhase::NotStarted | DrawPhase::FullyRevealed => None,
            DrawPhase::Drawing => {
                self.draw_steps += 1;
                if self.draw_steps >= self.draw_steps_total {
                    state.draw_progress = 1.0;
                    self.phase = DrawPhase::Drawn;
                    Some(self.phase)
                } else {
                    // Counting steps avoids float drift from repeated addition.
                    state.draw_progress = (self.draw_steps as f32 * self.draw_step).min(1.0);
                    None
                }
            }
            DrawPhase::Drawn => {
                self.phase = DrawPhase::Revealing;
                self.advance_reveal(state);
                Some(self.phase)
            }
            DrawPhase::Revealing => self.advance_reveal(state),
        }
    }

    fn advance_reveal(&mut self, state: &mut AnimationState) -> Option<DrawPhase> {
        self.reveal_steps += 1;
        if self.reveal_steps >= self.reveal_steps_total {
            state.reveal_progress = 1.0;
            self.phase = DrawPhase::FullyRevealed;
            Some(self.phase)
        } else {
            state.reveal_progress = (self.reveal_steps as f32 * self.reveal_step).min(1.0);
            None
        }
    }

    /// Whether any further tick can change draw or reveal progress.
    pub fn is_settled(&self) -> bool {
        self.phase == DrawPhase::FullyRevealed
    }
}

/// Rigid transform shared by every foreground layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForegroundTransform {
    pub scale: f32,
    /// Rotation about the view axis, radians.
    pub rotation: f32,
}

impl ForegroundTransform {
    pub const SCROLL_SCALE: f32 = 0.15;
    pub const SCROLL_ROTATION: f32 = 0.5;
    pub const SWAY_RATE: f32 = 0.25;
    pub const SWAY_AMPLITUDE: f32 = 0.015;

    /// Derive the group transform once per tick.
    pub fn from_state(state: &AnimationState) -> Self {
        let s = state.scroll_progress;
        let sway = (state.elapsed_time * Self::SWAY_RATE).sin() * Self::SWAY_AMPLITUDE;
        Self {
            scale: 1.0 - s * Self::SCROLL_SCALE,
            rotation: sway + s * Self::SCROLL_ROTATION,
        }
    }

    pub fn matrix(&self) -> glam::Mat4 {
        glam::Mat4::from_rotation_z(self.rotation) * glam::Mat4::from_scale(glam::Vec3::splat(self.scale))
    }
}
