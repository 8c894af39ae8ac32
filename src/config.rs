//! Scene configuration.
//!
//! One configuration struct covers every iteration of the enso scene: the
//! open arc with a gap and the closed full circle, with optional particle and
//! ring layers. Everything here is a fixed constant for a scene instance; the
//! director never mutates it after construction.

use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Shape of the brush-stroke centerline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CurveVariant {
    /// Sub-360° sweep leaving a visible gap.
    OpenArc,
    /// Exactly 360°, seamless at t = 0 / t = 1.
    ClosedCircle,
}

impl CurveVariant {
    pub fn is_closed(self) -> bool {
        matches!(self, CurveVariant::ClosedCircle)
    }
}

/// Angular extent of the open arc (radians).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArcParams {
    pub start_angle: f32,
    pub sweep: f32,
}

impl Default for ArcParams {
    fn default() -> Self {
        Self {
            start_angle: PI * 0.6,
            sweep: PI * 1.83,
        }
    }
}

/// Half-width profile: `base + taper(t) * amplitude`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidthParams {
    pub base: f32,
    pub amplitude: f32,
}

/// One sine component of the hand-drawn wobble.
///
/// `cycles` counts full periods over t ∈ [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WobbleTerm {
    pub amplitude: f32,
    pub cycles: f32,
    #[serde(default)]
    pub phase: f32,
}

impl WobbleTerm {
    pub const fn new(amplitude: f32, cycles: f32, phase: f32) -> Self {
        Self { amplitude, cycles, phase }
    }

    pub fn eval(&self, t: f32) -> f32 {
        self.amplitude * (TAU * self.cycles * t + self.phase).sin()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WobbleParams {
    /// Perturbation of the base radius.
    pub radial: Vec<WobbleTerm>,
    /// Perturbation of the vertical offset.
    pub vertical: Vec<WobbleTerm>,
}

impl Default for WobbleParams {
    fn default() -> Self {
        Self {
            radial: vec![WobbleTerm::new(0.015, 3.0, 0.0), WobbleTerm::new(0.008, 6.5, 0.0)],
            vertical: vec![WobbleTerm::new(0.01, 4.0, FRAC_PI_2)],
        }
    }
}

impl WobbleParams {
    pub fn radial_at(&self, t: f32) -> f32 {
        self.radial.iter().map(|w| w.eval(t)).sum()
    }

    pub fn vertical_at(&self, t: f32) -> f32 {
        self.vertical.iter().map(|w| w.eval(t)).sum()
    }
}

/// Progress pacing. Steps are applied once per display-refresh tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimingParams {
    pub startup_delay_secs: f32,
    pub draw_step: f32,
    pub reveal_step: f32,
}

impl Default for TimingParams {
    fn default() -> Self {
        Self {
            startup_delay_secs: 0.6,
            draw_step: 0.005,
            reveal_step: 0.008,
        }
    }
}

/// Traveling hotspot along the stroke's arc-length.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HotspotParams {
    /// Laps of u per second.
    pub rate: f32,
    /// Gaussian sharpness in u.
    pub width: f32,
    /// Relative brightness of the second hotspot (half a lap behind).
    pub secondary_weight: f32,
}

impl Default for HotspotParams {
    fn default() -> Self {
        Self {
            rate: 0.12,
            width: 8.0,
            secondary_weight: 0.6,
        }
    }
}

/// Background bloom tuning. These are empirical constants.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BloomParams {
    pub ring_sharpness: f32,
    pub ring_frequency: f32,
    pub ring_speed: f32,
    /// Reveal progress at which the one-off bloom pulse peaks.
    pub pulse_peak: f32,
    /// Reveal progress over which the layer fades in from nothing.
    pub gate_width: f32,
}

impl Default for BloomParams {
    fn default() -> Self {
        Self {
            ring_sharpness: 12.0,
            ring_frequency: 9.0,
            ring_speed: 0.35,
            pulse_peak: 0.25,
            gate_width: 0.15,
        }
    }
}

/// Linear RGB colors for every layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColorParams {
    pub accent: [f32; 3],
    pub glow: [f32; 3],
    pub inner_ring: [f32; 3],
    pub outer_ring: [f32; 3],
}

impl Default for ColorParams {
    fn default() -> Self {
        Self {
            accent: hex_rgb(0x0099ff),
            glow: hex_rgb(0x66ccff),
            inner_ring: hex_rgb(0x0099ff),
            outer_ring: hex_rgb(0x004488),
        }
    }
}

/// Convert a packed 0xRRGGBB value into normalized RGB.
pub fn hex_rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneConfig {
    pub variant: CurveVariant,
    pub segment_count: u32,
    pub base_radius: f32,
    pub arc: ArcParams,
    pub brush_width: WidthParams,
    pub glow_width: WidthParams,
    pub wobble: WobbleParams,
    pub timing: TimingParams,
    pub hotspot: HotspotParams,
    pub bloom: BloomParams,
    pub colors: ColorParams,
    pub enable_particles: bool,
    pub enable_rings: bool,
    pub particle_count: u32,
    pub particle_seed: u64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::open_arc()
    }
}

impl SceneConfig {
    /// The hero scene: an incomplete ink circle with particles and rings.
    pub fn open_arc() -> Self {
        Self {
            variant: CurveVariant::OpenArc,
            segment_count: 200,
            base_radius: 2.2,
            arc: ArcParams::default(),
            brush_width: WidthParams { base: 0.06, amplitude: 0.07 },
            glow_width: WidthParams { base: 0.2, amplitude: 0.2 },
            wobble: WobbleParams::default(),
            timing: TimingParams::default(),
            hotspot: HotspotParams::default(),
            bloom: BloomParams::default(),
            colors: ColorParams::default(),
            enable_particles: true,
            enable_rings: true,
            particle_count: 160,
            particle_seed: 0x5EED_E550,
        }
    }

    /// Seamless full circle with the background bloom as its finale.
    pub fn closed_circle() -> Self {
        Self {
            variant: CurveVariant::ClosedCircle,
            segment_count: 256,
            arc: ArcParams { start_angle: FRAC_PI_2, sweep: TAU },
            wobble: WobbleParams {
                radial: vec![WobbleTerm::new(0.015, 3.0, 0.0), WobbleTerm::new(0.008, 7.0, 0.4)],
                vertical: vec![WobbleTerm::new(0.01, 4.0, FRAC_PI_2)],
            },
            enable_rings: false,
            ..Self::open_arc()
        }
    }

    /// Load a config override from a JSON file. Missing fields take their
    /// open-arc defaults.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: SceneConfig = serde_json::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse scene config {:?}: {}", path, e))?;
        Ok(config.sanitize())
    }

    /// Clamp parameters to ranges the generators and director accept.
    pub fn sanitize(&self) -> Self {
        let mut out = self.clone();
        out.segment_count = self.segment_count.max(2);
        out.base_radius = self.base_radius.max(0.01);
        out.brush_width = sanitize_width(self.brush_width);
        out.glow_width = sanitize_width(self.glow_width);
        out.timing.startup_delay_secs = finite_or(self.timing.startup_delay_secs, 0.0).max(0.0);
        out.timing.draw_step = sanitize_step(self.timing.draw_step, TimingParams::default().draw_step);
        out.timing.reveal_step =
            sanitize_step(self.timing.reveal_step, TimingParams::default().reveal_step);
        out.hotspot.width = self.hotspot.width.max(0.0);
        out.bloom.ring_sharpness = self.bloom.ring_sharpness.max(1.0);
        out.bloom.pulse_peak = self.bloom.pulse_peak.clamp(0.01, 1.0);
        out.bloom.gate_width = self.bloom.gate_width.clamp(0.001, 1.0);

        match self.variant {
            CurveVariant::ClosedCircle => {
                // Two segments fold a closed loop back onto itself.
                out.segment_count = out.segment_count.max(3);
                out.arc.sweep = TAU;
                // Whole cycles keep the wobble periodic across the seam.
                for term in out.wobble.radial.iter_mut().chain(out.wobble.vertical.iter_mut()) {
                    term.cycles = term.cycles.round();
                }
            }
            CurveVariant::OpenArc => {
                out.arc.sweep = self.arc.sweep.clamp(0.0, TAU);
            }
        }
        out
    }

    /// Wall-clock length of the draw-in at a given refresh rate.
    pub fn draw_duration_secs(&self, tick_rate: f32) -> f32 {
        steps_to_complete(self.timing.draw_step) as f32 / tick_rate
    }

    pub fn reveal_duration_secs(&self, tick_rate: f32) -> f32 {
        steps_to_complete(self.timing.reveal_step) as f32 / tick_rate
    }
}

/// Number of ticks a fixed step takes to cover [0, 1].
pub fn steps_to_complete(step: f32) -> u32 {
    // Tolerance absorbs 1/step landing a hair above an integer.
    ((1.0 / step) - 1e-3).ceil().max(1.0) as u32
}

fn sanitize_width(w: WidthParams) -> WidthParams {
    WidthParams {
        base: finite_or(w.base, 0.0).max(0.0),
        amplitude: finite_or(w.amplitude, 0.0).max(0.0),
    }
}

fn sanitize_step(step: f32, fallback: f32) -> f32 {
    if step.is_finite() && step > 0.0 {
        step.min(1.0)
    } else {
        fallback
    }
}

fn finite_or(v: f32, fallback: f32) -> f32 {
    if v.is_finite() { v } else { fallback }
}
