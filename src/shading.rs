//! Layer shading.
//!
//! Each layer is a pure function of a surface coordinate and a read-only
//! `AnimationState`. The WGSL programs in `gpu/` evaluate these per pixel;
//! the functions here are the same math on the CPU, used by tests and the
//! CLI's timeline probe. Keep the two in step.
//!
//! Layers:
//! - **Brush**: the ink stroke, cut at the draw front, with traveling glow.
//! - **Outer glow**: wider, fainter twin of the brush.
//! - **Background bloom**: full-screen radial glow, pulse and rings, gated by
//!   reveal progress.

use std::f32::consts::TAU;

use bytemuck::{Pod, Zeroable};

use crate::animation::AnimationState;
use crate::config::{BloomParams, ColorParams, CurveVariant, HotspotParams};

/// Draw progress at which the leading-edge fade is dropped.
pub const FADE_SUPPRESS_THRESHOLD: f32 = 0.92;
/// Length in u of the soft leading edge.
pub const DRAW_FADE_WIDTH: f32 = 0.08;
/// Ink texture frequency: four whole periods so closed loops stay seamless.
pub const INK_FREQUENCY: f32 = 4.0 * TAU;
/// Outer glow hotspots are broader than the brush's.
pub const GLOW_HOTSPOT_SPREAD: f32 = 0.75;

/// Linear color plus alpha.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub rgb: [f32; 3],
    pub alpha: f32,
}

pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

pub fn fract(x: f32) -> f32 {
    x - x.floor()
}

fn mix3(a: [f32; 3], b: [f32; 3], k: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * k,
        a[1] + (b[1] - a[1]) * k,
        a[2] + (b[2] - a[2]) * k,
    ]
}

/// Everything the ribbon layers need besides the animation state.
#[derive(Clone, Copy, Debug)]
pub struct RibbonStyle {
    pub variant: CurveVariant,
    pub hotspot: HotspotParams,
    pub colors: ColorParams,
}

/// Signed distance in u from a hotspot centre, periodic for closed loops.
fn hotspot_offset(u: f32, center: f32, closed: bool) -> f32 {
    let d = u - center;
    if closed { d - d.round() } else { d }
}

/// Gaussian bump of the given sharpness.
fn hotspot(u: f32, center: f32, width: f32, closed: bool) -> f32 {
    let x = hotspot_offset(u, center, closed) * width;
    (-(x * x)).exp()
}

/// Centres of the two traveling hotspots at time `t`.
pub fn hotspot_centers(t: f32, rate: f32) -> [f32; 2] {
    [fract(t * rate), fract(t * rate + 0.5)]
}

/// Soft leading edge behind the draw front; solid once nearly complete.
pub fn draw_fade(u: f32, draw_progress: f32) -> f32 {
    if draw_progress >= FADE_SUPPRESS_THRESHOLD {
        1.0
    } else {
        1.0 - smoothstep(draw_progress - DRAW_FADE_WIDTH, draw_progress, u)
    }
}

/// Brush stroke fragment. `None` where the stroke has not been drawn yet.
pub fn brush_fragment(uv: [f32; 2], state: &AnimationState, style: &RibbonStyle) -> Option<Rgba> {
    let [u, v] = uv;
    if u > state.draw_progress {
        return None;
    }
    let t = state.elapsed_time;
    let closed = style.variant.is_closed();

    let edge = smoothstep(0.0, 0.35, v) * (1.0 - smoothstep(0.65, 1.0, v));

    let [c1, c2] = hotspot_centers(t, style.hotspot.rate);
    let travel = hotspot(u, c1, style.hotspot.width, closed)
        + hotspot(u, c2, style.hotspot.width, closed) * style.hotspot.secondary_weight;

    let breathe = 0.55 + 0.2 * (t * 1.2).sin() + 0.1 * (t * 2.7 + 1.0).sin();
    let ink = 0.8 + 0.2 * (u * INK_FREQUENCY + t * 0.5).sin();

    let base_alpha = edge * ink * breathe;
    let glow_alpha = travel * edge * 1.5;

    let base_col = mix3(style.colors.accent, [1.0; 3], edge * 0.3);
    let glow_col = mix3(style.colors.glow, [1.0; 3], 0.5);
    let rgb = mix3(base_col, glow_col, travel.clamp(0.0, 1.0));

    let alpha = (base_alpha + glow_alpha).clamp(0.0, 1.0) * draw_fade(u, state.draw_progress);
    Some(Rgba { rgb, alpha })
}

/// Outer glow fragment; revealed in lockstep with the brush.
pub fn glow_fragment(uv: [f32; 2], state: &AnimationState, style: &RibbonStyle) -> Option<Rgba> {
    let [u, v] = uv;
    if u > state.draw_progress {
        return None;
    }
    let t = state.elapsed_time;
    let closed = style.variant.is_closed();

    let edge = smoothstep(0.0, 0.5, v) * (1.0 - smoothstep(0.5, 1.0, v));
    let breathe = 0.3 + 0.15 * (t * 1.2).sin() + 0.1 * (t * 0.7).sin();

    let [c1, c2] = hotspot_centers(t, style.hotspot.rate);
    let width = style.hotspot.width * GLOW_HOTSPOT_SPREAD;
    let travel = (hotspot(u, c1, width, closed)
        + hotspot(u, c2, width, closed) * style.hotspot.secondary_weight)
        * 0.5;

    let alpha = (edge * (breathe * 0.15 + travel)).clamp(0.0, 1.0) * draw_fade(u, state.draw_progress);
    Some(Rgba { rgb: style.colors.accent, alpha })
}

/// One-off pulse over the reveal window: 0 at the start, 1 at `peak`, then
/// decaying.
pub fn bloom_pulse(reveal_progress: f32, peak: f32) -> f32 {
    let x = reveal_progress / peak;
    x * (1.0 - x).exp()
}

/// Thin expanding rings: a sharpened periodic wave in `r - t`.
pub fn ring_wave(r: f32, t: f32, params: &BloomParams) -> f32 {
    let wave = 0.5 + 0.5 * ((r - t * params.ring_speed) * params.ring_frequency * TAU).sin();
    wave.max(1e-5).powf(params.ring_sharpness)
}

/// Background bloom fragment at `p`, measured from the scene centre in clip
/// space with x scaled by the aspect ratio.
pub fn bloom_fragment(p: [f32; 2], state: &AnimationState, params: &BloomParams, colors: &ColorParams) -> Rgba {
    let r = (p[0] * p[0] + p[1] * p[1]).sqrt();
    let t = state.elapsed_time;
    let reveal = state.reveal_progress;

    let gate = smoothstep(0.0, params.gate_width, reveal);
    let radial = (-r * r * 2.5).exp() * 0.35 * reveal;
    let pulse = bloom_pulse(reveal, params.pulse_peak);
    let burst = pulse * (-r * r * 1.2).exp() * 0.6;
    let rings = ring_wave(r, t, params) * (-r * 0.8).exp() * 0.25;

    let alpha = gate * (radial + burst + rings).clamp(0.0, 1.0);
    let rgb = mix3(colors.accent, colors.glow, pulse.clamp(0.0, 1.0));
    Rgba { rgb, alpha }
}

// ============================================================================
// GPU uniform blocks
// ============================================================================

/// Uniforms shared by the brush and outer glow programs.
/// Matches `RibbonUniforms` in enso_brush.wgsl / enso_glow.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct RibbonUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub glow_color: [f32; 4],
    /// x = elapsed time, y = draw progress, z = reveal progress, w = closed (0/1)
    pub progress: [f32; 4],
    /// x = rate, y = width, z = secondary weight, w = fade suppress threshold
    pub hotspot: [f32; 4],
}

impl RibbonUniforms {
    pub fn new(style: &RibbonStyle) -> Self {
        let c = &style.colors;
        Self {
            view_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
            model: glam::Mat4::IDENTITY.to_cols_array_2d(),
            color: [c.accent[0], c.accent[1], c.accent[2], 1.0],
            glow_color: [c.glow[0], c.glow[1], c.glow[2], 1.0],
            progress: [0.0, 0.0, 0.0, if style.variant.is_closed() { 1.0 } else { 0.0 }],
            hotspot: [
                style.hotspot.rate,
                style.hotspot.width,
                style.hotspot.secondary_weight,
                FADE_SUPPRESS_THRESHOLD,
            ],
        }
    }

    /// Copy the animation snapshot in; never writes back.
    pub fn update_state(&mut self, state: &AnimationState) {
        self.progress[0] = state.elapsed_time;
        self.progress[1] = state.draw_progress;
        self.progress[2] = state.reveal_progress;
    }
}

/// Matches `BloomUniforms` in enso_bloom.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct BloomUniforms {
    pub color: [f32; 4],
    pub glow_color: [f32; 4],
    /// x = elapsed time, y = reveal progress, z = aspect, w = ring sharpness
    pub params: [f32; 4],
    /// x = ring frequency, y = ring speed, z = pulse peak, w = gate width
    pub rings: [f32; 4],
    /// xy = scene centre in clip space, zw unused
    pub center: [f32; 4],
}

impl BloomUniforms {
    pub fn new(params: &BloomParams, colors: &ColorParams) -> Self {
        Self {
            color: [colors.accent[0], colors.accent[1], colors.accent[2], 1.0],
            glow_color: [colors.glow[0], colors.glow[1], colors.glow[2], 1.0],
            params: [0.0, 0.0, 1.0, params.ring_sharpness],
            rings: [params.ring_frequency, params.ring_speed, params.pulse_peak, params.gate_width],
            center: [0.0; 4],
        }
    }

    pub fn update_state(&mut self, state: &AnimationState, aspect: f32, center: [f32; 2]) {
        self.params[0] = state.elapsed_time;
        self.params[1] = state.reveal_progress;
        self.params[2] = aspect;
        self.center = [center[0], center[1], 0.0, 0.0];
    }
}

/// Flat-colored geometry (glow rings, particles). Matches enso_flat.wgsl.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FlatUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    /// rgb + opacity
    pub color: [f32; 4],
    /// x = billboard size multiplier, yzw unused
    pub params: [f32; 4],
}

impl FlatUniforms {
    pub fn new(color: [f32; 3], opacity: f32) -> Self {
        Self {
            view_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
            model: glam::Mat4::IDENTITY.to_cols_array_2d(),
            color: [color[0], color[1], color[2], opacity],
            params: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(variant: CurveVariant) -> RibbonStyle {
        RibbonStyle {
            variant,
            hotspot: HotspotParams::default(),
            colors: ColorParams::default(),
        }
    }

    fn state(t: f32, draw: f32, reveal: f32) -> AnimationState {
        AnimationState {
            elapsed_time: t,
            draw_progress: draw,
            reveal_progress: reveal,
            scroll_progress: 0.0,
        }
    }

    #[test]
    fn test_brush_discards_undrawn() {
        let s = style(CurveVariant::OpenArc);
        let st = state(1.0, 0.4, 0.0);
        assert!(brush_fragment([0.5, 0.5], &st, &s).is_none());
        assert!(brush_fragment([0.2, 0.5], &st, &s).is_some());
        assert!(glow_fragment([0.5, 0.5], &st, &s).is_none());
    }

    #[test]
    fn test_brush_feathered_edges() {
        let s = style(CurveVariant::OpenArc);
        let st = state(1.0, 1.0, 0.0);
        let edge = brush_fragment([0.3, 0.0], &st, &s).unwrap();
        let other_edge = brush_fragment([0.3, 1.0], &st, &s).unwrap();
        let centre = brush_fragment([0.3, 0.5], &st, &s).unwrap();
        assert_eq!(edge.alpha, 0.0);
        assert_eq!(other_edge.alpha, 0.0);
        assert!(centre.alpha > 0.0);
    }

    #[test]
    fn test_leading_edge_fades_until_threshold() {
        assert!(draw_fade(0.5, 0.5) < 1e-6);
        assert!((draw_fade(0.3, 0.5) - 1.0).abs() < 1e-6);
        let mid = draw_fade(0.46, 0.5);
        assert!(mid > 0.0 && mid < 1.0);
        assert_eq!(draw_fade(0.95, 0.95), 1.0);
        assert_eq!(draw_fade(0.92, FADE_SUPPRESS_THRESHOLD), 1.0);
    }

    #[test]
    fn test_hotspot_travels_after_draw_completes() {
        let s = style(CurveVariant::OpenArc);
        // Hotspot centre at u = fract(t * 0.12); t = 2.5 -> 0.3
        let st = state(2.5, 1.0, 1.0);
        let on = brush_fragment([0.3, 0.5], &st, &s).unwrap();
        let off = brush_fragment([0.55, 0.5], &st, &s).unwrap();
        assert!(on.alpha > off.alpha);

        let later = state(2.5 + 1.0 / 0.12 * 0.25, 1.0, 1.0);
        let moved = brush_fragment([0.55, 0.5], &later, &s).unwrap();
        assert!(moved.alpha > off.alpha);
    }

    #[test]
    fn test_closed_hotspot_wraps_across_seam() {
        // Centre just past the seam; u near 1 should still be lit.
        let closed = hotspot(0.99, 0.01, 8.0, true);
        let open = hotspot(0.99, 0.01, 8.0, false);
        assert!(closed > 0.9);
        assert!(open < 1e-3);
    }

    #[test]
    fn test_shading_does_not_mutate_state() {
        let s = style(CurveVariant::ClosedCircle);
        let st = state(3.0, 0.7, 0.0);
        let before = st;
        let _ = brush_fragment([0.1, 0.4], &st, &s);
        let _ = glow_fragment([0.1, 0.4], &st, &s);
        let _ = bloom_fragment([0.1, 0.1], &st, &BloomParams::default(), &ColorParams::default());
        assert_eq!(before, st);
    }

    #[test]
    fn test_bloom_invisible_before_reveal() {
        let params = BloomParams::default();
        let colors = ColorParams::default();
        for i in 0..20 {
            let p = [i as f32 * 0.05, 0.0];
            let px = bloom_fragment(p, &state(i as f32, 1.0, 0.0), &params, &colors);
            assert_eq!(px.alpha, 0.0);
        }
    }

    #[test]
    fn test_bloom_visible_during_reveal() {
        let params = BloomParams::default();
        let px = bloom_fragment([0.0, 0.0], &state(4.0, 1.0, 0.3), &params, &ColorParams::default());
        assert!(px.alpha > 0.3);
    }

    #[test]
    fn test_bloom_pulse_peaks_early_then_decays() {
        let peak = BloomParams::default().pulse_peak;
        assert_eq!(bloom_pulse(0.0, peak), 0.0);
        assert!((bloom_pulse(peak, peak) - 1.0).abs() < 1e-6);
        assert!(bloom_pulse(1.0, peak) < bloom_pulse(0.5, peak));
        assert!(bloom_pulse(0.5, peak) < 1.0);
    }

    #[test]
    fn test_ring_wave_is_thin() {
        let params = BloomParams::default();
        let samples = 1000;
        let bright = (0..samples)
            .filter(|i| ring_wave(*i as f32 / samples as f32, 0.0, &params) > 0.5)
            .count();
        // A plain sine would be above 0.5 half the time.
        assert!(bright < samples / 5);
    }

    #[test]
    fn test_uniform_sizes() {
        assert_eq!(std::mem::size_of::<RibbonUniforms>(), 192);
        assert_eq!(std::mem::size_of::<BloomUniforms>(), 80);
        assert_eq!(std::mem::size_of::<FlatUniforms>(), 160);
    }

    #[test]
    fn test_ribbon_uniforms_encode_variant() {
        let u = RibbonUniforms::new(&style(CurveVariant::ClosedCircle));
        assert_eq!(u.progress[3], 1.0);
        let mut u = RibbonUniforms::new(&style(CurveVariant::OpenArc));
        assert_eq!(u.progress[3], 0.0);
        u.update_state(&state(2.0, 0.5, 0.0));
        assert_eq!(u.progress, [2.0, 0.5, 0.0, 0.0]);
    }
}
