//! Pulsing glow rings in front of the stroke.

use serde::Serialize;

use crate::animation::ForegroundTransform;
use crate::config::ColorParams;

pub const RING_SEGMENTS: u32 = 128;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlowRing {
    pub inner_radius: f32,
    pub outer_radius: f32,
    pub color: [f32; 3],
    pub pulse_amplitude: f32,
    pub pulse_rate: f32,
    pub pulse_phase: f32,
    /// Radians per second; sign picks the direction.
    pub spin_rate: f32,
    pub base_opacity: f32,
    pub opacity_amplitude: f32,
    pub opacity_rate: f32,
    pub opacity_phase: f32,
}

/// Evaluated ring state for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RingPose {
    pub scale: f32,
    pub rotation: f32,
    pub opacity: f32,
}

impl RingPose {
    pub fn matrix(&self) -> glam::Mat4 {
        glam::Mat4::from_rotation_z(self.rotation) * glam::Mat4::from_scale(glam::Vec3::splat(self.scale))
    }
}

impl GlowRing {
    pub fn inner(colors: &ColorParams) -> Self {
        Self {
            inner_radius: 2.0,
            outer_radius: 2.5,
            color: colors.inner_ring,
            pulse_amplitude: 0.04,
            pulse_rate: 1.0,
            pulse_phase: 0.0,
            spin_rate: 0.05,
            base_opacity: 0.06,
            opacity_amplitude: 0.03,
            opacity_rate: 1.2,
            opacity_phase: 0.0,
        }
    }

    pub fn outer(colors: &ColorParams) -> Self {
        Self {
            inner_radius: 2.4,
            outer_radius: 3.2,
            color: colors.outer_ring,
            pulse_amplitude: 0.03,
            pulse_rate: 0.7,
            pulse_phase: 1.0,
            spin_rate: -0.03,
            base_opacity: 0.03,
            opacity_amplitude: 0.02,
            opacity_rate: 0.8,
            opacity_phase: 0.5,
        }
    }

    /// Local pulse and spin composed onto the shared foreground transform.
    pub fn pose_at(&self, t: f32, foreground: &ForegroundTransform) -> RingPose {
        let pulse = 1.0 + (t * self.pulse_rate + self.pulse_phase).sin() * self.pulse_amplitude;
        RingPose {
            scale: pulse * foreground.scale,
            rotation: t * self.spin_rate + foreground.rotation,
            opacity: self.base_opacity
                + (t * self.opacity_rate + self.opacity_phase).sin() * self.opacity_amplitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_follows_foreground() {
        let ring = GlowRing::inner(&ColorParams::default());
        let fg = ForegroundTransform { scale: 0.925, rotation: 0.25 };
        let pose = ring.pose_at(0.0, &fg);
        assert!((pose.scale - 0.925).abs() < 1e-6);
        assert!((pose.rotation - 0.25).abs() < 1e-6);
        assert!((pose.opacity - 0.06).abs() < 1e-6);
    }

    #[test]
    fn test_opacity_stays_positive() {
        let fg = ForegroundTransform { scale: 1.0, rotation: 0.0 };
        for ring in [GlowRing::inner(&ColorParams::default()), GlowRing::outer(&ColorParams::default())] {
            for i in 0..200 {
                let pose = ring.pose_at(i as f32 * 0.05, &fg);
                assert!(pose.opacity > 0.0);
                assert!(pose.scale > 0.9 && pose.scale < 1.1);
            }
        }
    }

    #[test]
    fn test_outer_ring_spins_backwards() {
        let fg = ForegroundTransform { scale: 1.0, rotation: 0.0 };
        let ring = GlowRing::outer(&ColorParams::default());
        assert!(ring.pose_at(10.0, &fg).rotation < 0.0);
    }
}
