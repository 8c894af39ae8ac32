//! Drifting particle field around the stroke.
//!
//! Particles are seeded deterministically and have no simulation state: the
//! position of every particle is a closed-form function of elapsed time.

use bytemuck::{Pod, Zeroable};

/// Billboard size in world units.
pub const PARTICLE_SIZE: f32 = 0.03;

const MIN_RADIUS: f32 = 1.6;
const RADIUS_SPREAD: f32 = 1.4;

/// Orbit parameters for one particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub base_angle: f32,
    pub base_radius: f32,
    pub phase: f32,
    pub speed: f32,
}

impl Particle {
    /// World-space position (before the foreground transform) at time `t`.
    pub fn position_at(&self, t: f32) -> [f32; 3] {
        let drift = t * self.speed + self.phase;
        let angle = self.base_angle + drift * 0.4;
        [
            angle.cos() * (self.base_radius + (drift * 1.3).sin() * 0.2),
            angle.sin() * (self.base_radius + (drift * 1.1).cos() * 0.2),
            (drift * 1.8).sin() * 0.15,
        ]
    }
}

/// Per-instance GPU data for particle billboards.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    pub position: [f32; 3],
    pub size: f32,
}

impl ParticleInstance {
    const ATTRIBS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![2 => Float32x3, 3 => Float32];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ParticleInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ParticleField {
    particles: Vec<Particle>,
}

impl ParticleField {
    pub fn new(count: usize, seed: u64) -> Self {
        let mut rng = XorShift::new(seed);
        let particles = (0..count)
            .map(|_| Particle {
                base_angle: rng.next_f32() * std::f32::consts::TAU,
                base_radius: MIN_RADIUS + rng.next_f32() * RADIUS_SPREAD,
                phase: rng.next_f32() * std::f32::consts::TAU,
                speed: 0.1 + rng.next_f32() * 0.2,
            })
            .collect();
        Self { particles }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn instances_at(&self, t: f32) -> Vec<ParticleInstance> {
        self.particles
            .iter()
            .map(|p| ParticleInstance {
                position: p.position_at(t),
                size: PARTICLE_SIZE,
            })
            .collect()
    }

    /// Layer-wide opacity pulse.
    pub fn opacity_at(t: f32) -> f32 {
        0.35 + (t * 1.5).sin() * 0.15
    }
}

/// xorshift64; seed 0 is remapped since it would only ever yield zeros.
struct XorShift(u64);

impl XorShift {
    fn new(seed: u64) -> Self {
        Self(if seed == 0 { 0x5DEECE66D } else { seed })
    }

    fn next_f32(&mut self) -> f32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        // Top 24 bits give a uniform value in [0, 1).
        (self.0 >> 40) as f32 / (1u64 << 24) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_field() {
        let a = ParticleField::new(160, 42);
        let b = ParticleField::new(160, 42);
        assert_eq!(a.particles(), b.particles());
        assert_eq!(a.instances_at(3.5), b.instances_at(3.5));
    }

    #[test]
    fn test_seed_zero_is_not_degenerate() {
        let field = ParticleField::new(4, 0);
        let p = field.particles();
        assert!((p[0].base_angle - p[1].base_angle).abs() > 1e-4);
    }

    #[test]
    fn test_particles_stay_in_annulus() {
        let field = ParticleField::new(160, 7);
        for step in 0..50 {
            let t = step as f32 * 0.73;
            for inst in field.instances_at(t) {
                let r = (inst.position[0].powi(2) + inst.position[1].powi(2)).sqrt();
                assert!(r >= MIN_RADIUS - 0.21 && r <= MIN_RADIUS + RADIUS_SPREAD + 0.21);
                assert!(inst.position[2].abs() <= 0.15 + 1e-6);
            }
        }
    }

    #[test]
    fn test_particles_drift() {
        let field = ParticleField::new(8, 3);
        assert_ne!(field.instances_at(0.0), field.instances_at(1.0));
    }

    #[test]
    fn test_opacity_range() {
        for i in 0..100 {
            let o = ParticleField::opacity_at(i as f32 * 0.1);
            assert!((0.2..=0.5).contains(&o));
        }
    }
}
