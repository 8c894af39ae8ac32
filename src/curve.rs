//! Brush-stroke centerline generation.
//!
//! The path is a circle of fixed base radius perturbed by a deterministic
//! multi-frequency wobble. Points are ordered in the drawing direction and
//! parameterized by t = i / N.

use glam::Vec3;

use crate::config::{CurveVariant, SceneConfig};
use crate::ribbon::GeometryError;

/// A sample on the stroke's centerline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathPoint {
    pub position: Vec3,
    /// Normalized arc-length parameter in [0, 1].
    pub t: f32,
}

/// An ordered, immutable centerline.
#[derive(Clone, Debug)]
pub struct CurvePath {
    variant: CurveVariant,
    points: Vec<PathPoint>,
}

impl CurvePath {
    pub fn variant(&self) -> CurveVariant {
        self.variant
    }

    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Indices of the neighbours used for the central-difference tangent.
    ///
    /// Open paths clamp at the ends; closed paths wrap, skipping the
    /// duplicated seam point so both ends see the same neighbourhood.
    pub fn neighbours(&self, i: usize) -> (usize, usize) {
        neighbour_indices(self.variant, self.points.len(), i)
    }

    /// Unit tangent at point `i` (central difference).
    pub fn tangent(&self, i: usize) -> Vec3 {
        let (prev, next) = self.neighbours(i);
        (self.points[next].position - self.points[prev].position).normalize_or_zero()
    }
}

pub(crate) fn neighbour_indices(variant: CurveVariant, len: usize, i: usize) -> (usize, usize) {
    let last = len - 1;
    match variant {
        CurveVariant::OpenArc => (i.saturating_sub(1), (i + 1).min(last)),
        CurveVariant::ClosedCircle => {
            // points[last] coincides with points[0].
            let prev = if i == 0 { last - 1 } else { i - 1 };
            let next = if i == last { 1 } else { i + 1 };
            (prev, next)
        }
    }
}

/// Generate the N + 1 centerline points for a scene configuration.
pub fn generate_path(config: &SceneConfig) -> Result<CurvePath, GeometryError> {
    let segments = config.segment_count as usize;
    // A closed loop of two segments folds back on itself.
    let min_segments = if config.variant.is_closed() { 3 } else { 2 };
    if segments < min_segments {
        return Err(GeometryError::TooFewPoints { got: segments + 1 });
    }

    let (start, sweep) = match config.variant {
        CurveVariant::OpenArc => (config.arc.start_angle, config.arc.sweep),
        CurveVariant::ClosedCircle => (config.arc.start_angle, std::f32::consts::TAU),
    };

    let mut points = Vec::with_capacity(segments + 1);
    for i in 0..=segments {
        let t = i as f32 / segments as f32;
        let angle = start + t * sweep;
        let radius = config.base_radius + config.wobble.radial_at(t);
        let y_offset = config.wobble.vertical_at(t);
        points.push(PathPoint {
            position: Vec3::new(angle.cos() * radius, angle.sin() * radius + y_offset, 0.0),
            t,
        });
    }

    if config.variant.is_closed() {
        // Exact closure; cos/sin of start + TAU drift by an ulp or two.
        let first = points[0].position;
        points[segments].position = first;
    }

    Ok(CurvePath {
        variant: config.variant,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_count_and_parameter() {
        let config = SceneConfig::open_arc();
        let path = generate_path(&config).unwrap();
        assert_eq!(path.len(), 201);
        assert_eq!(path.points()[0].t, 0.0);
        assert_eq!(path.points()[200].t, 1.0);
        for pair in path.points().windows(2) {
            assert!(pair[1].t > pair[0].t);
        }
    }

    #[test]
    fn test_points_near_base_radius() {
        let config = SceneConfig::open_arc();
        let path = generate_path(&config).unwrap();
        for p in path.points() {
            let r = p.position.truncate().length();
            assert!((r - 2.2).abs() < 0.05, "radius {} drifted", r);
        }
    }

    #[test]
    fn test_open_arc_leaves_gap() {
        let config = SceneConfig::open_arc();
        let path = generate_path(&config).unwrap();
        let first = path.points()[0].position;
        let last = path.points()[path.len() - 1].position;
        // 0.17π of the circle is missing.
        assert!(first.distance(last) > 1.0);
    }

    #[test]
    fn test_deterministic() {
        let config = SceneConfig::closed_circle();
        let a = generate_path(&config).unwrap();
        let b = generate_path(&config).unwrap();
        assert_eq!(a.points(), b.points());
    }

    #[test]
    fn test_closed_seam_position_and_tangent() {
        let config = SceneConfig::closed_circle().sanitize();
        let path = generate_path(&config).unwrap();
        let n = path.len() - 1;
        assert!(path.points()[0].position.distance(path.points()[n].position) < 1e-5);
        let t0 = path.tangent(0);
        let tn = path.tangent(n);
        assert!(t0.dot(tn) > 0.9999, "seam tangents diverge: {:?} vs {:?}", t0, tn);
    }

    #[test]
    fn test_open_tangent_clamps_at_ends() {
        let config = SceneConfig::open_arc();
        let path = generate_path(&config).unwrap();
        assert_eq!(path.neighbours(0), (0, 1));
        let last = path.len() - 1;
        assert_eq!(path.neighbours(last), (last - 1, last));
        assert!(path.tangent(0).length() > 0.99);
        assert!(path.tangent(last).length() > 0.99);
    }

    #[test]
    fn test_closed_tangent_wraps() {
        let config = SceneConfig::closed_circle();
        let path = generate_path(&config).unwrap();
        let last = path.len() - 1;
        assert_eq!(path.neighbours(0), (last - 1, 1));
        assert_eq!(path.neighbours(last), (last - 1, 1));
    }

    #[test]
    fn test_rejects_single_segment() {
        let mut config = SceneConfig::open_arc();
        config.segment_count = 1;
        assert!(matches!(
            generate_path(&config),
            Err(GeometryError::TooFewPoints { got: 2 })
        ));
    }
}
