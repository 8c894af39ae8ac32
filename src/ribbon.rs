//! Tapered ribbon tessellation around a centerline.
//!
//! Each centerline point emits two vertices offset along the in-plane normal,
//! and each consecutive pair of points emits two triangles. The mesh is built
//! once per layer and never modified.

use std::f32::consts::{PI, TAU};
use std::fmt;

use glam::Vec3;

use crate::config::{CurveVariant, WidthParams};
use crate::curve::{neighbour_indices, CurvePath, PathPoint};
use crate::gpu::mesh::RibbonVertex;

/// Contract violations on geometry input.
#[derive(Clone, Debug, PartialEq)]
pub enum GeometryError {
    /// A ribbon needs at least three centerline points.
    TooFewPoints { got: usize },
    /// Position and UV attribute arrays differ in length.
    MismatchedAttributes { positions: usize, uvs: usize },
    /// Vertices come in left/right pairs; an odd count has no partner.
    UnpairedVertices { vertices: usize },
    /// The index list does not split into whole triangles.
    PartialTriangle { indices: usize },
    /// An index refers past the end of the vertex array.
    IndexOutOfRange { index: u32, vertex_count: usize },
    /// A position or UV contains NaN or infinity.
    NonFinite { vertex: usize },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::TooFewPoints { got } => {
                write!(f, "ribbon needs at least 3 points, got {}", got)
            }
            GeometryError::MismatchedAttributes { positions, uvs } => {
                write!(f, "{} positions but {} uvs", positions, uvs)
            }
            GeometryError::UnpairedVertices { vertices } => {
                write!(f, "{} vertices do not form left/right pairs", vertices)
            }
            GeometryError::PartialTriangle { indices } => {
                write!(f, "{} indices is not a whole number of triangles", indices)
            }
            GeometryError::IndexOutOfRange { index, vertex_count } => {
                write!(f, "index {} out of range for {} vertices", index, vertex_count)
            }
            GeometryError::NonFinite { vertex } => write!(f, "vertex {} is not finite", vertex),
        }
    }
}

impl std::error::Error for GeometryError {}

/// Width envelope in [0, 1] along the stroke.
///
/// Open arcs thin out to nothing at both ends; closed loops use a periodic
/// profile whose value and slope match across t = 0 / t = 1.
pub fn taper(variant: CurveVariant, t: f32) -> f32 {
    match variant {
        CurveVariant::OpenArc => (t * PI).sin().max(0.0),
        CurveVariant::ClosedCircle => 0.5 - 0.5 * (t * TAU).cos(),
    }
}

/// Half-width of the ribbon at arc-length t.
pub fn half_width(variant: CurveVariant, width: WidthParams, t: f32) -> f32 {
    width.base + taper(variant, t) * width.amplitude
}

/// Triangulated strip around a centerline.
#[derive(Clone, Debug)]
pub struct RibbonMesh {
    vertices: Vec<RibbonVertex>,
    indices: Vec<u32>,
}

impl RibbonMesh {
    /// Assemble a mesh from raw attribute arrays, rejecting malformed input.
    pub fn from_parts(
        positions: &[[f32; 3]],
        uvs: &[[f32; 2]],
        indices: Vec<u32>,
    ) -> Result<Self, GeometryError> {
        if positions.len() != uvs.len() {
            return Err(GeometryError::MismatchedAttributes {
                positions: positions.len(),
                uvs: uvs.len(),
            });
        }
        if positions.len() % 2 != 0 {
            return Err(GeometryError::UnpairedVertices { vertices: positions.len() });
        }
        if positions.len() < 6 {
            return Err(GeometryError::TooFewPoints { got: positions.len() / 2 });
        }
        if indices.len() % 3 != 0 {
            return Err(GeometryError::PartialTriangle { indices: indices.len() });
        }

        let mut vertices = Vec::with_capacity(positions.len());
        for (i, (p, uv)) in positions.iter().zip(uvs).enumerate() {
            if !p.iter().chain(uv.iter()).all(|c| c.is_finite()) {
                return Err(GeometryError::NonFinite { vertex: i });
            }
            vertices.push(RibbonVertex::new(*p, *uv));
        }

        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(GeometryError::IndexOutOfRange {
                index: bad,
                vertex_count: vertices.len(),
            });
        }

        Ok(Self { vertices, indices })
    }

    pub fn vertices(&self) -> &[RibbonVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Build the ribbon for a generated path.
pub fn build_ribbon(path: &CurvePath, width: WidthParams) -> Result<RibbonMesh, GeometryError> {
    build_ribbon_from_points(path.points(), path.variant(), width)
}

/// Build a ribbon from an arbitrary ordered point sequence.
pub fn build_ribbon_from_points(
    points: &[PathPoint],
    variant: CurveVariant,
    width: WidthParams,
) -> Result<RibbonMesh, GeometryError> {
    if points.len() < 3 {
        return Err(GeometryError::TooFewPoints { got: points.len() });
    }

    let mut positions = Vec::with_capacity(points.len() * 2);
    let mut uvs = Vec::with_capacity(points.len() * 2);
    let mut indices = Vec::with_capacity((points.len() - 1) * 6);

    for (i, point) in points.iter().enumerate() {
        let (prev, next) = neighbour_indices(variant, points.len(), i);
        let dir = (points[next].position - points[prev].position).normalize_or_zero();
        let normal = Vec3::new(-dir.y, dir.x, 0.0);
        let offset = normal * half_width(variant, width, point.t);

        positions.push((point.position + offset).to_array());
        positions.push((point.position - offset).to_array());
        uvs.push([point.t, 0.0]);
        uvs.push([point.t, 1.0]);

        if i + 1 < points.len() {
            let vi = (i * 2) as u32;
            indices.extend_from_slice(&[vi, vi + 1, vi + 2, vi + 1, vi + 3, vi + 2]);
        }
    }

    let mesh = RibbonMesh::from_parts(&positions, &uvs, indices)?;
    log::debug!(
        "Built {:?} ribbon: {} vertices, {} triangles",
        variant,
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    Ok(mesh)
}
