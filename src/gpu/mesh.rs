use bytemuck::{Pod, Zeroable};

/// Ribbon vertex: position plus (u = arc-length, v = edge side).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct RibbonVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl RibbonVertex {
    pub const fn new(position: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, uv }
    }

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<RibbonVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: 12, // [f32; 3] is 12 bytes
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Vertex for clip-space quads (background plane, particle billboards).
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl QuadVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Two triangles covering [-1, 1]², uv (0,0) at the top left.
pub const QUAD_VERTICES: &[QuadVertex] = &[
    QuadVertex { position: [-1.0, -1.0], uv: [0.0, 1.0] },
    QuadVertex { position: [ 1.0, -1.0], uv: [1.0, 1.0] },
    QuadVertex { position: [ 1.0,  1.0], uv: [1.0, 0.0] },
    QuadVertex { position: [-1.0, -1.0], uv: [0.0, 1.0] },
    QuadVertex { position: [ 1.0,  1.0], uv: [1.0, 0.0] },
    QuadVertex { position: [-1.0,  1.0], uv: [0.0, 0.0] },
];

/// Position-only vertex for flat-shaded geometry.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct FlatVertex {
    pub position: [f32; 3],
}

impl FlatVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<FlatVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Flat annulus in the XY plane, centered at origin.
pub fn create_annulus_geometry(inner: f32, outer: f32, segments: u32) -> (Vec<FlatVertex>, Vec<u32>) {
    let segments = segments.max(3);
    let mut vertices = Vec::with_capacity(((segments + 1) * 2) as usize);
    let mut indices = Vec::with_capacity((segments * 6) as usize);

    for i in 0..=segments {
        let theta = std::f32::consts::TAU * (i as f32) / (segments as f32);
        let (s, c) = theta.sin_cos();
        vertices.push(FlatVertex { position: [c * outer, s * outer, 0.0] });
        vertices.push(FlatVertex { position: [c * inner, s * inner, 0.0] });
    }

    for i in 0..segments {
        let vi = i * 2;
        indices.extend_from_slice(&[vi, vi + 1, vi + 2, vi + 1, vi + 3, vi + 2]);
    }

    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_sizes() {
        assert_eq!(std::mem::size_of::<RibbonVertex>(), 20);
        assert_eq!(std::mem::size_of::<QuadVertex>(), 16);
        assert_eq!(std::mem::size_of::<FlatVertex>(), 12);
    }

    #[test]
    fn test_annulus_geometry() {
        let (vertices, indices) = create_annulus_geometry(2.0, 2.5, 128);
        assert_eq!(vertices.len(), 258);
        assert_eq!(indices.len(), 128 * 6);
        for (i, v) in vertices.iter().enumerate() {
            let r = (v.position[0].powi(2) + v.position[1].powi(2)).sqrt();
            let expected = if i % 2 == 0 { 2.5 } else { 2.0 };
            assert!((r - expected).abs() < 1e-5);
        }
    }
}
