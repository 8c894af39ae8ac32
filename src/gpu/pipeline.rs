use crate::gpu::mesh::{FlatVertex, QuadVertex, RibbonVertex};
use crate::particles::ParticleInstance;

/// Additive blending: every layer adds light, none occludes.
pub fn additive_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

fn primitive_state() -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        // Layers are visible from both sides.
        cull_mode: None,
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

fn create_layer_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    shader: &wgpu::ShaderModule,
    buffers: &[wgpu::VertexBufferLayout<'_>],
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(additive_blend()),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: primitive_state(),
        // Transparent layers, painter's order; no depth buffer.
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}

/// Ink stroke program.
pub fn create_brush_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::include_wgsl!("enso_brush.wgsl"));
    create_layer_pipeline(device, layout, color_format, &shader, &[RibbonVertex::desc()], "Enso Brush Pipeline")
}

/// Wide, faint twin of the brush.
pub fn create_glow_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::include_wgsl!("enso_glow.wgsl"));
    create_layer_pipeline(device, layout, color_format, &shader, &[RibbonVertex::desc()], "Enso Glow Pipeline")
}

/// Full-screen background bloom.
pub fn create_bloom_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::include_wgsl!("enso_bloom.wgsl"));
    create_layer_pipeline(device, layout, color_format, &shader, &[QuadVertex::desc()], "Enso Bloom Pipeline")
}

/// Flat-colored rings.
pub fn create_ring_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::include_wgsl!("enso_flat.wgsl"));
    create_layer_pipeline(device, layout, color_format, &shader, &[FlatVertex::desc()], "Enso Ring Pipeline")
}

/// Instanced particle billboards.
///
/// - Slot 0: unit quad (per-vertex)
/// - Slot 1: particle position + size (per-instance)
pub fn create_particle_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::include_wgsl!("enso_particle.wgsl"));
    create_layer_pipeline(
        device,
        layout,
        color_format,
        &shader,
        &[QuadVertex::desc(), ParticleInstance::desc()],
        "Enso Particle Pipeline",
    )
}
