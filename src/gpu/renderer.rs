//! GPU renderer for the enso scene.
//!
//! Draws the layer stack back to front with additive blending. Geometry is
//! uploaded once; per frame only uniforms and particle instances change.

use std::iter;

use wgpu::util::DeviceExt;

use crate::director::{FrameSnapshot, Layer, SceneDirector};
use crate::gpu::mesh::{self, QUAD_VERTICES};
use crate::gpu::pipeline;
use crate::particles::ParticleInstance;
use crate::ribbon::RibbonMesh;
use crate::rings::RING_SEGMENTS;
use crate::shading::{BloomUniforms, FlatUniforms, RibbonUniforms};

/// A uniform buffer and the bind group exposing it at binding 0.
struct UniformSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl UniformSlot {
    fn new<T: bytemuck::Pod>(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        initial: &T,
        label: &str,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(initial),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some(label),
        });
        Self { buffer, bind_group }
    }

    fn write<T: bytemuck::Pod>(&self, queue: &wgpu::Queue, value: &T) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(value));
    }
}

/// Indexed geometry uploaded once.
struct MeshGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
}

impl MeshGeometry {
    fn new<V: bytemuck::Pod>(device: &wgpu::Device, vertices: &[V], indices: &[u32], label: &str) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", label)),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", label)),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            num_indices: indices.len() as u32,
        }
    }

    fn from_ribbon(device: &wgpu::Device, ribbon: &RibbonMesh, label: &str) -> Self {
        Self::new(device, ribbon.vertices(), ribbon.indices(), label)
    }
}

struct RibbonLayer {
    geometry: MeshGeometry,
    uniforms: RibbonUniforms,
    slot: UniformSlot,
}

struct RingLayer {
    geometry: MeshGeometry,
    uniforms: FlatUniforms,
    slot: UniformSlot,
}

struct ParticleLayer {
    instance_buffer: wgpu::Buffer,
    capacity: usize,
    live: u32,
    uniforms: FlatUniforms,
    slot: UniformSlot,
}

pub struct Renderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    size: wgpu::Extent3d,

    brush_pipeline: wgpu::RenderPipeline,
    glow_pipeline: wgpu::RenderPipeline,
    bloom_pipeline: wgpu::RenderPipeline,
    ring_pipeline: wgpu::RenderPipeline,
    particle_pipeline: wgpu::RenderPipeline,

    quad_vertex_buffer: wgpu::Buffer,

    brush: RibbonLayer,
    glow: RibbonLayer,
    bloom_uniforms: BloomUniforms,
    bloom_slot: UniformSlot,
    rings: Vec<RingLayer>,
    particles: Option<ParticleLayer>,
}

impl Renderer {
    /// Upload the director's static geometry and build one pipeline per layer
    /// program. The director is only read here, never per frame.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        director: &SceneDirector,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };
        let config = director.config();
        let style = director.ribbon_style();

        let layer_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("enso_layer_bind_group_layout"),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Enso Layer Pipeline Layout"),
            bind_group_layouts: &[&layer_bind_group_layout],
            push_constant_ranges: &[],
        });

        let brush_pipeline = pipeline::create_brush_pipeline(&device, &pipeline_layout, format);
        let glow_pipeline = pipeline::create_glow_pipeline(&device, &pipeline_layout, format);
        let bloom_pipeline = pipeline::create_bloom_pipeline(&device, &pipeline_layout, format);
        let ring_pipeline = pipeline::create_ring_pipeline(&device, &pipeline_layout, format);
        let particle_pipeline = pipeline::create_particle_pipeline(&device, &pipeline_layout, format);

        let quad_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Enso Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        // === Ribbon layers ===

        let geometry = director.geometry();
        let brush_uniforms = RibbonUniforms::new(&style);
        let brush = RibbonLayer {
            geometry: MeshGeometry::from_ribbon(&device, &geometry.brush, "Brush"),
            slot: UniformSlot::new(&device, &layer_bind_group_layout, &brush_uniforms, "Brush Uniforms"),
            uniforms: brush_uniforms,
        };
        let glow_uniforms = RibbonUniforms::new(&style);
        let glow = RibbonLayer {
            geometry: MeshGeometry::from_ribbon(&device, &geometry.glow, "Glow"),
            slot: UniformSlot::new(&device, &layer_bind_group_layout, &glow_uniforms, "Glow Uniforms"),
            uniforms: glow_uniforms,
        };

        // === Background bloom ===

        let bloom_uniforms = BloomUniforms::new(&config.bloom, &config.colors);
        let bloom_slot = UniformSlot::new(&device, &layer_bind_group_layout, &bloom_uniforms, "Bloom Uniforms");

        // === Rings ===

        let rings = director
            .rings()
            .iter()
            .enumerate()
            .map(|(i, ring)| {
                let (vertices, indices) =
                    mesh::create_annulus_geometry(ring.inner_radius, ring.outer_radius, RING_SEGMENTS);
                let label = format!("Ring {}", i);
                let uniforms = FlatUniforms::new(ring.color, ring.base_opacity);
                RingLayer {
                    geometry: MeshGeometry::new(&device, &vertices, &indices, &label),
                    slot: UniformSlot::new(&device, &layer_bind_group_layout, &uniforms, &label),
                    uniforms,
                }
            })
            .collect();

        // === Particles ===

        let particles = config.enable_particles.then(|| {
            let capacity = config.particle_count.max(1) as usize;
            let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Particle Instance Buffer"),
                size: (capacity * std::mem::size_of::<ParticleInstance>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let uniforms = FlatUniforms::new(config.colors.accent, 0.4);
            ParticleLayer {
                instance_buffer,
                capacity,
                live: 0,
                slot: UniformSlot::new(&device, &layer_bind_group_layout, &uniforms, "Particle Uniforms"),
                uniforms,
            }
        });

        log::info!(
            "Renderer ready: {}x{}, brush {} tris, glow {} tris, {} rings, particles: {}",
            size.width,
            size.height,
            geometry.brush.triangle_count(),
            geometry.glow.triangle_count(),
            director.rings().len(),
            config.enable_particles
        );

        Self {
            device,
            queue,
            size,
            brush_pipeline,
            glow_pipeline,
            bloom_pipeline,
            ring_pipeline,
            particle_pipeline,
            quad_vertex_buffer,
            brush,
            glow,
            bloom_uniforms,
            bloom_slot,
            rings,
            particles,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.size.width = width;
        self.size.height = height;
    }

    fn aspect(&self) -> f32 {
        self.size.width as f32 / self.size.height as f32
    }

    /// Push the frame's read-only state into every layer's uniforms.
    fn upload(&mut self, snapshot: &FrameSnapshot) {
        let aspect = self.aspect();
        let view_proj = snapshot.camera.view_projection_matrix(aspect);
        let view_proj_cols = view_proj.to_cols_array_2d();
        let foreground = snapshot.foreground.matrix().to_cols_array_2d();

        for layer in [&mut self.brush, &mut self.glow] {
            layer.uniforms.view_proj = view_proj_cols;
            layer.uniforms.model = foreground;
            layer.uniforms.update_state(&snapshot.state);
            layer.slot.write(&self.queue, &layer.uniforms);
        }

        let center = view_proj.project_point3(glam::Vec3::ZERO);
        self.bloom_uniforms.update_state(&snapshot.state, aspect, [center.x, center.y]);
        self.bloom_slot.write(&self.queue, &self.bloom_uniforms);

        for (layer, pose) in self.rings.iter_mut().zip(&snapshot.rings) {
            layer.uniforms.view_proj = view_proj_cols;
            layer.uniforms.model = pose.matrix().to_cols_array_2d();
            layer.uniforms.color[3] = pose.opacity;
            layer.slot.write(&self.queue, &layer.uniforms);
        }

        if let Some(layer) = self.particles.as_mut() {
            let count = snapshot.particles.len().min(layer.capacity);
            if count < snapshot.particles.len() {
                log::warn!("Too many particles ({} > {}), some will not be rendered", snapshot.particles.len(), layer.capacity);
            }
            if count > 0 {
                self.queue.write_buffer(
                    &layer.instance_buffer,
                    0,
                    bytemuck::cast_slice(&snapshot.particles[..count]),
                );
            }
            layer.live = count as u32;
            layer.uniforms.view_proj = view_proj_cols;
            layer.uniforms.model = foreground;
            layer.uniforms.color[3] = snapshot.particle_opacity;
            layer.slot.write(&self.queue, &layer.uniforms);
        }
    }

    pub fn render(&mut self, view: &wgpu::TextureView, snapshot: &FrameSnapshot) {
        // queue.write_buffer is immediate, so all uniforms go in before the pass.
        self.upload(snapshot);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Enso Render Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Enso Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for layer in &snapshot.layers {
                match layer {
                    Layer::BackgroundBloom => {
                        render_pass.set_pipeline(&self.bloom_pipeline);
                        render_pass.set_bind_group(0, &self.bloom_slot.bind_group, &[]);
                        render_pass.set_vertex_buffer(0, self.quad_vertex_buffer.slice(..));
                        render_pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
                    }
                    Layer::OuterGlow => {
                        render_pass.set_pipeline(&self.glow_pipeline);
                        draw_indexed(&mut render_pass, &self.glow.geometry, &self.glow.slot);
                    }
                    Layer::Brush => {
                        render_pass.set_pipeline(&self.brush_pipeline);
                        draw_indexed(&mut render_pass, &self.brush.geometry, &self.brush.slot);
                    }
                    Layer::Particles => {
                        if let Some(particles) = self.particles.as_ref().filter(|p| p.live > 0) {
                            render_pass.set_pipeline(&self.particle_pipeline);
                            render_pass.set_bind_group(0, &particles.slot.bind_group, &[]);
                            render_pass.set_vertex_buffer(0, self.quad_vertex_buffer.slice(..));
                            render_pass.set_vertex_buffer(1, particles.instance_buffer.slice(..));
                            render_pass.draw(0..QUAD_VERTICES.len() as u32, 0..particles.live);
                        }
                    }
                    Layer::Rings => {
                        render_pass.set_pipeline(&self.ring_pipeline);
                        for ring in &self.rings {
                            draw_indexed(&mut render_pass, &ring.geometry, &ring.slot);
                        }
                    }
                }
            }
        }

        self.queue.submit(iter::once(encoder.finish()));
    }
}

fn draw_indexed<'a>(render_pass: &mut wgpu::RenderPass<'a>, geometry: &'a MeshGeometry, slot: &'a UniformSlot) {
    render_pass.set_bind_group(0, &slot.bind_group, &[]);
    render_pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
    render_pass.set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
    render_pass.draw_indexed(0..geometry.num_indices, 0, 0..1);
}
