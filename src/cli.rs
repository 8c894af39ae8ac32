use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::animation::{AnimationState, DrawPhase};
use crate::config::SceneConfig;
use crate::director::SceneDirector;
use crate::gpu::renderer::Renderer;
use crate::shading::bloom_fragment;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Variant {
    /// Open brush arc with particles and rings
    Open,
    /// Closed circle
    Closed,
}

#[derive(Subcommand)]
enum Commands {
    /// Render frames to disk
    Render {
        /// Output directory for frames
        #[arg(long)]
        out: PathBuf,

        /// Frames per second
        #[arg(long, default_value_t = 60.0)]
        fps: f32,

        /// Duration in seconds
        #[arg(long, default_value_t = 5.0)]
        duration: f32,

        /// Output width
        #[arg(long, default_value_t = 800)]
        width: u32,

        /// Output height
        #[arg(long, default_value_t = 600)]
        height: u32,

        /// Scene variant (ignored when --config is given)
        #[arg(long, value_enum, default_value_t = Variant::Open)]
        variant: Variant,

        /// Scene config JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Scroll offset at the first frame, in pixels
        #[arg(long, default_value_t = 0.0)]
        scroll_from: f32,

        /// Scroll offset at the last frame, in pixels
        #[arg(long, default_value_t = 0.0)]
        scroll_to: f32,

        /// Viewport height used for scroll progress
        #[arg(long, default_value_t = 1000.0)]
        viewport_height: f32,
    },
    /// Simulate the scene clock and print phase transitions as JSON lines
    Timeline {
        /// Ticks per second
        #[arg(long, default_value_t = 60.0)]
        fps: f32,

        /// Duration in seconds
        #[arg(long, default_value_t = 6.0)]
        duration: f32,

        #[arg(long, value_enum, default_value_t = Variant::Open)]
        variant: Variant,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Also print a line every N ticks (0 = transitions only)
        #[arg(long, default_value_t = 0)]
        every: u64,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            out,
            fps,
            duration,
            width,
            height,
            variant,
            config,
            scroll_from,
            scroll_to,
            viewport_height,
        } => {
            let scene = load_config(variant, config.as_deref())?;
            let scroll = ScrollRamp {
                from: scroll_from,
                to: scroll_to,
                viewport_height,
            };
            pollster::block_on(render_offline(scene, out, fps, duration, width, height, scroll))?;
        }
        Commands::Timeline {
            fps,
            duration,
            variant,
            config,
            every,
        } => {
            let scene = load_config(variant, config.as_deref())?;
            print_timeline(scene, fps, duration, every)?;
        }
    }
    Ok(())
}

fn load_config(variant: Variant, path: Option<&Path>) -> Result<SceneConfig> {
    match path {
        Some(path) => SceneConfig::from_json_file(path),
        None => Ok(match variant {
            Variant::Open => SceneConfig::open_arc(),
            Variant::Closed => SceneConfig::closed_circle(),
        }),
    }
}

fn frame_count(fps: f32, duration: f32) -> Result<usize> {
    if !(fps.is_finite() && fps > 0.0) {
        anyhow::bail!("fps must be positive, got {}", fps);
    }
    if !(duration.is_finite() && duration >= 0.0) {
        anyhow::bail!("duration must be non-negative, got {}", duration);
    }
    Ok((duration * fps).ceil() as usize)
}

/// Linear scroll offset across the render.
#[derive(Clone, Copy, Debug)]
struct ScrollRamp {
    from: f32,
    to: f32,
    viewport_height: f32,
}

impl ScrollRamp {
    fn offset_at(&self, frame: usize, total: usize) -> f32 {
        let k = if total > 1 { frame as f32 / (total - 1) as f32 } else { 0.0 };
        self.from + (self.to - self.from) * k
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TimelineLine {
    tick: u64,
    phase: DrawPhase,
    #[serde(flatten)]
    state: AnimationState,
    /// Bloom alpha at the scene centre.
    bloom_center: f32,
}

fn print_timeline(config: SceneConfig, fps: f32, duration: f32, every: u64) -> Result<()> {
    let total = frame_count(fps, duration)?;
    let mut director = SceneDirector::mount(config).context("Failed to build enso geometry")?;
    let dt = 1.0 / fps;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for _ in 0..total {
        let transition = director.advance(dt);
        let periodic = every > 0 && director.ticks() % every == 0;
        if transition.is_none() && !periodic {
            continue;
        }
        let state = *director.state();
        let bloom = &director.config().bloom;
        let colors = &director.config().colors;
        let line = TimelineLine {
            tick: director.ticks(),
            phase: director.phase(),
            state,
            bloom_center: bloom_fragment([0.0, 0.0], &state, bloom, colors).alpha,
        };
        writeln!(out, "{}", serde_json::to_string(&line)?)?;
    }
    director.teardown();
    Ok(())
}

async fn render_offline(
    config: SceneConfig,
    out_dir: PathBuf,
    fps: f32,
    duration: f32,
    width: u32,
    height: u32,
    scroll: ScrollRamp,
) -> Result<()> {
    let total_frames = frame_count(fps, duration)?;
    if width == 0 || height == 0 {
        anyhow::bail!("Output size must be non-zero, got {}x{}", width, height);
    }
    let dt = 1.0 / fps;

    let mut director = SceneDirector::mount(config).context("Failed to build enso geometry")?;

    std::fs::create_dir_all(&out_dir)?;

    // WGPU Init
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None, // Headless
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| anyhow::anyhow!("No adapter found"))?;

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor::default(), None)
        .await?;

    let texture_desc = wgpu::TextureDescriptor {
        label: Some("Target Texture"),
        size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    };

    let texture = device.create_texture(&texture_desc);
    let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    // Rows are padded to COPY_BYTES_PER_ROW_ALIGNMENT for readback.
    let unpadded_bytes_per_row = 4 * width;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_bytes_per_row = unpadded_bytes_per_row + (align - unpadded_bytes_per_row % align) % align;

    let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Output Buffer"),
        size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut renderer = Renderer::new(device, queue, texture_desc.format, width, height, &director);

    println!("Rendering {} frames to {:?}...", total_frames, out_dir);

    for i in 0..total_frames {
        director.on_scroll(scroll.offset_at(i, total_frames), scroll.viewport_height);
        if let Some(phase) = director.advance(dt) {
            log::info!("frame {}: {:?}", i, phase);
        }
        let snapshot = director.snapshot();

        renderer.render(&texture_view, &snapshot);

        let mut encoder = renderer
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });

        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &output_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            texture_desc.size,
        );
        renderer.queue().submit(Some(encoder.finish()));

        let buffer_slice = output_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |v| {
            let _ = tx.send(v);
        });
        renderer.device().poll(wgpu::Maintain::Wait);
        rx.recv()
            .context("Readback channel closed")?
            .context("Failed to map readback buffer")?;

        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        {
            let data = buffer_slice.get_mapped_range();
            for row in 0..height {
                let start = (row * padded_bytes_per_row) as usize;
                let end = start + unpadded_bytes_per_row as usize;
                pixels.extend_from_slice(&data[start..end]);
            }
        }
        output_buffer.unmap();

        // The page overlay fades with scroll; bake that into the frame alpha.
        apply_canvas_opacity(&mut pixels, snapshot.canvas_opacity);

        let frame_path = out_dir.join(format!("frame_{:05}.png", i));
        image::save_buffer(&frame_path, &pixels, width, height, image::ColorType::Rgba8)?;

        if i % 60 == 0 {
            print!(".");
            std::io::stdout().flush()?;
        }
    }
    println!("\nDone.");

    director.teardown();
    Ok(())
}

fn apply_canvas_opacity(pixels: &mut [u8], opacity: f32) {
    if opacity >= 1.0 {
        return;
    }
    let k = opacity.clamp(0.0, 1.0);
    for px in pixels.chunks_exact_mut(4) {
        px[3] = (px[3] as f32 * k).round() as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_ramp_endpoints() {
        let ramp = ScrollRamp { from: 0.0, to: 800.0, viewport_height: 1000.0 };
        assert_eq!(ramp.offset_at(0, 5), 0.0);
        assert_eq!(ramp.offset_at(4, 5), 800.0);
        assert_eq!(ramp.offset_at(2, 5), 400.0);
        assert_eq!(ramp.offset_at(0, 1), 0.0);
    }

    #[test]
    fn test_frame_count_rejects_bad_rate() {
        assert!(frame_count(0.0, 1.0).is_err());
        assert!(frame_count(f32::NAN, 1.0).is_err());
        assert!(frame_count(60.0, -1.0).is_err());
        assert_eq!(frame_count(60.0, 1.0).unwrap(), 60);
    }

    #[test]
    fn test_canvas_opacity_scales_alpha_only() {
        let mut px = vec![10, 20, 30, 200];
        apply_canvas_opacity(&mut px, 0.5);
        assert_eq!(px, vec![10, 20, 30, 100]);
    }

    #[test]
    fn test_timeline_line_is_flat_json() {
        let line = TimelineLine {
            tick: 3,
            phase: DrawPhase::Drawing,
            state: AnimationState::default(),
            bloom_center: 0.0,
        };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["phase"], "drawing");
        assert!(json.get("drawProgress").is_some());
    }
}
