use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlCanvasElement;

use crate::config::SceneConfig;
use crate::director::SceneDirector;
use crate::gpu::renderer::Renderer;
use crate::schedule::{CancelToken, Subscription};

#[wasm_bindgen]
pub struct WasmEnsoScene {
    inner: Rc<RefCell<Option<SceneContext>>>,
    scroll_listener: Option<Subscription>,
}

struct SceneContext {
    renderer: Renderer,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    director: SceneDirector,
}

#[wasm_bindgen]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

fn viewport_height(window: &web_sys::Window) -> f32 {
    window
        .inner_height()
        .ok()
        .and_then(|h| h.as_f64())
        .unwrap_or(0.0) as f32
}

#[wasm_bindgen]
impl WasmEnsoScene {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        panic!("Use create_enso_scene async constructor");
    }

    /// Advance to `elapsed` seconds since mount and draw one frame.
    pub fn frame(&self, elapsed: f32) {
        let mut inner = self.inner.borrow_mut();
        let Some(ctx) = inner.as_mut() else { return };

        ctx.director.frame(elapsed);
        let snapshot = ctx.director.snapshot();

        match ctx.surface.get_current_texture() {
            Ok(output) => {
                let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
                ctx.renderer.render(&view, &snapshot);
                output.present();
            }
            Err(wgpu::SurfaceError::Lost) => {
                ctx.renderer.resize(ctx.config.width, ctx.config.height);
                ctx.surface.configure(ctx.renderer.device(), &ctx.config);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Surface out of memory");
            }
            Err(e) => {
                log::warn!("Surface error: {:?}", e);
            }
        }
    }

    pub fn set_scroll(&self, scroll_offset: f32, viewport_height: f32) {
        if let Some(ctx) = self.inner.borrow_mut().as_mut() {
            ctx.director.on_scroll(scroll_offset, viewport_height);
        }
    }

    /// Current overlay opacity for the host page, `1 - 0.6 * scroll`.
    pub fn canvas_opacity(&self) -> f32 {
        self.inner
            .borrow()
            .as_ref()
            .map(|ctx| ctx.director.snapshot().canvas_opacity)
            .unwrap_or(0.0)
    }

    /// Current animation state as JSON.
    pub fn state_json(&self) -> String {
        self.inner
            .borrow()
            .as_ref()
            .and_then(|ctx| serde_json::to_string(ctx.director.state()).ok())
            .unwrap_or_else(|| "null".to_string())
    }

    /// Subscribe to window scroll events with a passive listener.
    pub fn attach_scroll_listener(&mut self) -> Result<(), JsValue> {
        if self.scroll_listener.is_some() {
            return Ok(());
        }
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;

        let token: CancelToken = match self.inner.borrow().as_ref() {
            Some(ctx) => ctx.director.cancel_token(),
            None => return Err(JsValue::from_str("Scene disposed")),
        };
        let inner = Rc::clone(&self.inner);
        let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
            if token.is_cancelled() {
                return;
            }
            let Some(window) = web_sys::window() else { return };
            let offset = window.scroll_y().unwrap_or(0.0) as f32;
            let height = viewport_height(&window);
            if let Ok(mut guard) = inner.try_borrow_mut() {
                if let Some(ctx) = guard.as_mut() {
                    ctx.director.on_scroll(offset, height);
                }
            }
        });

        let options = web_sys::AddEventListenerOptions::new();
        options.set_passive(true);
        window.add_event_listener_with_callback_and_add_event_listener_options(
            "scroll",
            closure.as_ref().unchecked_ref(),
            &options,
        )?;

        // Pick up the scroll position the page loaded with.
        if let Some(ctx) = self.inner.borrow_mut().as_mut() {
            ctx.director
                .on_scroll(window.scroll_y().unwrap_or(0.0) as f32, viewport_height(&window));
        }

        self.scroll_listener = Some(Subscription::new(move || {
            let _ = window.remove_event_listener_with_callback("scroll", closure.as_ref().unchecked_ref());
            drop(closure);
        }));
        Ok(())
    }

    pub fn resize(&self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        let mut inner = self.inner.borrow_mut();
        let Some(ctx) = inner.as_mut() else { return };

        ctx.renderer.resize(width, height);
        ctx.config.width = width;
        ctx.config.height = height;

        ctx.surface.configure(ctx.renderer.device(), &ctx.config);
    }

    /// Cancel the schedule, detach the scroll listener and release GPU state.
    /// Safe to call more than once.
    pub fn dispose(&mut self) {
        if let Some(mut listener) = self.scroll_listener.take() {
            listener.detach();
        }
        if let Some(mut ctx) = self.inner.borrow_mut().take() {
            ctx.director.teardown();
        }
    }
}

// `free()` from JS drops the scene without calling `dispose`.
impl Drop for WasmEnsoScene {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[wasm_bindgen]
pub async fn create_enso_scene(canvas: HtmlCanvasElement, config_json: Option<String>) -> Result<WasmEnsoScene, JsValue> {
    init_panic_hook();

    let scene_config = match config_json {
        Some(json) => serde_json::from_str::<SceneConfig>(&json)
            .map_err(|e| JsValue::from_str(&format!("Invalid scene config: {}", e)))?,
        None => SceneConfig::default(),
    };
    let director = SceneDirector::mount(scene_config)
        .map_err(|e| JsValue::from_str(&format!("Failed to build enso geometry: {}", e)))?;

    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        dx12_shader_compiler: Default::default(),
        flags: wgpu::InstanceFlags::default(),
        gles_minor_version: wgpu::Gles3MinorVersion::Automatic,
    });

    let target = wgpu::SurfaceTarget::Canvas(canvas.clone());
    let surface = instance
        .create_surface(target)
        .map_err(|e| JsValue::from_str(&format!("Failed to create surface: {}", e)))?;

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::None,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| JsValue::from_str("Failed to find an appropriate adapter"))?;

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
                memory_hints: Default::default(),
            },
            None,
        )
        .await
        .map_err(|e| JsValue::from_str(&format!("Failed to create device: {}", e)))?;

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .copied()
        .find(|f: &wgpu::TextureFormat| f.is_srgb())
        .or_else(|| surface_caps.formats.first().copied())
        .ok_or_else(|| JsValue::from_str("Surface has no supported formats"))?;

    // The canvas overlays the page, so prefer a compositing alpha mode.
    let alpha_mode = surface_caps
        .alpha_modes
        .iter()
        .copied()
        .find(|m| *m == wgpu::CompositeAlphaMode::PreMultiplied)
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);

    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: canvas.width().max(1),
        height: canvas.height().max(1),
        present_mode: wgpu::PresentMode::Fifo,
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&device, &config);

    let renderer = Renderer::new(device, queue, config.format, config.width, config.height, &director);

    Ok(WasmEnsoScene {
        inner: Rc::new(RefCell::new(Some(SceneContext {
            renderer,
            surface,
            config,
            director,
        }))),
        scroll_listener: None,
    })
}
