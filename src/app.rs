//! Window, event loop and per-frame driver.
//!
//! [`run`] opens a window, creates the [`GpuContext`], builds the scene
//! through a factory closure and then, every frame: applies WASD and mouse
//! input to the [`Camera`], calls [`Scene::update`], and records
//! [`Scene::render`] into one command encoder against the swapchain image.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{CursorGrabMode, Window, WindowAttributes, WindowId};

use crate::assets::{DEFAULT_RESOURCE_ROOT, ResourceDirs};
use crate::camera::Camera;
use crate::error::{Error, Result};
use crate::gpu::GpuContext;
use crate::input::Input;
use crate::render_target::SurfaceDepth;
use crate::scene::{FrameContext, Scene};

/// Window and run-loop settings.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resource_root: PathBuf,
    pub clear_color: wgpu::Color,
    /// Hide and grab the cursor so the mouse steers the camera freely.
    pub capture_cursor: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Caruti Engine".to_string(),
            width: 1920,
            height: 1080,
            resource_root: PathBuf::from(DEFAULT_RESOURCE_ROOT),
            clear_color: wgpu::Color {
                r: 0.1,
                g: 0.1,
                b: 0.1,
                a: 1.0,
            },
            capture_cursor: true,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.resource_root = root.into();
        self
    }

    pub fn clear_color(mut self, color: wgpu::Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn capture_cursor(mut self, capture: bool) -> Self {
        self.capture_cursor = capture;
        self
    }
}

/// Builds the scene once the GPU is up.
pub type SceneFactory = Box<dyn FnOnce(&GpuContext, &ResourceDirs) -> Box<dyn Scene>>;

/// Open the window and drive `factory`'s scene until the window closes or
/// Escape is pressed.
///
/// # Example
/// ```no_run
/// use caruti::{AppConfig, WoodFloorScene, run};
///
/// caruti::logging::init();
/// run(AppConfig::new().title("Shadows"), |gpu, dirs| {
///     Box::new(WoodFloorScene::new(gpu, dirs))
/// })
/// .unwrap();
/// ```
pub fn run<F>(config: AppConfig, factory: F) -> Result<()>
where
    F: FnOnce(&GpuContext, &ResourceDirs) -> Box<dyn Scene> + 'static,
{
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = CarutiApp {
        state: AppState::Pending {
            config,
            factory: Some(Box::new(factory)),
        },
        error: None,
    };
    event_loop.run_app(&mut app)?;

    match app.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct CarutiApp {
    state: AppState,
    /// First fatal error; handed back by [`run`] after the loop exits.
    error: Option<Error>,
}

enum AppState {
    Pending {
        config: AppConfig,
        factory: Option<SceneFactory>,
    },
    Running {
        window: Arc<Window>,
        gpu: GpuContext,
        scene: Box<dyn Scene>,
        camera: Camera,
        input: Input,
        depth: SurfaceDepth,
        clear_color: wgpu::Color,
        capture_cursor: bool,
        cursor_synced: bool,
        start_time: Instant,
        last_frame: Instant,
    },
}

impl CarutiApp {
    fn start(
        event_loop: &ActiveEventLoop,
        config: &AppConfig,
        factory: SceneFactory,
    ) -> Result<AppState> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(config.width, config.height));
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        if config.capture_cursor {
            let grabbed = window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
            if let Err(err) = grabbed {
                log::warn!("could not grab cursor: {err}");
            }
            window.set_cursor_visible(false);
        }

        let gpu = GpuContext::new(window.clone())?;
        let dirs = ResourceDirs::new(&config.resource_root);
        let scene = factory(&gpu, &dirs);
        let mut camera = scene.initial_camera();
        // Raw motion accumulates from the origin.
        camera.sync_cursor(0.0, 0.0);
        let depth = SurfaceDepth::new(&gpu);

        log::info!("running {}x{}", gpu.width(), gpu.height());
        Ok(AppState::Running {
            window,
            gpu,
            scene,
            camera,
            input: Input::new(),
            depth,
            clear_color: config.clear_color,
            capture_cursor: config.capture_cursor,
            cursor_synced: false,
            start_time: Instant::now(),
            last_frame: Instant::now(),
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: Error) {
        log::error!("{err}");
        self.error.get_or_insert(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for CarutiApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let AppState::Pending { config, factory } = &mut self.state else {
            return;
        };
        let Some(factory) = factory.take() else {
            return;
        };
        match Self::start(event_loop, config, factory) {
            Ok(state) => self.state = state,
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        if let AppState::Running {
            input,
            capture_cursor: true,
            ..
        } = &mut self.state
        {
            input.handle_device_event(&event);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let AppState::Running {
            window,
            gpu,
            scene,
            camera,
            input,
            depth,
            clear_color,
            capture_cursor,
            cursor_synced,
            start_time,
            last_frame,
        } = &mut self.state
        else {
            return;
        };

        input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                gpu.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                if input.key_pressed(KeyCode::Escape) {
                    event_loop.exit();
                    return;
                }

                let now = Instant::now();
                let time = start_time.elapsed().as_secs_f32();
                let dt = now.duration_since(*last_frame).as_secs_f32();
                *last_frame = now;

                for movement in input.held_movements() {
                    camera.process_keyboard(movement, dt);
                }
                if *capture_cursor {
                    if input.pointer_moved() {
                        let p = input.pointer();
                        camera.process_mouse_movement(p.x, p.y, true);
                    }
                } else if let (true, Some(p)) = (input.cursor_moved(), input.cursor_position()) {
                    if *cursor_synced {
                        camera.process_mouse_movement(p.x, p.y, true);
                    } else {
                        camera.sync_cursor(p.x, p.y);
                        *cursor_synced = true;
                    }
                }

                scene.update(dt, time, camera);

                gpu.begin_frame();
                depth.ensure_size(gpu);

                let output = match gpu.surface.get_current_texture() {
                    Ok(output) => output,
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        gpu.reconfigure();
                        window.request_redraw();
                        return;
                    }
                    Err(wgpu::SurfaceError::Timeout) => {
                        log::warn!("surface timed out, skipping frame");
                        window.request_redraw();
                        return;
                    }
                    Err(err) => {
                        log::error!("cannot acquire surface texture: {err}");
                        event_loop.exit();
                        return;
                    }
                };
                let view = output
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                let mut encoder = gpu
                    .device
                    .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                        label: Some("Frame Encoder"),
                    });

                let mut frame = FrameContext {
                    gpu,
                    encoder: &mut encoder,
                    target: &view,
                    depth: depth.view(),
                    camera,
                    clear_color: *clear_color,
                    time,
                    dt,
                };
                scene.render(&mut frame);

                gpu.queue.submit(std::iter::once(encoder.finish()));
                window.pre_present_notify();
                output.present();

                input.begin_frame();
                window.request_redraw();
            }
            _ => {}
        }
    }
}
