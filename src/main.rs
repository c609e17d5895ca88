use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;
use tracing::{error, info};
use winit::{
    event::*,
    event_loop::EventLoop,
    keyboard::PhysicalKey,
    window::Window,
};

// Import from the library crate
use astrawalk::{
    assets::{GltfAssetProvider, LoadingManager},
    config::GameConfig,
    controller::{InputEvent, MouseButton as GameButton},
    frame_loop::FrameLoop,
    load_world, logging,
    view::{GpuContext, SceneRenderer},
    Game,
};

/// Wheel "lines" are scaled to roughly match browser `deltaY` pixels.
const LINE_DELTA_PIXELS: f32 = 100.0;

struct App {
    window: Arc<Window>,
    renderer: SceneRenderer,
    egui_state: egui_winit::State,

    game: Rc<RefCell<Game>>,
    manager: Rc<LoadingManager<GltfAssetProvider>>,
    pool: LocalPool,
    frame_loop: FrameLoop,

    started: Instant,
    last_cursor: Option<(f64, f64)>,
}

impl App {
    async fn new(window: Arc<Window>) -> Result<Self, astrawalk::error::StartupError> {
        let size = window.inner_size();
        let gpu = GpuContext::new_native(window.clone(), size.width, size.height).await?;

        let mut renderer = SceneRenderer::new(gpu);
        renderer.set_pixels_per_point(window.scale_factor() as f32);
        let egui_state = egui_winit::State::new(
            renderer.egui_ctx().clone(),
            egui::ViewportId::ROOT,
            window.as_ref(),
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let game = Rc::new(RefCell::new(Game::new(GameConfig::default(), size.width, size.height)));
        let manager = Rc::new(LoadingManager::new(GltfAssetProvider::from_env()));
        let pool = LocalPool::new();
        if let Err(err) = pool.spawner().spawn_local(load_world(game.clone(), manager.clone())) {
            error!(error = %err, "could not start asset loading");
        }

        Ok(Self {
            window,
            renderer,
            egui_state,
            game,
            manager,
            pool,
            frame_loop: FrameLoop::new(),
            started: Instant::now(),
            last_cursor: None,
        })
    }

    fn input(&mut self, event: &WindowEvent) -> bool {
        // the preloader has no widgets, so egui never consumes input
        let _ = self.egui_state.on_window_event(self.window.as_ref(), event);

        let game_event = match event {
            WindowEvent::KeyboardInput {
                event: KeyEvent { state, physical_key: PhysicalKey::Code(code), .. },
                ..
            } => {
                let code = format!("{code:?}");
                match state {
                    ElementState::Pressed => InputEvent::KeyDown(code),
                    ElementState::Released => InputEvent::KeyUp(code),
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = match button {
                    MouseButton::Right => GameButton::Right,
                    MouseButton::Middle => GameButton::Middle,
                    _ => GameButton::Left,
                };
                InputEvent::MouseButton { button, is_down: *state == ElementState::Pressed }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let previous = self.last_cursor.replace((position.x, position.y));
                let Some((x, y)) = previous else { return true };
                InputEvent::MouseMove { dx: (position.x - x) as f32, dy: (position.y - y) as f32 }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y * LINE_DELTA_PIXELS,
                    MouseScrollDelta::PixelDelta(p) => -p.y as f32,
                };
                InputEvent::MouseWheel { delta_y }
            }
            _ => return false,
        };

        self.game.borrow_mut().handle_input(&game_event);
        true
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.renderer.resize(new_size.width, new_size.height);
        self.game.borrow_mut().resize(new_size.width, new_size.height);
    }

    fn redraw(&mut self) {
        // let pending loads make progress
        self.pool.run_until_stalled();

        self.renderer.set_pixels_per_point(self.window.scale_factor() as f32);
        let raw_input = self.egui_state.take_egui_input(&self.window);
        self.renderer.queue_egui_input(raw_input);

        let now_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut game = self.game.borrow_mut();
        self.frame_loop.frame(now_ms, &mut *game, &*self.manager, &mut self.renderer);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let event_loop = EventLoop::new()?;
    let window_attributes = Window::default_attributes()
        .with_title("astrawalk")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
    #[allow(deprecated)]
    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut app = match pollster::block_on(App::new(window.clone())) {
        Ok(app) => app,
        Err(err) => {
            error!(error = %err, "this machine does not seem to support the required graphics features");
            return Err(err.into());
        }
    };
    info!("astrawalk started");

    #[allow(deprecated)]
    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { ref event, window_id } if window_id == app.window.id() => {
            if !app.input(event) {
                match event {
                    WindowEvent::CloseRequested => elwt.exit(),
                    WindowEvent::Resized(physical_size) => app.resize(*physical_size),
                    WindowEvent::RedrawRequested => app.redraw(),
                    _ => {}
                }
            }
        }
        Event::AboutToWait => {
            app.window.request_redraw();
        }
        Event::LoopExiting => info!("event loop exiting"),
        _ => {}
    })?;

    Ok(())
}
