// Re-export all public modules so they can be used from main.rs
pub mod logging;
pub mod config;
pub mod error;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;

pub mod assets;
pub mod game;
pub mod frame_loop;

pub use game::{load_world, Game};

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;
    use std::rc::Rc;

    use tracing::{error, info, warn};
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};
    use web_sys::{Document, HtmlCanvasElement, KeyboardEvent, MouseEvent, WheelEvent, Window};

    use crate::assets::{GltfAssetProvider, LoadingManager};
    use crate::config::GameConfig;
    use crate::controller::input::{wasm, KeyBindings};
    use crate::error::StartupError;
    use crate::frame_loop::FrameLoop;
    use crate::game::{load_world, Game};
    use crate::logging;
    use crate::view::{GpuContext, SceneRenderer};

    const COMPATIBILITY_MESSAGE: &str =
        "Your graphics card does not seem to support WebGL. Find out how to get it at get.webgl.org.";

    /// Console handle to the running game: `const game = await start();`
    #[wasm_bindgen]
    pub struct GameHandle {
        game: Rc<RefCell<Game>>,
    }

    #[wasm_bindgen]
    impl GameHandle {
        /// Drive the state machine by name (`STAND`, `WALK_FORWARD`,
        /// `WALK_BACKWARD`). Anything else means `STAND`.
        pub fn set_player_state(&self, name: Option<String>) {
            self.game.borrow_mut().player.set_state_named(name.as_deref());
        }

        pub fn player_state(&self) -> Option<String> {
            self.game.borrow().player.state().map(|s| s.to_string())
        }
    }

    #[wasm_bindgen]
    pub async fn start() -> Result<GameHandle, JsValue> {
        logging::init();
        let (window, document, canvas) = init_canvas().map_err(js_error)?;
        setup_app(&window, &document, &canvas).await
    }

    async fn setup_app(window: &Window, document: &Document, canvas: &HtmlCanvasElement) -> Result<GameHandle, JsValue> {
        let (width, height) = (canvas.width(), canvas.height());

        let gpu = match GpuContext::new(canvas, width, height).await {
            Ok(gpu) => gpu,
            Err(err) => {
                error!(error = %err, "GPU init failed");
                show_compatibility_message(document)?;
                return Err(js_error(err));
            }
        };
        let mut renderer = SceneRenderer::new(gpu);
        renderer.set_pixels_per_point(window.device_pixel_ratio() as f32);

        let game = Rc::new(RefCell::new(Game::new(GameConfig::default(), width, height)));
        let manager = Rc::new(LoadingManager::new(GltfAssetProvider::from_env()));
        wasm_bindgen_futures::spawn_local(load_world(game.clone(), manager.clone()));

        setup_input_listeners(document, canvas, game.clone())?;

        let performance = window.performance();
        let mut frame_loop = FrameLoop::new();
        let game_for_loop = game.clone();
        RcCellCallback::new(window.clone(), move || {
            let now = performance.as_ref().map(|p| p.now()).unwrap_or(0.0);
            let mut game = game_for_loop.borrow_mut();
            frame_loop.frame(now, &mut *game, &*manager, &mut renderer);
        })
        .start();

        info!(width, height, "astrawalk started");
        Ok(GameHandle { game })
    }

    fn setup_input_listeners(
        document: &Document,
        canvas: &HtmlCanvasElement,
        game: Rc<RefCell<Game>>,
    ) -> Result<(), JsValue> {
        let bindings = KeyBindings::default();

        // Keyboard down
        {
            let game = game.clone();
            let bindings = bindings.clone();
            let keydown = Closure::wrap(Box::new(move |e: KeyboardEvent| {
                if bindings.is_bound(&e.code()) {
                    e.prevent_default();
                }
                game.borrow_mut().handle_input(&wasm::keyboard_event_to_input(&e, true));
            }) as Box<dyn FnMut(KeyboardEvent)>);
            document.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
            keydown.forget();
        }

        // Keyboard up
        {
            let game = game.clone();
            let keyup = Closure::wrap(Box::new(move |e: KeyboardEvent| {
                if bindings.is_bound(&e.code()) {
                    e.prevent_default();
                }
                game.borrow_mut().handle_input(&wasm::keyboard_event_to_input(&e, false));
            }) as Box<dyn FnMut(KeyboardEvent)>);
            document.add_event_listener_with_callback("keyup", keyup.as_ref().unchecked_ref())?;
            keyup.forget();
        }

        // Mouse down on the canvas starts an orbit drag
        {
            let game = game.clone();
            let mousedown = Closure::wrap(Box::new(move |e: MouseEvent| {
                game.borrow_mut().handle_input(&wasm::mouse_button_to_input(&e, true));
                e.prevent_default();
            }) as Box<dyn FnMut(MouseEvent)>);
            canvas.add_event_listener_with_callback("mousedown", mousedown.as_ref().unchecked_ref())?;
            mousedown.forget();
        }

        // Mouse up anywhere ends it
        {
            let game = game.clone();
            let mouseup = Closure::wrap(Box::new(move |e: MouseEvent| {
                game.borrow_mut().handle_input(&wasm::mouse_button_to_input(&e, false));
            }) as Box<dyn FnMut(MouseEvent)>);
            document.add_event_listener_with_callback("mouseup", mouseup.as_ref().unchecked_ref())?;
            mouseup.forget();
        }

        // Mouse move
        {
            let game = game.clone();
            let mm = Closure::wrap(Box::new(move |e: MouseEvent| {
                game.borrow_mut().handle_input(&wasm::mouse_move_to_input(&e));
            }) as Box<dyn FnMut(MouseEvent)>);
            document.add_event_listener_with_callback("mousemove", mm.as_ref().unchecked_ref())?;
            mm.forget();
        }

        // Mouse wheel
        {
            let wheel = Closure::wrap(Box::new(move |e: WheelEvent| {
                game.borrow_mut().handle_input(&wasm::wheel_to_input(&e));
                e.prevent_default();
            }) as Box<dyn FnMut(WheelEvent)>);
            canvas.add_event_listener_with_callback("wheel", wheel.as_ref().unchecked_ref())?;
            wheel.forget();
        }

        Ok(())
    }

    /// Full-window canvas, sized once at startup.
    fn init_canvas() -> Result<(Window, Document, HtmlCanvasElement), StartupError> {
        let window = web_sys::window().ok_or(StartupError::NoWindow)?;
        let document = window.document().ok_or(StartupError::NoDocument)?;
        let body = document.body().ok_or(StartupError::NoDocument)?;
        let canvas = document
            .create_element("canvas")
            .ok()
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
            .ok_or(StartupError::Canvas)?;

        let dpr = window.device_pixel_ratio();
        let css_width = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(800.0);
        let css_height = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(600.0);
        canvas.set_width((css_width * dpr).round() as u32);
        canvas.set_height((css_height * dpr).round() as u32);
        canvas
            .set_attribute("style", "display: block; width: 100vw; height: 100vh;")
            .map_err(|_| StartupError::Canvas)?;
        if let Err(err) = body.set_attribute("style", "margin: 0; overflow: hidden; background: #000;") {
            warn!(error = ?err, "could not style the page body");
        }
        body.append_child(&canvas).map_err(|_| StartupError::Canvas)?;

        Ok((window, document, canvas))
    }

    fn show_compatibility_message(document: &Document) -> Result<(), JsValue> {
        let body = document.body().ok_or_else(|| js_error(StartupError::NoDocument))?;
        let message = document.create_element("div")?;
        message.set_id("compatibility-message");
        message.set_attribute(
            "style",
            "font-family: monospace; font-size: 13px; text-align: center; background: #fff; \
             color: #000; padding: 1.5em; width: 400px; margin: 5em auto 0;",
        )?;
        message.set_text_content(Some(COMPATIBILITY_MESSAGE));
        body.append_child(&message)?;
        Ok(())
    }

    fn js_error(err: impl std::fmt::Display) -> JsValue {
        JsValue::from_str(&err.to_string())
    }

    struct RcCellCallback {
        inner: Rc<RefCell<Box<dyn FnMut()>>>,
        window: Window,
    }

    impl RcCellCallback {
        fn new(window: Window, f: impl FnMut() + 'static) -> Self {
            Self {
                inner: Rc::new(RefCell::new(Box::new(f))),
                window,
            }
        }

        fn start(self) {
            let inner = self.inner.clone();
            let window = self.window.clone();

            let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
            let callback_clone = callback.clone();

            *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
                inner.borrow_mut().as_mut()();

                // Schedule the next frame
                if let Some(cb) = callback_clone.borrow().as_ref() {
                    if let Err(err) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                        warn!(error = ?err, "requestAnimationFrame failed; frame loop stopped");
                    }
                }
            }) as Box<dyn FnMut()>));

            if let Some(cb) = callback.borrow().as_ref() {
                if let Err(err) = self.window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    error!(error = ?err, "requestAnimationFrame failed; frame loop not started");
                }
            }

            // Leak the closure to keep it alive
            std::mem::forget(callback);
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::{start, GameHandle};
