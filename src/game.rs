use std::cell::RefCell;
use std::rc::Rc;

use futures::future::join_all;
use tracing::{info, warn};

use crate::assets::{AssetProvider, LoadingManager, PreloadGate};
use crate::config::GameConfig;
use crate::controller::camera_controller::{frame_camera, OrbitControls};
use crate::controller::collision::{obstacles_from, ObstacleNode};
use crate::controller::input::{InputEvent, KeyBindings};
use crate::controller::player_controller::PlayerController;
use crate::controller::scene_composer::{compose_character, compose_environment, compose_scene};
use crate::error::AssetError;
use crate::frame_loop::FrameRenderer;
use crate::model::{AnimationData, AnimationMixer, Camera, Clip, Mixer, ObjectGraph, PlayerState, Scene};

/// Everything one running walkaround owns.
pub struct Game<M: Mixer = AnimationMixer> {
    pub config: GameConfig,
    pub scene: Scene,
    pub player: PlayerController<M>,
    pub camera: Camera,
    pub orbit: OrbitControls,
    /// Top-level environment nodes, in file order.
    pub obstacles: Vec<ObstacleNode>,
    pub preload: PreloadGate,
}

impl<M: Mixer> Game<M> {
    pub fn new(config: GameConfig, width: u32, height: u32) -> Self {
        let player = PlayerController::new(&config, KeyBindings::default());
        let camera = Camera::new(width, height, &config.camera);
        let orbit = OrbitControls::new(&config.camera);
        Self {
            config,
            scene: compose_scene(),
            player,
            camera,
            orbit,
            obstacles: Vec::new(),
            preload: PreloadGate::default(),
        }
    }

    /// Keys go to the player. The mouse drives the orbit camera once the
    /// camera has been framed.
    pub fn handle_input(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown(code) => self.player.key_down(code),
            InputEvent::KeyUp(code) => self.player.key_up(code),
            _ if self.preload.is_hidden() => {
                self.orbit.handle(event, &mut self.camera);
            }
            _ => {}
        }
    }

    pub fn set_environment(&mut self, mut environment: ObjectGraph) {
        compose_environment(&mut environment);
        self.obstacles = obstacles_from(&environment);
        info!(
            obstacles = self.obstacles.len(),
            pass_through = self.obstacles.iter().filter(|o| o.pass_through).count(),
            "environment ready"
        );
        self.scene.environment = Some(environment);
    }

    pub fn set_character(&mut self, mut character: ObjectGraph) {
        self.player.geometry = compose_character(&mut character, self.player.transform);
        self.scene.character = Some(character);
    }

    /// Called once every load has settled: take down the overlay and frame
    /// the camera behind the player.
    pub fn finish_loading(&mut self) {
        if self.preload.is_hidden() {
            return;
        }
        self.preload.hide();
        self.init_camera();
        info!(state = ?self.player.state(), "loading complete");
    }

    pub fn init_camera(&mut self) {
        frame_camera(&mut self.camera, &self.player.transform, &self.player.geometry, &self.config.camera);
        self.orbit.clamp(&mut self.camera);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_aspect(width, height);
    }

    /// One frame: turn, walk, advance the animation, draw.
    pub fn tick<R: FrameRenderer>(&mut self, delta: f32, renderer: &mut R) {
        self.player.apply_rotation(delta);
        if self.player.state().is_some_and(PlayerState::is_walking) {
            self.player
                .move_player(delta, &self.obstacles, &mut self.camera, &self.config.camera);
        }
        self.player.update_animation(delta);
        if let Some(character) = self.scene.character.as_mut() {
            self.player.pose(character);
        }
        renderer.render_scene(&self.scene, &self.camera);
    }
}

impl Game<AnimationMixer> {
    /// Bind the loaded clips to the character in load order. Returns how
    /// many clips became playable.
    pub fn register_clips(&mut self, clips: Vec<(Clip, AnimationData)>) -> usize {
        let Some(mixer) = self.player.mixer_mut() else {
            return 0;
        };
        let actions = clips
            .into_iter()
            .map(|(clip, data)| (clip, mixer.clip_action(Rc::new(data))))
            .collect::<Vec<_>>();
        let count = actions.len();
        for (clip, action) in actions {
            self.player.add_action(clip, action);
        }
        count
    }
}

/// The first animation in a clip file.
fn first_animation(path: &str, graph: ObjectGraph) -> Result<AnimationData, AssetError> {
    graph
        .animations
        .into_iter()
        .next()
        .ok_or_else(|| AssetError::NoAnimation { path: path.to_string() })
}

/// Load the character (then its clips) and the environment concurrently.
///
/// The player enters `Standing` only after every clip request has settled,
/// and only if at least one clip is playable.
pub async fn load_world<P: AssetProvider>(game: Rc<RefCell<Game>>, manager: Rc<LoadingManager<P>>) {
    let assets = game.borrow().config.assets.clone();

    let character = async {
        let Some(graph) = manager.load(&assets.character).await else {
            return;
        };
        {
            let mut game = game.borrow_mut();
            let mixer = AnimationMixer::new(&graph);
            game.player.install_mixer(mixer);
            game.set_character(graph);
        }

        let requests = Clip::LOAD_ORDER.map(|clip| {
            let path = assets.animation(clip.file_stem());
            let load = manager.load(&path);
            async move { (clip, path, load.await) }
        });
        let clips = join_all(requests)
            .await
            .into_iter()
            .filter_map(|(clip, path, graph)| match first_animation(&path, graph?) {
                Ok(data) => Some((clip, data)),
                Err(err) => {
                    warn!(error = %err, "There was an error loading {path}");
                    None
                }
            })
            .collect::<Vec<_>>();

        let mut game = game.borrow_mut();
        if game.register_clips(clips) > 0 {
            game.player.set_state(PlayerState::Standing);
        } else {
            warn!("no animation clips available; the player stays idle");
        }
    };

    let environment = async {
        if let Some(graph) = manager.load(&assets.environment).await {
            game.borrow_mut().set_environment(graph);
        }
    };

    futures::join!(character, environment);
}
