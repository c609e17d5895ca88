use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use glam::{Quat, Vec3};

use astrawalk::assets::{AssetProvider, LoadProgress, LoadingManager};
use astrawalk::config::GameConfig;
use astrawalk::controller::InputEvent;
use astrawalk::error::AssetError;
use astrawalk::frame_loop::{FrameLoop, FrameRenderer};
use astrawalk::model::{
    AnimationData, Camera, Clip, Interpolation, Material, Mesh, ObjectGraph, PlayerState, Scene, Track, TrackValues,
    Transform,
};
use astrawalk::{load_world, Game};

#[derive(Default)]
struct FakeAssets {
    graphs: HashMap<String, ObjectGraph>,
}

impl AssetProvider for FakeAssets {
    fn load(&self, path: &str) -> LocalBoxFuture<'_, Result<ObjectGraph, AssetError>> {
        let result = self.graphs.get(path).cloned().ok_or_else(|| AssetError::Fetch {
            path: path.to_string(),
            reason: "HTTP 404".to_string(),
        });
        async move { result }.boxed_local()
    }
}

#[derive(Default)]
struct FrameLog {
    loading: Vec<LoadProgress>,
    scenes: usize,
}

impl FrameRenderer for FrameLog {
    fn render_loading(&mut self, progress: LoadProgress) {
        self.loading.push(progress);
    }

    fn render_scene(&mut self, _scene: &Scene, _camera: &Camera) {
        self.scenes += 1;
    }
}

/// 40 wide, 180 tall, 40 deep, feet at the origin.
fn character() -> ObjectGraph {
    let mut graph = ObjectGraph::new("astra");
    let hips = graph.add_node("Hips", Transform::IDENTITY, None);
    let positions = vec![
        Vec3::new(-20.0, 0.0, -20.0),
        Vec3::new(20.0, 0.0, 20.0),
        Vec3::new(0.0, 180.0, 0.0),
    ];
    graph.nodes[hips].mesh = Some(Mesh::new(positions, Vec::new(), vec![0, 1, 2], Material::default()));
    graph
}

fn clip_file(name: &str) -> ObjectGraph {
    let mut graph = ObjectGraph::new(name);
    graph.animations.push(AnimationData::new(
        name,
        vec![Track {
            target: "Hips".into(),
            times: vec![0.0, 1.0],
            values: TrackValues::Rotation(vec![Quat::IDENTITY, Quat::from_rotation_y(0.5)]),
            interpolation: Interpolation::Linear,
        }],
    ));
    graph
}

/// A solid wall facing the spawn point at `z`, centred on the x axis.
fn wall(graph: &mut ObjectGraph, name: &str, z: f32) {
    let id = graph.add_node(name, Transform::IDENTITY, None);
    let positions = vec![
        Vec3::new(-100.0, -100.0, z),
        Vec3::new(100.0, -100.0, z),
        Vec3::new(0.0, 100.0, z),
    ];
    graph.nodes[id].mesh = Some(Mesh::new(positions, Vec::new(), vec![0, 1, 2], Material::default()));
}

fn room() -> ObjectGraph {
    let mut graph = ObjectGraph::new("scifi");
    wall(&mut graph, "cable_bundle", 570.0);
    wall(&mut graph, "bulkhead", 500.0);
    graph
}

fn assets(with_clips: bool) -> FakeAssets {
    let config = GameConfig::default();
    let mut assets = FakeAssets::default();
    assets.graphs.insert(config.assets.character.clone(), character());
    assets.graphs.insert(config.assets.environment.clone(), room());
    if with_clips {
        for clip in Clip::LOAD_ORDER {
            assets
                .graphs
                .insert(config.assets.animation(clip.file_stem()), clip_file(clip.file_stem()));
        }
    }
    assets
}

fn loaded_game(with_clips: bool) -> (Rc<RefCell<Game>>, Rc<LoadingManager<FakeAssets>>) {
    let game = Rc::new(RefCell::new(Game::new(GameConfig::default(), 1280, 720)));
    let manager = Rc::new(LoadingManager::new(assets(with_clips)));
    futures::executor::block_on(load_world(game.clone(), manager.clone()));
    (game, manager)
}

#[test]
fn loading_enters_standing_and_builds_obstacles() {
    let (game, manager) = loaded_game(true);
    let game = game.borrow();

    assert_eq!(game.player.state(), Some(PlayerState::Standing));
    assert_eq!(game.player.clips().count(), Clip::LOAD_ORDER.len());
    assert_eq!(manager.progress(), LoadProgress { settled: 7, total: 7, failed: 0 });

    let names: Vec<_> = game.obstacles.iter().map(|o| (o.name.as_str(), o.pass_through)).collect();
    assert_eq!(names, [("cable_bundle", true), ("bulkhead", false)]);
    assert_eq!(game.scene.character.as_ref().map(|c| c.name.as_str()), Some("Character"));
    assert!((game.player.geometry.height - 180.0).abs() < 1e-4);
}

#[test]
fn first_frame_after_loading_frames_the_camera_behind_the_player() {
    let (game, manager) = loaded_game(true);
    let mut renderer = FrameLog::default();
    let mut frames = FrameLoop::new();

    frames.frame(0.0, &mut *game.borrow_mut(), &*manager, &mut renderer);

    let game = game.borrow();
    assert!(game.preload.is_hidden());
    assert_eq!(renderer.scenes, 1);
    assert!(renderer.loading.is_empty());
    assert!((game.camera.target - Vec3::new(0.0, 135.0, 600.0)).length() < 1e-3);
    assert!((game.camera.eye - Vec3::new(0.0, 135.0, 800.0)).length() < 1e-3);
}

#[test]
fn walking_stops_short_of_solid_walls_and_ignores_cables() {
    let (game, manager) = loaded_game(true);
    let mut renderer = FrameLog::default();
    let mut frames = FrameLoop::new();

    frames.frame(0.0, &mut *game.borrow_mut(), &*manager, &mut renderer);
    game.borrow_mut().handle_input(&InputEvent::KeyDown("KeyW".into()));
    assert_eq!(game.borrow().player.state(), Some(PlayerState::WalkingForward));

    let mut track = Vec::new();
    for step in 1..=20 {
        frames.frame(step as f64 * 100.0, &mut *game.borrow_mut(), &*manager, &mut renderer);
        track.push(game.borrow().player.transform.translation.z);
    }

    // walked through the cable at 570 and came to rest before the wall
    let z = track[track.len() - 1];
    assert!((track[0] - 585.0).abs() < 1e-2, "first step covers 15 units, got {}", track[0]);
    assert_eq!(track[track.len() - 2], z);
    assert!(z < 570.0, "player should pass the cable, got z = {z}");
    assert!(z > 500.0 && z <= 540.0 + 1e-3, "player should stop before the wall, got z = {z}");

    // camera kept its offset from the player
    let game_ref = game.borrow();
    assert!((game_ref.camera.target.z - z).abs() < 1e-3);
    drop(game_ref);

    game.borrow_mut().handle_input(&InputEvent::KeyUp("KeyW".into()));
    assert_eq!(game.borrow().player.state(), Some(PlayerState::Standing));
}

#[test]
fn a_long_frame_walks_the_full_elapsed_distance() {
    let (game, manager) = loaded_game(true);
    let mut renderer = FrameLog::default();
    let mut frames = FrameLoop::new();

    frames.frame(0.0, &mut *game.borrow_mut(), &*manager, &mut renderer);
    game.borrow_mut().handle_input(&InputEvent::KeyDown("KeyW".into()));
    frames.frame(250.0, &mut *game.borrow_mut(), &*manager, &mut renderer);

    // 150 units/s for a quarter second, nothing within reach yet
    let z = game.borrow().player.transform.translation.z;
    assert!((z - 562.5).abs() < 1e-2, "expected 37.5 units of travel, got z = {z}");
}

#[test]
fn failed_clips_leave_the_player_idle_but_frames_still_render() {
    let (game, manager) = loaded_game(false);
    assert_eq!(game.borrow().player.state(), None);
    assert_eq!(manager.progress().failed, Clip::LOAD_ORDER.len());

    let mut renderer = FrameLog::default();
    let mut frames = FrameLoop::new();
    game.borrow_mut().handle_input(&InputEvent::KeyDown("ArrowUp".into()));
    frames.frame(0.0, &mut *game.borrow_mut(), &*manager, &mut renderer);
    frames.frame(100.0, &mut *game.borrow_mut(), &*manager, &mut renderer);

    let game = game.borrow();
    assert_eq!(game.player.state(), None);
    assert_eq!(game.player.transform.translation, Vec3::new(0.0, 0.0, 600.0));
    assert_eq!(renderer.scenes, 2);
}
