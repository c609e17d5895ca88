use crate::assets::{AssetProvider, LoadProgress, LoadingManager};
use crate::game::Game;
use crate::model::{Camera, Mixer, Scene};

/// Something that can put a frame on screen.
pub trait FrameRenderer {
    /// The loading overlay, shown until every asset request has settled.
    fn render_loading(&mut self, progress: LoadProgress);
    fn render_scene(&mut self, scene: &Scene, camera: &Camera);
}

/// Converts host timestamps (milliseconds) into frame deltas (seconds).
#[derive(Debug, Default, Clone)]
pub struct FrameClock {
    last_ms: Option<f64>,
}

impl FrameClock {
    /// Zero on the first call. Later calls return the full elapsed time, never
    /// negative.
    pub fn tick(&mut self, now_ms: f64) -> f32 {
        let delta = match self.last_ms {
            Some(last) => ((now_ms - last) / 1000.0).max(0.0) as f32,
            None => 0.0,
        };
        self.last_ms = Some(now_ms);
        delta
    }
}

/// Per-frame driver shared by the web and native hosts.
#[derive(Debug, Default)]
pub struct FrameLoop {
    clock: FrameClock,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame<M, P, R>(&mut self, now_ms: f64, game: &mut Game<M>, manager: &LoadingManager<P>, renderer: &mut R)
    where
        M: Mixer,
        P: AssetProvider,
        R: FrameRenderer,
    {
        let delta = self.clock.tick(now_ms);
        if !game.preload.is_hidden() {
            if !manager.all_done() {
                renderer.render_loading(manager.progress());
                return;
            }
            game.finish_loading();
        }
        game.tick(delta, renderer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::tests::MemoryProvider;
    use crate::config::GameConfig;
    use crate::model::{AnimationMixer, ObjectGraph};

    #[derive(Default)]
    struct CountingRenderer {
        loading: Vec<LoadProgress>,
        scenes: usize,
    }

    impl FrameRenderer for CountingRenderer {
        fn render_loading(&mut self, progress: LoadProgress) {
            self.loading.push(progress);
        }
        fn render_scene(&mut self, _scene: &Scene, _camera: &Camera) {
            self.scenes += 1;
        }
    }

    #[test]
    fn first_delta_is_zero_and_later_ones_are_elapsed_seconds() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.tick(1_000.0), 0.0);
        assert!((clock.tick(1_016.0) - 0.016).abs() < 1e-6);
        assert!((clock.tick(1_266.0) - 0.25).abs() < 1e-6);
        assert!((clock.tick(9_266.0) - 8.0).abs() < 1e-6);
        assert_eq!(clock.tick(8_000.0), 0.0);
    }

    #[test]
    fn scene_renders_only_after_loads_settle() {
        let mut provider = MemoryProvider::default();
        provider.graphs.insert("room.glb".into(), ObjectGraph::new("room"));
        let manager = LoadingManager::new(provider);
        let mut game: Game<AnimationMixer> = Game::new(GameConfig::default(), 800, 600);
        let mut renderer = CountingRenderer::default();
        let mut frames = FrameLoop::new();

        // nothing requested yet
        frames.frame(0.0, &mut game, &manager, &mut renderer);
        let pending = manager.load("room.glb");
        frames.frame(16.0, &mut game, &manager, &mut renderer);
        assert_eq!(renderer.loading.len(), 2);
        assert_eq!(renderer.loading[1].total, 1);
        assert_eq!(renderer.scenes, 0);

        futures::executor::block_on(pending);
        frames.frame(32.0, &mut game, &manager, &mut renderer);
        assert!(game.preload.is_hidden());
        assert_eq!(renderer.scenes, 1);
    }
}
