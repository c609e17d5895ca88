use glam::Vec3;

/// Tunables for the walkaround. There is no config file; `Default` is the game.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Yaw rate while a rotation key is held, radians per second.
    pub rotation_speed: f32,
    /// Units per second while walking forward.
    pub forward_speed: f32,
    /// Units per second while walking backward.
    pub backward_speed: f32,
    /// Crossfade window between two clips, in seconds.
    pub blend_seconds: f32,

    pub camera: CameraConfig,

    pub spawn_position: Vec3,
    /// Point the character faces when it spawns.
    pub spawn_look_at: Vec3,

    pub assets: AssetPaths,
}

#[derive(Debug, Clone)]
pub struct CameraConfig {
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    /// Initial distance behind the player.
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Look-at target height as a fraction of the player height.
    pub target_height_ratio: f32,
}

#[derive(Debug, Clone)]
pub struct AssetPaths {
    pub character: String,
    pub environment: String,
    /// Directory holding one file per animation clip.
    pub animations_dir: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rotation_speed: 3.0,
            forward_speed: 150.0,
            backward_speed: 100.0,
            blend_seconds: 0.2,
            camera: CameraConfig::default(),
            spawn_position: Vec3::new(0.0, 0.0, 600.0),
            spawn_look_at: Vec3::ZERO,
            assets: AssetPaths::default(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 75.0,
            z_near: 0.1,
            z_far: 100_000.0,
            distance: 200.0,
            min_distance: 50.0,
            max_distance: 300.0,
            target_height_ratio: 0.75,
        }
    }
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            character: "models/astra.glb".to_string(),
            environment: "models/sci-fi_room/scifi.glb".to_string(),
            animations_dir: "models/animations".to_string(),
        }
    }
}

impl AssetPaths {
    pub fn animation(&self, file_stem: &str) -> String {
        format!("{}/{}.glb", self.animations_dir, file_stem)
    }
}
