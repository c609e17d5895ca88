// CONTROLLER: Input, player logic, camera and collision
pub mod input;
pub mod collision;
pub mod camera_controller;
pub mod player_controller;
pub mod scene_composer;

pub use input::{InputEvent, KeyBindings, KeyIntent, MouseButton};
pub use collision::{obstacles_from, Obstacle, ObstacleNode};
pub use camera_controller::OrbitControls;
pub use player_controller::PlayerController;
