// MODEL: scene graph, animation data and player state
pub mod graph;
pub mod animation;
pub mod mixer;
pub mod camera;
pub mod player;
pub mod scene;

pub use graph::{Aabb, Material, Mesh, NodeFlags, NodeId, ObjectGraph, SceneNode, Skin, SkinWeights, Transform};
pub use animation::{AnimationData, Clip, Interpolation, Track, TrackValues};
pub use mixer::{ActionId, AnimationMixer, Mixer};
pub use camera::Camera;
pub use player::{PlayerGeometry, PlayerState, RotationIntent};
pub use scene::{HemisphereLight, PointLight, Scene};
