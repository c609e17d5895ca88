use glam::Vec3;

use crate::model::graph::ObjectGraph;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HemisphereLight {
    pub sky_color: [f32; 3],
    pub ground_color: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: [f32; 3],
    pub intensity: f32,
    /// Light reaches zero at this distance.
    pub range: f32,
    pub cast_shadow: bool,
}

/// Everything that gets drawn: lights plus the two loaded objects.
#[derive(Debug, Clone)]
pub struct Scene {
    pub background: [f32; 4],
    pub hemisphere: HemisphereLight,
    pub point_light: PointLight,
    pub character: Option<ObjectGraph>,
    pub environment: Option<ObjectGraph>,
}

impl Scene {
    pub fn new(hemisphere: HemisphereLight, point_light: PointLight) -> Self {
        Self {
            background: [0.0, 0.0, 0.0, 1.0],
            hemisphere,
            point_light,
            character: None,
            environment: None,
        }
    }

    pub fn objects(&self) -> impl Iterator<Item = &ObjectGraph> {
        self.environment.iter().chain(self.character.iter())
    }
}
