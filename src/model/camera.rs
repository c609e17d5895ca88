use glam::{Mat4, Vec3};

use crate::config::CameraConfig;

/// Perspective camera that always looks at `target`.
#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32, config: &CameraConfig) -> Self {
        Self {
            eye: Vec3::ZERO,
            target: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::Y,
            fov_y: config.fov_y_degrees.to_radians(),
            aspect: width as f32 / height.max(1) as f32,
            z_near: config.z_near,
            z_far: config.z_far,
        }
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye).normalize_or_zero()
    }

    pub fn distance(&self) -> f32 {
        self.eye.distance(self.target)
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    /// Move eye and target together.
    pub fn translate(&mut self, offset: Vec3) {
        self.eye += offset;
        self.target += offset;
    }

    pub fn view_proj(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye, self.target, self.up);
        let proj = Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far);
        proj * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_keeps_the_view_direction() {
        let mut cam = Camera::new(800, 600, &CameraConfig::default());
        cam.eye = Vec3::new(0.0, 0.0, 10.0);
        cam.target = Vec3::ZERO;
        let before = cam.forward();
        cam.translate(Vec3::new(3.0, 0.0, -2.0));
        assert_eq!(cam.target, Vec3::new(3.0, 0.0, -2.0));
        assert!((cam.forward() - before).length() < 1e-6);
        assert!((cam.distance() - 10.0).abs() < 1e-5);
    }

    #[test]
    fn aspect_guards_against_zero_height() {
        let mut cam = Camera::new(800, 0, &CameraConfig::default());
        assert_eq!(cam.aspect, 800.0);
        cam.set_aspect(1280, 720);
        assert!((cam.aspect - 1280.0 / 720.0).abs() < 1e-6);
    }
}
