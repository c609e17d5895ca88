use glam::Vec3;

use crate::config::CameraConfig;
use crate::controller::input::{InputEvent, MouseButton};
use crate::model::{Camera, PlayerGeometry, Transform};

/// Point the camera looks at: the player raised to chest height.
pub fn camera_target(player: &Transform, geometry: &PlayerGeometry, config: &CameraConfig) -> Vec3 {
    player.translation + Vec3::Y * geometry.height * config.target_height_ratio
}

/// Place the camera behind the player, looking at the player.
pub fn frame_camera(camera: &mut Camera, player: &Transform, geometry: &PlayerGeometry, config: &CameraConfig) {
    let target = camera_target(player, geometry, config);
    camera.target = target;
    camera.eye = target - player.forward() * config.distance;
}

/// Mouse orbit around the camera target: drag to rotate, wheel to zoom.
/// Keyboard panning is not supported, so movement keys only drive the player.
pub struct OrbitControls {
    /// Radians per pixel of mouse travel.
    pub rotate_speed: f32,
    /// Distance factor per wheel notch.
    pub zoom_step: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    dragging: bool,
}

impl OrbitControls {
    const MIN_POLAR: f32 = 0.01;

    pub fn new(config: &CameraConfig) -> Self {
        Self {
            rotate_speed: 0.005,
            zoom_step: 0.95,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            dragging: false,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Returns whether the event was consumed.
    pub fn handle(&mut self, event: &InputEvent, camera: &mut Camera) -> bool {
        match event {
            InputEvent::MouseButton { button: MouseButton::Left, is_down } => {
                self.dragging = *is_down;
                true
            }
            InputEvent::MouseMove { dx, dy } if self.dragging => {
                self.rotate(camera, *dx, *dy);
                true
            }
            InputEvent::MouseWheel { delta_y } => {
                self.zoom(camera, *delta_y);
                true
            }
            _ => false,
        }
    }

    pub fn rotate(&self, camera: &mut Camera, dx: f32, dy: f32) {
        let offset = camera.eye - camera.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return;
        }
        let theta = offset.x.atan2(offset.z) - dx * self.rotate_speed;
        let phi = ((offset.y / radius).clamp(-1.0, 1.0).acos() - dy * self.rotate_speed)
            .clamp(Self::MIN_POLAR, std::f32::consts::PI - Self::MIN_POLAR);
        camera.eye = camera.target
            + Vec3::new(phi.sin() * theta.sin(), phi.cos(), phi.sin() * theta.cos()) * radius;
    }

    pub fn zoom(&self, camera: &mut Camera, delta_y: f32) {
        let factor = if delta_y > 0.0 {
            1.0 / self.zoom_step
        } else if delta_y < 0.0 {
            self.zoom_step
        } else {
            return;
        };
        self.set_distance(camera, camera.distance() * factor);
    }

    /// Pull the eye along the view ray so the distance is within bounds.
    pub fn clamp(&self, camera: &mut Camera) {
        self.set_distance(camera, camera.distance());
    }

    fn set_distance(&self, camera: &mut Camera, distance: f32) {
        let dir = (camera.eye - camera.target).normalize_or_zero();
        if dir == Vec3::ZERO {
            return;
        }
        camera.eye = camera.target + dir * distance.clamp(self.min_distance, self.max_distance);
    }
}
