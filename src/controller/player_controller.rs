use glam::Vec3;
use tracing::debug;

use crate::config::{CameraConfig, GameConfig};
use crate::controller::camera_controller::camera_target;
use crate::controller::collision::{is_blocked, Obstacle};
use crate::controller::input::{KeyBindings, KeyIntent};
use crate::model::{
    ActionId, AnimationMixer, Camera, Clip, Mixer, ObjectGraph, PlayerGeometry, PlayerState, RotationIntent, Transform,
};

/// Drives the character: locomotion state, turning, clip crossfades and
/// collision-checked movement.
///
/// The state is unset until the clips have loaded. Until then key input is
/// ignored and movement does nothing.
pub struct PlayerController<M: Mixer = AnimationMixer> {
    pub transform: Transform,
    pub geometry: PlayerGeometry,
    state: Option<PlayerState>,
    rotation: RotationIntent,
    /// Load order is kept; lookups are by clip.
    actions: Vec<(Clip, ActionId)>,
    active_animation: Option<ActionId>,
    mixer: Option<M>,
    bindings: KeyBindings,

    rotation_speed: f32,
    forward_speed: f32,
    backward_speed: f32,
    blend_seconds: f32,
}

impl<M: Mixer> PlayerController<M> {
    pub fn new(config: &GameConfig, bindings: KeyBindings) -> Self {
        let mut transform = Transform::from_translation(config.spawn_position);
        transform.face_towards(config.spawn_look_at);
        Self {
            transform,
            geometry: PlayerGeometry::default(),
            state: None,
            rotation: RotationIntent::None,
            actions: Vec::new(),
            active_animation: None,
            mixer: None,
            bindings,
            rotation_speed: config.rotation_speed,
            forward_speed: config.forward_speed,
            backward_speed: config.backward_speed,
            blend_seconds: config.blend_seconds,
        }
    }

    pub fn state(&self) -> Option<PlayerState> {
        self.state
    }

    pub fn rotation(&self) -> RotationIntent {
        self.rotation
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn active_animation(&self) -> Option<ActionId> {
        self.active_animation
    }

    pub fn install_mixer(&mut self, mixer: M) {
        self.mixer = Some(mixer);
    }

    pub fn mixer(&self) -> Option<&M> {
        self.mixer.as_ref()
    }

    pub fn mixer_mut(&mut self) -> Option<&mut M> {
        self.mixer.as_mut()
    }

    /// Register the playable action for a clip. A clip registered twice keeps
    /// its first slot and points at the newer action.
    pub fn add_action(&mut self, clip: Clip, action: ActionId) {
        match self.actions.iter_mut().find(|(c, _)| *c == clip) {
            Some(slot) => slot.1 = action,
            None => self.actions.push((clip, action)),
        }
    }

    pub fn action(&self, clip: Clip) -> Option<ActionId> {
        self.actions.iter().find(|(c, _)| *c == clip).map(|(_, a)| *a)
    }

    pub fn clips(&self) -> impl Iterator<Item = Clip> + '_ {
        self.actions.iter().map(|(c, _)| *c)
    }

    pub fn set_state(&mut self, target: PlayerState) {
        if self.state == Some(target) {
            return;
        }
        debug!(from = ?self.state, to = %target, "player state");
        self.state = Some(target);
        self.play_animation(target.clip());
    }

    /// Named transition for external callers. Absent or unknown names fall
    /// back to standing.
    pub fn set_state_named(&mut self, name: Option<&str>) {
        let target = name
            .and_then(|n| n.parse::<PlayerState>().ok())
            .unwrap_or(PlayerState::Standing);
        self.set_state(target);
    }

    /// Crossfade from the active clip to `clip`. Missing clips are ignored.
    pub fn play_animation(&mut self, clip: Clip) {
        let Some(next) = self.action(clip) else {
            return;
        };
        let Some(mixer) = self.mixer.as_mut() else {
            return;
        };
        if let Some(active) = self.active_animation {
            mixer.fade_out(active, self.blend_seconds);
        }
        mixer.reset(next);
        mixer.fade_in(next, self.blend_seconds);
        mixer.play(next);
        self.active_animation = Some(next);
    }

    pub fn key_down(&mut self, code: &str) {
        if self.state.is_none() {
            return;
        }
        match self.bindings.intent(code) {
            Some(KeyIntent::Forward) => self.set_state(PlayerState::WalkingForward),
            Some(KeyIntent::Backward) => self.set_state(PlayerState::WalkingBackward),
            Some(KeyIntent::Left) => self.rotation = RotationIntent::Left,
            Some(KeyIntent::Right) => self.rotation = RotationIntent::Right,
            None => {}
        }
    }

    /// Releasing either walk key stands the player up, even if the other walk
    /// key is still held. Releasing either turn key stops turning.
    pub fn key_up(&mut self, code: &str) {
        if self.state.is_none() {
            return;
        }
        match self.bindings.intent(code) {
            Some(KeyIntent::Forward | KeyIntent::Backward) => self.set_state(PlayerState::Standing),
            Some(KeyIntent::Left | KeyIntent::Right) => self.rotation = RotationIntent::None,
            _ => {}
        }
    }

    /// Returns the yaw applied, in radians.
    pub fn apply_rotation(&mut self, delta: f32) -> f32 {
        let yaw = self.rotation.yaw_sign() * self.rotation_speed * delta;
        if yaw != 0.0 {
            self.transform.rotate_y(yaw);
        }
        yaw
    }

    pub fn speed(&self, state: PlayerState) -> f32 {
        match state {
            PlayerState::Standing => 0.0,
            PlayerState::WalkingForward => self.forward_speed,
            PlayerState::WalkingBackward => self.backward_speed,
        }
    }

    /// Walk one frame if the way is clear, dragging the camera along. Returns
    /// the offset applied.
    pub fn move_player<O: Obstacle>(
        &mut self,
        delta: f32,
        obstacles: &[O],
        camera: &mut Camera,
        camera_config: &CameraConfig,
    ) -> Option<Vec3> {
        let state = self.state.filter(|s| s.is_walking())?;
        let direction = self.transform.forward() * state.direction_sign();
        if is_blocked(self.transform.translation, direction, self.geometry.width, obstacles) {
            return None;
        }

        let offset = direction * self.speed(state) * delta;
        self.transform.translation += offset;
        camera.translate(offset);
        camera.target = camera_target(&self.transform, &self.geometry, camera_config);
        Some(offset)
    }

    pub fn update_animation(&mut self, delta: f32) {
        if let Some(mixer) = self.mixer.as_mut() {
            mixer.update(delta);
        }
    }

    /// Write the blended pose and the player transform into the character.
    pub fn pose(&self, character: &mut ObjectGraph) {
        character.transform = self.transform;
        if let Some(mixer) = self.mixer.as_ref() {
            mixer.apply_pose(character);
        }
    }
}
