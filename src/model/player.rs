use std::fmt;
use std::str::FromStr;

use crate::model::animation::Clip;
use crate::model::graph::Aabb;

/// Locomotion state. Each state owns exactly one clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerState {
    Standing,
    WalkingForward,
    WalkingBackward,
}

impl PlayerState {
    pub fn clip(self) -> Clip {
        match self {
            PlayerState::Standing => Clip::Stand,
            PlayerState::WalkingForward => Clip::WalkForward,
            PlayerState::WalkingBackward => Clip::WalkBackward,
        }
    }

    pub fn is_walking(self) -> bool {
        !matches!(self, PlayerState::Standing)
    }

    /// +1 along the facing direction, -1 against it, 0 when standing.
    pub fn direction_sign(self) -> f32 {
        match self {
            PlayerState::Standing => 0.0,
            PlayerState::WalkingForward => 1.0,
            PlayerState::WalkingBackward => -1.0,
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlayerState::Standing => "STAND",
            PlayerState::WalkingForward => "WALK_FORWARD",
            PlayerState::WalkingBackward => "WALK_BACKWARD",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownState(pub String);

impl fmt::Display for UnknownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown player state `{}`", self.0)
    }
}

impl std::error::Error for UnknownState {}

impl FromStr for PlayerState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STAND" => Ok(PlayerState::Standing),
            "WALK_FORWARD" => Ok(PlayerState::WalkingForward),
            "WALK_BACKWARD" => Ok(PlayerState::WalkingBackward),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

/// Which way the player is turning. Independent of `PlayerState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationIntent {
    #[default]
    None,
    Left,
    Right,
}

impl RotationIntent {
    /// Sign of the yaw change: left is counter-clockwise seen from above.
    pub fn yaw_sign(self) -> f32 {
        match self {
            RotationIntent::None => 0.0,
            RotationIntent::Left => 1.0,
            RotationIntent::Right => -1.0,
        }
    }
}

/// Character size measured once after the model loads.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerGeometry {
    /// Vertical extent, used for camera framing.
    pub height: f32,
    /// Depth extent, used as collision clearance.
    pub width: f32,
}

impl PlayerGeometry {
    pub fn from_bounds(bounds: &Aabb) -> Self {
        let size = bounds.size();
        Self { height: size.y, width: size.z }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn states_map_to_their_clips() {
        assert_eq!(PlayerState::Standing.clip(), Clip::Stand);
        assert_eq!(PlayerState::WalkingForward.clip(), Clip::WalkForward);
        assert_eq!(PlayerState::WalkingBackward.clip(), Clip::WalkBackward);
    }

    #[test]
    fn state_names_round_trip_and_reject_unknowns() {
        for state in [PlayerState::Standing, PlayerState::WalkingForward, PlayerState::WalkingBackward] {
            assert_eq!(state.to_string().parse::<PlayerState>(), Ok(state));
        }
        assert_eq!("RUN".parse::<PlayerState>(), Err(UnknownState("RUN".into())));
    }

    #[test]
    fn geometry_uses_height_and_depth() {
        let bounds = Aabb { min: Vec3::new(-20.0, 0.0, -15.0), max: Vec3::new(20.0, 180.0, 15.0) };
        let geometry = PlayerGeometry::from_bounds(&bounds);
        assert_eq!(geometry.height, 180.0);
        assert_eq!(geometry.width, 30.0);
    }
}
