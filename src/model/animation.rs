use std::fmt;

use glam::{Quat, Vec3};

/// The clips the character knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Clip {
    Stand,
    Run,
    Collect,
    WalkForward,
    WalkBackward,
}

impl Clip {
    /// Order in which clip files are requested.
    pub const LOAD_ORDER: [Clip; 5] = [
        Clip::Run,
        Clip::Collect,
        Clip::WalkForward,
        Clip::WalkBackward,
        Clip::Stand,
    ];

    pub fn file_stem(self) -> &'static str {
        match self {
            Clip::Stand => "stand",
            Clip::Run => "running",
            Clip::Collect => "gathering",
            Clip::WalkForward => "walking",
            Clip::WalkBackward => "walking-backward",
        }
    }
}

impl fmt::Display for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
}

#[derive(Debug, Clone)]
pub enum TrackValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

impl TrackValues {
    pub fn len(&self) -> usize {
        match self {
            TrackValues::Translation(v) | TrackValues::Scale(v) => v.len(),
            TrackValues::Rotation(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Translation(Vec3),
    Rotation(Quat),
    Scale(Vec3),
}

/// Keyframes for one property of one node, addressed by node name so that a
/// clip from a separate file can drive the character's rig.
#[derive(Debug, Clone)]
pub struct Track {
    pub target: String,
    pub times: Vec<f32>,
    pub values: TrackValues,
    pub interpolation: Interpolation,
}

impl Track {
    pub fn duration(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    pub fn sample(&self, t: f32) -> Option<Sample> {
        let len = self.times.len().min(self.values.len());
        if len == 0 {
            return None;
        }
        let next = self.times[..len].partition_point(|&k| k <= t);
        let (a, b, f) = if next == 0 {
            (0, 0, 0.0)
        } else if next >= len {
            (len - 1, len - 1, 0.0)
        } else {
            let (ta, tb) = (self.times[next - 1], self.times[next]);
            let f = if tb > ta { (t - ta) / (tb - ta) } else { 0.0 };
            (next - 1, next, f)
        };
        let f = match self.interpolation {
            Interpolation::Step => 0.0,
            Interpolation::Linear => f,
        };

        Some(match &self.values {
            TrackValues::Translation(v) => Sample::Translation(v[a].lerp(v[b], f)),
            TrackValues::Scale(v) => Sample::Scale(v[a].lerp(v[b], f)),
            TrackValues::Rotation(v) => Sample::Rotation(v[a].slerp(v[b], f).normalize()),
        })
    }
}

/// A named, time-based animation sequence.
#[derive(Debug, Clone)]
pub struct AnimationData {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<Track>,
}

impl AnimationData {
    pub fn new(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let duration = tracks.iter().map(Track::duration).fold(0.0, f32::max);
        Self { name: name.into(), duration, tracks }
    }
}
