use std::rc::Rc;

use glam::{Quat, Vec3};

use crate::model::animation::{AnimationData, Sample};
use crate::model::graph::{NodeId, ObjectGraph, Transform};

/// Handle to an action owned by a mixer. Holding one does not keep anything alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId(pub usize);

/// Playback operations the player controller needs from an animation mixer.
pub trait Mixer {
    /// Rewind the action to zero and cancel any fade in progress.
    fn reset(&mut self, action: ActionId);
    fn fade_in(&mut self, action: ActionId, seconds: f32);
    fn fade_out(&mut self, action: ActionId, seconds: f32);
    fn play(&mut self, action: ActionId);
    /// Advance every running action and fade by `delta` seconds.
    fn update(&mut self, delta: f32);
    /// Write the blended pose into the bound object.
    fn apply_pose(&self, graph: &mut ObjectGraph);
}

#[derive(Debug, Clone, Copy)]
struct Fade {
    from: f32,
    to: f32,
    duration: f32,
    elapsed: f32,
}

impl Fade {
    fn weight(&self) -> f32 {
        if self.duration <= 0.0 {
            return self.to;
        }
        let f = (self.elapsed / self.duration).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * f
    }

    fn finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// One clip bound to the character's nodes.
#[derive(Debug, Clone)]
pub struct ClipAction {
    clip: Rc<AnimationData>,
    bindings: Vec<Option<NodeId>>,
    time: f32,
    weight: f32,
    fade: Option<Fade>,
    running: bool,
}

impl ClipAction {
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    pub fn clip(&self) -> &AnimationData {
        &self.clip
    }
}

#[derive(Clone, Copy)]
struct Accum<T> {
    weight: f32,
    value: T,
}

/// Plays and crossfades clips on a single character.
///
/// Actions loop. A fade-out that reaches zero stops its action. Poses are
/// blended per property by action weight; whatever weight is missing up to 1
/// comes from the rest pose captured when the mixer was created.
#[derive(Debug, Clone)]
pub struct AnimationMixer {
    rest_pose: Vec<Transform>,
    node_names: Vec<String>,
    actions: Vec<ClipAction>,
}

impl AnimationMixer {
    pub fn new(graph: &ObjectGraph) -> Self {
        Self {
            rest_pose: graph.nodes.iter().map(|n| n.local).collect(),
            node_names: graph.nodes.iter().map(|n| n.name.clone()).collect(),
            actions: Vec::new(),
        }
    }

    /// Bind a clip to the character and return its action.
    pub fn clip_action(&mut self, clip: Rc<AnimationData>) -> ActionId {
        let bindings = clip
            .tracks
            .iter()
            .map(|track| self.node_names.iter().position(|n| *n == track.target))
            .collect::<Vec<_>>();
        let unbound = bindings.iter().filter(|b| b.is_none()).count();
        if unbound > 0 {
            tracing::debug!("clip {} has {} tracks without a matching node", clip.name, unbound);
        }
        self.actions.push(ClipAction {
            clip,
            bindings,
            time: 0.0,
            weight: 1.0,
            fade: None,
            running: false,
        });
        ActionId(self.actions.len() - 1)
    }

    pub fn action(&self, id: ActionId) -> Option<&ClipAction> {
        self.actions.get(id.0)
    }

    fn schedule_fade(&mut self, id: ActionId, from: f32, to: f32, seconds: f32) {
        if let Some(action) = self.actions.get_mut(id.0) {
            let fade = Fade { from, to, duration: seconds.max(0.0), elapsed: 0.0 };
            action.weight = fade.weight();
            action.fade = Some(fade);
        }
    }
}

impl Mixer for AnimationMixer {
    fn reset(&mut self, id: ActionId) {
        if let Some(action) = self.actions.get_mut(id.0) {
            action.time = 0.0;
            action.fade = None;
        }
    }

    fn fade_in(&mut self, id: ActionId, seconds: f32) {
        self.schedule_fade(id, 0.0, 1.0, seconds);
    }

    fn fade_out(&mut self, id: ActionId, seconds: f32) {
        let from = match self.actions.get(id.0) {
            Some(action) => action.weight,
            None => return,
        };
        self.schedule_fade(id, from, 0.0, seconds);
    }

    fn play(&mut self, id: ActionId) {
        if let Some(action) = self.actions.get_mut(id.0) {
            action.running = true;
        }
    }

    fn update(&mut self, delta: f32) {
        for action in self.actions.iter_mut().filter(|a| a.running) {
            let duration = action.clip.duration;
            action.time = if duration > 0.0 {
                (action.time + delta).rem_euclid(duration)
            } else {
                0.0
            };

            if let Some(fade) = action.fade.as_mut() {
                fade.elapsed += delta;
                action.weight = fade.weight();
                if fade.finished() {
                    let target = fade.to;
                    action.fade = None;
                    if target <= 0.0 {
                        action.running = false;
                    }
                }
            }
        }
    }

    fn apply_pose(&self, graph: &mut ObjectGraph) {
        let count = graph.nodes.len().min(self.rest_pose.len());
        let mut translation: Vec<Option<Accum<Vec3>>> = vec![None; count];
        let mut rotation: Vec<Option<Accum<Quat>>> = vec![None; count];
        let mut scale: Vec<Option<Accum<Vec3>>> = vec![None; count];

        for action in self.actions.iter().filter(|a| a.running && a.weight > 0.0) {
            let w = action.weight;
            for (track, binding) in action.clip.tracks.iter().zip(&action.bindings) {
                let Some(node) = binding.filter(|&n| n < count) else { continue };
                match track.sample(action.time) {
                    Some(Sample::Translation(v)) => accumulate_vec(&mut translation[node], v, w),
                    Some(Sample::Scale(v)) => accumulate_vec(&mut scale[node], v, w),
                    Some(Sample::Rotation(q)) => {
                        let slot = &mut rotation[node];
                        *slot = Some(match *slot {
                            None => Accum { weight: w, value: q },
                            Some(acc) => {
                                let total = acc.weight + w;
                                Accum { weight: total, value: acc.value.slerp(q, w / total) }
                            }
                        });
                    }
                    None => {}
                }
            }
        }

        for id in 0..count {
            let rest = self.rest_pose[id];
            let local = &mut graph.nodes[id].local;
            local.translation = blend_vec(rest.translation, translation[id]);
            local.scale = blend_vec(rest.scale, scale[id]);
            local.rotation = match rotation[id] {
                None => rest.rotation,
                Some(acc) if acc.weight < 1.0 => rest.rotation.slerp(acc.value, acc.weight),
                Some(acc) => acc.value,
            }
            .normalize();
        }
    }
}

fn accumulate_vec(slot: &mut Option<Accum<Vec3>>, v: Vec3, w: f32) {
    let acc = slot.get_or_insert(Accum { weight: 0.0, value: Vec3::ZERO });
    acc.weight += w;
    acc.value += v * w;
}

fn blend_vec(rest: Vec3, acc: Option<Accum<Vec3>>) -> Vec3 {
    match acc {
        None => rest,
        Some(acc) if acc.weight < 1.0 => acc.value + rest * (1.0 - acc.weight),
        Some(acc) => acc.value / acc.weight,
    }
}
