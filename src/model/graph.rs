use glam::{Mat4, Quat, Vec3};

use crate::model::animation::AnimationData;

pub type NodeId = usize;

/// Local translation/rotation/scale of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self { translation, ..Self::IDENTITY }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// The local +Z axis in world space, which is where a model faces.
    pub fn forward(&self) -> Vec3 {
        (self.rotation * Vec3::Z).normalize_or_zero()
    }

    /// Rotate around the local vertical axis.
    pub fn rotate_y(&mut self, angle: f32) {
        self.rotation = (self.rotation * Quat::from_rotation_y(angle)).normalize();
    }

    /// Turn so that +Z points at `target`. Yaw only; the model stays upright.
    pub fn face_towards(&mut self, target: Vec3) {
        let dir = target - self.translation;
        if dir.x.abs() < f32::EPSILON && dir.z.abs() < f32::EPSILON {
            return;
        }
        self.rotation = Quat::from_rotation_y(dir.x.atan2(dir.z));
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Axis-aligned bounding box. `EMPTY` is the identity for `union`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |acc, p| acc.extended(*p))
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn extended(self, p: Vec3) -> Self {
        Self { min: self.min.min(p), max: self.max.max(p) }
    }

    pub fn union(self, other: Aabb) -> Self {
        if other.is_empty() {
            return self;
        }
        Self { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Bounds of the eight transformed corners.
    pub fn transformed(&self, m: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let (lo, hi) = (self.min, self.max);
        let corners = [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ];
        corners
            .iter()
            .fold(Self::EMPTY, |acc, c| acc.extended(m.transform_point3(*c)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub base_color: [f32; 4],
    pub shininess: f32,
    pub double_sided: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            shininess: 30.0,
            double_sided: false,
        }
    }
}

/// Per-vertex joint indices (into `Skin::joints`) and weights.
#[derive(Debug, Clone, Default)]
pub struct SkinWeights {
    pub joints: Vec<[u16; 4]>,
    pub weights: Vec<[f32; 4]>,
}

/// Triangle mesh in node-local space.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub material: Material,
    pub skin_weights: Option<SkinWeights>,
    pub bounds: Aabb,
}

impl Mesh {
    pub fn new(positions: Vec<Vec3>, normals: Vec<Vec3>, indices: Vec<u32>, material: Material) -> Self {
        let bounds = Aabb::from_points(&positions);
        let normals = if normals.len() == positions.len() {
            normals
        } else {
            vec![Vec3::Y; positions.len()]
        };
        Self { positions, normals, indices, material, skin_weights: None, bounds }
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(move |tri| {
            Some([
                *self.positions.get(tri[0] as usize)?,
                *self.positions.get(tri[1] as usize)?,
                *self.positions.get(tri[2] as usize)?,
            ])
        })
    }
}

/// Joint nodes (in this graph) and their inverse bind matrices.
#[derive(Debug, Clone)]
pub struct Skin {
    pub joints: Vec<NodeId>,
    pub inverse_bind: Vec<Mat4>,
}

/// Per-node tags. All off for a freshly added node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeFlags {
    /// Informational only. The renderer draws no shadow maps and never reads
    /// this or `receive_shadow`; they record which nodes would take part.
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    /// The collision probe ignores this node.
    pub pass_through: bool,
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub local: Transform,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub mesh: Option<Mesh>,
    pub skin: Option<Skin>,
    pub flags: NodeFlags,
}

impl SceneNode {
    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    pub fn mesh_mut(&mut self) -> Option<&mut Mesh> {
        self.mesh.as_mut()
    }
}

/// A loaded object: a node hierarchy under a single root transform, plus any
/// animation clips that came with the file.
#[derive(Debug, Clone, Default)]
pub struct ObjectGraph {
    pub name: String,
    pub transform: Transform,
    pub nodes: Vec<SceneNode>,
    /// Top-level children of the object, in file order.
    pub roots: Vec<NodeId>,
    pub animations: Vec<AnimationData>,
}

impl ObjectGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn add_node(&mut self, name: impl Into<String>, local: Transform, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(SceneNode {
            name: name.into(),
            local,
            parent,
            children: Vec::new(),
            mesh: None,
            skin: None,
            flags: NodeFlags::default(),
        });
        match parent {
            Some(p) => self.nodes[p].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name)
    }

    /// Node ids of `root` and everything below it, depth first.
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        out
    }

    /// Every node, depth first in file order.
    pub fn traversal_order(&self) -> Vec<NodeId> {
        self.roots.iter().flat_map(|&r| self.subtree(r)).collect()
    }

    pub fn traverse_mut(&mut self, mut f: impl FnMut(&mut SceneNode)) {
        for id in self.traversal_order() {
            f(&mut self.nodes[id]);
        }
    }

    /// World matrix of every node, indexed by `NodeId`.
    pub fn world_matrices(&self) -> Vec<Mat4> {
        let mut world = vec![Mat4::IDENTITY; self.nodes.len()];
        let object = self.transform.matrix();
        for id in self.traversal_order() {
            let node = &self.nodes[id];
            let parent = node.parent.map(|p| world[p]).unwrap_or(object);
            world[id] = parent * node.local.matrix();
        }
        world
    }

    /// World-space bounds of all mesh geometry.
    pub fn bounding_box(&self) -> Aabb {
        let world = self.world_matrices();
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, n)| n.mesh().map(|m| m.bounds.transformed(&world[id])))
            .fold(Aabb::EMPTY, Aabb::union)
    }

    /// World-space positions and normals of a skinned mesh for the current
    /// pose. `None` when the node carries no skin.
    pub fn skinned_vertices(&self, id: NodeId, world: &[Mat4]) -> Option<(Vec<Vec3>, Vec<Vec3>)> {
        let node = self.nodes.get(id)?;
        let (mesh, skin) = (node.mesh()?, node.skin.as_ref()?);
        let weights = mesh.skin_weights.as_ref()?;

        let joint_matrices: Vec<Mat4> = skin
            .joints
            .iter()
            .zip(&skin.inverse_bind)
            .map(|(&joint, ibm)| world.get(joint).copied().unwrap_or(Mat4::IDENTITY) * *ibm)
            .collect();

        let mut positions = Vec::with_capacity(mesh.positions.len());
        let mut normals = Vec::with_capacity(mesh.normals.len());
        for (i, p) in mesh.positions.iter().enumerate() {
            let n = mesh.normals.get(i).copied().unwrap_or(Vec3::Y);
            let (joints, w) = match (weights.joints.get(i), weights.weights.get(i)) {
                (Some(j), Some(w)) => (j, w),
                _ => {
                    positions.push(world[id].transform_point3(*p));
                    normals.push(world[id].transform_vector3(n).normalize_or_zero());
                    continue;
                }
            };
            let mut m = Mat4::ZERO;
            for k in 0..4 {
                if let Some(jm) = joint_matrices.get(joints[k] as usize) {
                    m += *jm * w[k];
                }
            }
            positions.push(m.transform_point3(*p));
            normals.push(m.transform_vector3(n).normalize_or_zero());
        }
        Some((positions, normals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box_mesh() -> Mesh {
        let positions = vec![Vec3::new(-1.0, 0.0, -0.5), Vec3::new(1.0, 2.0, 0.5), Vec3::new(1.0, 0.0, 0.5)];
        Mesh::new(positions, Vec::new(), vec![0, 1, 2], Material::default())
    }

    #[test]
    fn face_towards_turns_model_around_the_vertical_axis() {
        let mut t = Transform::from_translation(Vec3::new(0.0, 0.0, 600.0));
        t.face_towards(Vec3::ZERO);
        let f = t.forward();
        assert!((f - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5, "forward was {f:?}");
    }

    #[test]
    fn rotate_y_turns_left_for_positive_angles() {
        let mut t = Transform::IDENTITY;
        t.rotate_y(std::f32::consts::FRAC_PI_2);
        assert!((t.forward() - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn bounding_box_applies_node_and_object_transforms() {
        let mut graph = ObjectGraph::new("box");
        graph.transform = Transform::from_translation(Vec3::new(10.0, 0.0, 0.0));
        let parent = graph.add_node("parent", Transform::from_translation(Vec3::Y), None);
        let child = graph.add_node("child", Transform::IDENTITY, Some(parent));
        graph.nodes[child].mesh = Some(unit_box_mesh());

        let bounds = graph.bounding_box();
        assert_eq!(bounds.min, Vec3::new(9.0, 1.0, -0.5));
        assert_eq!(bounds.max, Vec3::new(11.0, 3.0, 0.5));
        assert_eq!(bounds.size(), Vec3::new(2.0, 2.0, 1.0));
    }

    #[test]
    fn traversal_is_depth_first_in_file_order() {
        let mut graph = ObjectGraph::new("tree");
        let a = graph.add_node("a", Transform::IDENTITY, None);
        let b = graph.add_node("b", Transform::IDENTITY, None);
        let a1 = graph.add_node("a1", Transform::IDENTITY, Some(a));
        let a2 = graph.add_node("a2", Transform::IDENTITY, Some(a));
        assert_eq!(graph.traversal_order(), vec![a, a1, a2, b]);
        assert_eq!(graph.subtree(a), vec![a, a1, a2]);
        assert_eq!(graph.find_by_name("a2"), Some(a2));
    }

    #[test]
    fn empty_graph_has_zero_size() {
        let graph = ObjectGraph::new("empty");
        assert!(graph.bounding_box().is_empty());
        assert_eq!(graph.bounding_box().size(), Vec3::ZERO);
    }

    #[test]
    fn skinned_vertices_follow_joint_motion() {
        let mut graph = ObjectGraph::new("rig");
        let joint = graph.add_node("hips", Transform::IDENTITY, None);
        let body = graph.add_node("body", Transform::IDENTITY, None);
        let mut mesh = unit_box_mesh();
        mesh.skin_weights = Some(SkinWeights {
            joints: vec![[0, 0, 0, 0]; 3],
            weights: vec![[1.0, 0.0, 0.0, 0.0]; 3],
        });
        graph.nodes[body].mesh = Some(mesh);
        graph.nodes[body].skin = Some(Skin { joints: vec![joint], inverse_bind: vec![Mat4::IDENTITY] });

        graph.nodes[joint].local.translation = Vec3::new(0.0, 5.0, 0.0);
        let world = graph.world_matrices();
        let (positions, _) = graph.skinned_vertices(body, &world).unwrap();
        assert_eq!(positions[0], Vec3::new(-1.0, 5.0, -0.5));
        assert!(graph.skinned_vertices(joint, &world).is_none());
    }

    #[test]
    fn new_nodes_start_with_every_flag_off() {
        let mut graph = ObjectGraph::new("room");
        let id = graph.add_node("wall", Transform::IDENTITY, None);
        assert_eq!(graph.nodes[id].flags, NodeFlags::default());
        assert!(!graph.nodes[id].flags.cast_shadow && !graph.nodes[id].flags.receive_shadow);
    }
}
