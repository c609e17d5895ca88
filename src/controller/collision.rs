use glam::Vec3;

use crate::model::{Aabb, ObjectGraph};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction: direction.normalize_or_zero() }
    }

    /// Slab test. Distance to the box entry point, or 0 when the origin is inside.
    pub fn hit_aabb(&self, aabb: &Aabb) -> Option<f32> {
        if aabb.is_empty() {
            return None;
        }
        let inv = self.direction.recip();
        let t1 = (aabb.min - self.origin) * inv;
        let t2 = (aabb.max - self.origin) * inv;
        let t_near = t1.min(t2).max_element();
        let t_far = t1.max(t2).min_element();
        if t_far < 0.0 || t_near > t_far || t_near.is_nan() || t_far.is_nan() {
            return None;
        }
        Some(t_near.max(0.0))
    }

    /// Double-sided Möller-Trumbore intersection.
    pub fn hit_triangle(&self, [a, b, c]: [Vec3; 3]) -> Option<f32> {
        const EPS: f32 = 1e-7;
        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < EPS {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = edge2.dot(q) * inv_det;
        (t >= 0.0).then_some(t)
    }
}

/// Something the collision probe can test a ray against.
pub trait Obstacle {
    fn is_pass_through(&self) -> bool;
    /// Distance to the nearest intersection, if any.
    fn nearest_hit(&self, ray: &Ray) -> Option<f32>;
}

/// A top-level environment node with its whole subtree baked to world-space
/// triangles.
#[derive(Debug, Clone)]
pub struct ObstacleNode {
    pub name: String,
    pub pass_through: bool,
    pub bounds: Aabb,
    triangles: Vec<[Vec3; 3]>,
}

impl ObstacleNode {
    pub fn new(name: impl Into<String>, pass_through: bool, triangles: Vec<[Vec3; 3]>) -> Self {
        let bounds = Aabb::from_points(triangles.iter().flatten());
        Self { name: name.into(), pass_through, bounds, triangles }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}

impl Obstacle for ObstacleNode {
    fn is_pass_through(&self) -> bool {
        self.pass_through
    }

    fn nearest_hit(&self, ray: &Ray) -> Option<f32> {
        ray.hit_aabb(&self.bounds)?;
        self.triangles
            .iter()
            .filter_map(|tri| ray.hit_triangle(*tri))
            .min_by(f32::total_cmp)
    }
}

/// One obstacle per top-level child of the environment, in file order. The
/// pass-through flag is taken from that child.
pub fn obstacles_from(environment: &ObjectGraph) -> Vec<ObstacleNode> {
    let world = environment.world_matrices();
    environment
        .roots
        .iter()
        .map(|&root| {
            let triangles = environment
                .subtree(root)
                .into_iter()
                .filter_map(|id| environment.nodes[id].mesh().map(|m| (id, m)))
                .flat_map(|(id, mesh)| {
                    let m = world[id];
                    mesh.triangles()
                        .map(move |tri| tri.map(|p| m.transform_point3(p)))
                        .collect::<Vec<_>>()
                })
                .collect();
            let node = &environment.nodes[root];
            ObstacleNode::new(node.name.clone(), node.flags.pass_through, triangles)
        })
        .collect()
}

/// Whether moving from `origin` along `direction` is blocked within
/// `clearance`. The first obstacle in sequence that is solid and closer than
/// the clearance wins.
pub fn is_blocked<O: Obstacle>(origin: Vec3, direction: Vec3, clearance: f32, obstacles: &[O]) -> bool {
    let ray = Ray::new(origin, direction);
    obstacles.iter().any(|obstacle| {
        if obstacle.is_pass_through() {
            return false;
        }
        matches!(obstacle.nearest_hit(&ray), Some(distance) if distance < clearance)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Material, Mesh, Transform};

    struct Fixed {
        pass_through: bool,
        distance: Option<f32>,
    }

    impl Obstacle for Fixed {
        fn is_pass_through(&self) -> bool {
            self.pass_through
        }

        fn nearest_hit(&self, _ray: &Ray) -> Option<f32> {
            self.distance
        }
    }

    fn solid(distance: f32) -> Fixed {
        Fixed { pass_through: false, distance: Some(distance) }
    }

    /// Square wall facing the -Z side, centred on the z axis at depth `z`.
    fn wall(z: f32) -> Vec<[Vec3; 3]> {
        let (a, b, c, d) = (
            Vec3::new(-50.0, -50.0, z),
            Vec3::new(50.0, -50.0, z),
            Vec3::new(50.0, 50.0, z),
            Vec3::new(-50.0, 50.0, z),
        );
        vec![[a, b, c], [a, c, d]]
    }

    #[test]
    fn triangle_hit_is_double_sided() {
        let tri = wall(10.0)[0];
        let forward = Ray::new(Vec3::new(10.0, -10.0, 0.0), Vec3::Z);
        let backward = Ray::new(Vec3::new(10.0, -10.0, 20.0), -Vec3::Z);
        assert!((forward.hit_triangle(tri).unwrap() - 10.0).abs() < 1e-4);
        assert!((backward.hit_triangle(tri).unwrap() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn rays_ignore_geometry_behind_them() {
        let node = ObstacleNode::new("wall", false, wall(-10.0));
        assert_eq!(node.nearest_hit(&Ray::new(Vec3::ZERO, Vec3::Z)), None);
    }

    #[test]
    fn nearest_hit_picks_the_closest_surface() {
        let mut triangles = wall(30.0);
        triangles.extend(wall(12.0));
        let node = ObstacleNode::new("shelves", false, triangles);
        let d = node.nearest_hit(&Ray::new(Vec3::ZERO, Vec3::Z)).unwrap();
        assert!((d - 12.0).abs() < 1e-4);
    }

    #[test]
    fn blocked_only_when_strictly_closer_than_clearance() {
        assert!(is_blocked(Vec3::ZERO, Vec3::Z, 50.0, &[solid(49.9)]));
        assert!(!is_blocked(Vec3::ZERO, Vec3::Z, 50.0, &[solid(50.0)]));
        assert!(!is_blocked(Vec3::ZERO, Vec3::Z, 50.0, &[solid(80.0)]));
    }

    #[test]
    fn pass_through_obstacle_never_blocks() {
        let cable = Fixed { pass_through: true, distance: Some(1.0) };
        assert!(!is_blocked(Vec3::ZERO, Vec3::Z, 50.0, &[cable]));
    }

    #[test]
    fn any_qualifying_obstacle_blocks_regardless_of_order() {
        let cable = Fixed { pass_through: true, distance: Some(1.0) };
        let miss = Fixed { pass_through: false, distance: None };
        let obstacles = [cable, miss, solid(200.0), solid(3.0)];
        assert!(is_blocked(Vec3::ZERO, Vec3::Z, 50.0, &obstacles));
    }

    #[test]
    fn empty_obstacle_set_never_blocks() {
        let none: [Fixed; 0] = [];
        assert!(!is_blocked(Vec3::ZERO, Vec3::X, 1_000.0, &none));
    }

    #[test]
    fn scan_stops_at_the_first_qualifying_obstacle() {
        struct Counting<'a>(&'a std::cell::Cell<usize>, f32);
        impl Obstacle for Counting<'_> {
            fn is_pass_through(&self) -> bool {
                false
            }
            fn nearest_hit(&self, _ray: &Ray) -> Option<f32> {
                self.0.set(self.0.get() + 1);
                Some(self.1)
            }
        }
        let probes = std::cell::Cell::new(0);
        let obstacles = [Counting(&probes, 100.0), Counting(&probes, 5.0), Counting(&probes, 1.0)];
        assert!(is_blocked(Vec3::ZERO, Vec3::Z, 10.0, &obstacles));
        assert_eq!(probes.get(), 2);
    }

    #[test]
    fn obstacles_bake_subtrees_in_world_space() {
        let mut env = ObjectGraph::new("room");
        let desk = env.add_node("desk", Transform::from_translation(Vec3::new(0.0, 0.0, 40.0)), None);
        let top = env.add_node("desk_top", Transform::IDENTITY, Some(desk));
        let positions = vec![Vec3::new(-50.0, -50.0, 0.0), Vec3::new(50.0, -50.0, 0.0), Vec3::new(0.0, 50.0, 0.0)];
        env.nodes[top].mesh = Some(Mesh::new(positions, Vec::new(), vec![0, 1, 2], Material::default()));
        let cable = env.add_node("cable_01", Transform::IDENTITY, None);
        env.nodes[cable].flags.pass_through = true;

        let obstacles = obstacles_from(&env);
        assert_eq!(obstacles.len(), 2);
        assert_eq!(obstacles[0].name, "desk");
        assert_eq!(obstacles[0].triangle_count(), 1);
        assert!(obstacles[1].pass_through);

        let d = obstacles[0].nearest_hit(&Ray::new(Vec3::ZERO, Vec3::Z)).unwrap();
        assert!((d - 40.0).abs() < 1e-4);
        assert!(is_blocked(Vec3::ZERO, Vec3::Z, 41.0, &obstacles));
        assert!(!is_blocked(Vec3::ZERO, Vec3::Z, 39.0, &obstacles));
    }
}
