use glam::Vec3;
use tracing::debug;

use crate::model::{HemisphereLight, ObjectGraph, PlayerGeometry, PointLight, Scene, Transform};

/// Environment nodes whose names contain one of these cast shadows.
const SHADOW_CASTERS: [&str; 4] = ["cude-item", "chair", "tube", "monitor"];
/// Environment nodes whose names contain this can be walked through.
const PASS_THROUGH: &str = "cable";

pub const CHARACTER_NAME: &str = "Character";

pub fn default_lights() -> (HemisphereLight, PointLight) {
    let hemisphere = HemisphereLight {
        sky_color: [1.0, 1.0, 1.0],
        ground_color: [0.0, 0.0, 0.0],
        intensity: 1.0,
    };
    let point = PointLight {
        position: Vec3::new(0.0, 220.0, 100.0),
        color: [0.0, 1.0, 0.0],
        intensity: 1.0,
        range: 2000.0,
        cast_shadow: true,
    };
    (hemisphere, point)
}

pub fn compose_scene() -> Scene {
    let (hemisphere, point) = default_lights();
    Scene::new(hemisphere, point)
}

/// Tag the room: every mesh receives shadows and renders double-sided with a
/// dull finish, selected props cast shadows, cables are pass-through.
pub fn compose_environment(environment: &mut ObjectGraph) {
    environment.traverse_mut(|node| {
        if node.name.contains(PASS_THROUGH) {
            node.flags.pass_through = true;
        }
        let casts = SHADOW_CASTERS.iter().any(|item| node.name.contains(item));
        if let Some(mesh) = node.mesh_mut() {
            mesh.material.double_sided = true;
            mesh.material.shininess = 5.0;
            node.flags.receive_shadow = true;
            node.flags.cast_shadow = casts;
        }
    });
    debug!(nodes = environment.nodes.len(), "environment composed");
}

/// Tag the character, measure it and put it at its spawn transform.
pub fn compose_character(character: &mut ObjectGraph, spawn: Transform) -> PlayerGeometry {
    character.name = CHARACTER_NAME.to_string();
    character.traverse_mut(|node| {
        if let Some(mesh) = node.mesh_mut() {
            mesh.material.shininess = 0.0;
            node.flags.cast_shadow = true;
            node.flags.receive_shadow = true;
        }
    });

    character.transform = Transform::IDENTITY;
    let geometry = PlayerGeometry::from_bounds(&character.bounding_box());
    character.transform = spawn;
    debug!(height = geometry.height, width = geometry.width, "character composed");
    geometry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Material, Mesh};

    fn quad_mesh() -> Mesh {
        let positions = vec![
            Vec3::new(-20.0, 0.0, -15.0),
            Vec3::new(20.0, 0.0, -15.0),
            Vec3::new(20.0, 180.0, 15.0),
        ];
        Mesh::new(positions, Vec::new(), vec![0, 1, 2], Material::default())
    }

    fn mesh_node(graph: &mut ObjectGraph, name: &str) -> usize {
        let id = graph.add_node(name, Transform::IDENTITY, None);
        graph.nodes[id].mesh = Some(quad_mesh());
        id
    }

    #[test]
    fn environment_flags_follow_node_names() {
        let mut room = ObjectGraph::new("room");
        let cable = mesh_node(&mut room, "cable_03");
        let chair = mesh_node(&mut room, "office_chair");
        let wall = mesh_node(&mut room, "wall");
        let group = room.add_node("cables", Transform::IDENTITY, None);
        compose_environment(&mut room);

        assert!(room.nodes[cable].flags.pass_through);
        assert!(room.nodes[group].flags.pass_through);
        assert!(!room.nodes[wall].flags.pass_through);
        assert!(room.nodes[chair].flags.cast_shadow);
        assert!(!room.nodes[wall].flags.cast_shadow);
        for id in [cable, chair, wall] {
            let node = &room.nodes[id];
            assert!(node.flags.receive_shadow);
            let material = &node.mesh().unwrap().material;
            assert!(material.double_sided);
            assert_eq!(material.shininess, 5.0);
        }
    }

    #[test]
    fn character_is_measured_before_it_is_placed() {
        let mut character = ObjectGraph::new("astra");
        let body = mesh_node(&mut character, "body");
        let mut spawn = Transform::from_translation(Vec3::new(0.0, 0.0, 600.0));
        spawn.face_towards(Vec3::ZERO);

        let geometry = compose_character(&mut character, spawn);
        assert_eq!(character.name, CHARACTER_NAME);
        assert_eq!(character.transform, spawn);
        assert!((geometry.height - 180.0).abs() < 1e-4);
        assert!((geometry.width - 30.0).abs() < 1e-4);
        assert_eq!(character.nodes[body].mesh().unwrap().material.shininess, 0.0);
        assert!(character.nodes[body].flags.cast_shadow);
    }

    #[test]
    fn point_light_is_green_above_the_room() {
        let scene = compose_scene();
        assert_eq!(scene.point_light.color, [0.0, 1.0, 0.0]);
        assert_eq!(scene.point_light.position, Vec3::new(0.0, 220.0, 100.0));
        assert_eq!(scene.background, [0.0, 0.0, 0.0, 1.0]);
        assert!(scene.character.is_none());
    }
}
