//! Binary glTF (`.glb`) to [`ObjectGraph`].
//!
//! Reads the default scene's node hierarchy with local TRS, one merged mesh
//! per node, skins and every animation. Textures are not decoded; materials
//! keep their base color factor only.

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};
use gltf::animation::util::ReadOutputs;
use gltf::mesh::util::{ReadJoints, ReadWeights};

use crate::error::AssetError;
use crate::model::{
    AnimationData, Interpolation, Material, Mesh, NodeId, ObjectGraph, Skin, SkinWeights, Track, TrackValues,
    Transform,
};

pub fn parse_glb(path: &str, bytes: &[u8]) -> Result<ObjectGraph, AssetError> {
    let gltf_error = |source| AssetError::Gltf { path: path.to_string(), source };
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes).map_err(gltf_error)?;
    let buffers = gltf::import_buffers(&document, None, blob).map_err(gltf_error)?;

    let mut graph = ObjectGraph::new(object_name(path));
    let mut ids: HashMap<usize, NodeId> = HashMap::new();
    if let Some(scene) = document.default_scene().or_else(|| document.scenes().next()) {
        for node in scene.nodes() {
            add_subtree(&mut graph, &mut ids, &node, None);
        }
    }

    for node in document.nodes() {
        let Some(&id) = ids.get(&node.index()) else {
            continue;
        };
        if let Some(mesh) = node.mesh() {
            graph.nodes[id].mesh = Some(read_mesh(path, &mesh, &buffers)?);
        }
        if let Some(skin) = node.skin() {
            let joints = skin
                .joints()
                .map(|j| ids.get(&j.index()).copied().unwrap_or(id))
                .collect::<Vec<_>>();
            let reader = skin.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
            let inverse_bind = match reader.read_inverse_bind_matrices() {
                Some(iter) => iter.map(|m| Mat4::from_cols_array_2d(&m)).collect(),
                None => vec![Mat4::IDENTITY; joints.len()],
            };
            graph.nodes[id].skin = Some(Skin { joints, inverse_bind });
        }
    }

    for animation in document.animations() {
        let mut tracks = Vec::new();
        for channel in animation.channels() {
            let Some(&id) = ids.get(&channel.target().node().index()) else {
                continue;
            };
            let reader = channel.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
            let (Some(inputs), Some(outputs)) = (reader.read_inputs(), reader.read_outputs()) else {
                continue;
            };
            let cubic = channel.sampler().interpolation() == gltf::animation::Interpolation::CubicSpline;
            let values = match outputs {
                ReadOutputs::Translations(it) => TrackValues::Translation(keys(it.map(Vec3::from), cubic)),
                ReadOutputs::Scales(it) => TrackValues::Scale(keys(it.map(Vec3::from), cubic)),
                ReadOutputs::Rotations(it) => TrackValues::Rotation(keys(
                    it.into_f32().map(|q| Quat::from_array(q).normalize()),
                    cubic,
                )),
                _ => continue,
            };
            let interpolation = match channel.sampler().interpolation() {
                gltf::animation::Interpolation::Step => Interpolation::Step,
                _ => Interpolation::Linear,
            };
            tracks.push(Track {
                target: graph.nodes[id].name.clone(),
                times: inputs.collect(),
                values,
                interpolation,
            });
        }
        let name = animation.name().map(str::to_string).unwrap_or_else(|| format!("animation_{}", animation.index()));
        graph.animations.push(AnimationData::new(name, tracks));
    }

    tracing::debug!(
        "parsed {}: {} nodes, {} animations",
        path,
        graph.nodes.len(),
        graph.animations.len()
    );
    Ok(graph)
}

/// File stem of the asset path, e.g. `astra` for `models/astra.glb`.
fn object_name(path: &str) -> &str {
    let file = path.rsplit('/').next().unwrap_or(path);
    file.split('.').next().unwrap_or(file)
}

fn add_subtree(graph: &mut ObjectGraph, ids: &mut HashMap<usize, NodeId>, node: &gltf::Node, parent: Option<NodeId>) {
    let (t, r, s) = node.transform().decomposed();
    let local = Transform {
        translation: Vec3::from(t),
        rotation: Quat::from_array(r).normalize(),
        scale: Vec3::from(s),
    };
    let name = node.name().map(str::to_string).unwrap_or_else(|| format!("node_{}", node.index()));
    let id = graph.add_node(name, local, parent);
    ids.insert(node.index(), id);
    for child in node.children() {
        add_subtree(graph, ids, &child, Some(id));
    }
}

/// Cubic-spline samplers store in-tangent, value, out-tangent per key; only
/// the values are kept.
fn keys<T>(values: impl Iterator<Item = T>, cubic: bool) -> Vec<T> {
    if cubic {
        values.skip(1).step_by(3).collect()
    } else {
        values.collect()
    }
}

/// All primitives of a mesh merged into one. The first primitive's material
/// wins.
fn read_mesh(path: &str, mesh: &gltf::Mesh, buffers: &[gltf::buffer::Data]) -> Result<Mesh, AssetError> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let mut joints: Vec<[u16; 4]> = Vec::new();
    let mut weights: Vec<[f32; 4]> = Vec::new();
    let mut skinned = true;
    let mut material = None;

    for primitive in mesh.primitives() {
        let reader = primitive.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
        let prim_positions: Vec<Vec3> = reader
            .read_positions()
            .ok_or_else(|| AssetError::MissingPositions { path: path.to_string() })?
            .map(Vec3::from)
            .collect();
        let base = positions.len() as u32;
        let count = prim_positions.len();

        match reader.read_normals() {
            Some(it) => normals.extend(it.map(Vec3::from)),
            None => normals.extend(std::iter::repeat(Vec3::Y).take(count)),
        }
        match reader.read_indices() {
            Some(it) => indices.extend(it.into_u32().map(|i| i + base)),
            None => indices.extend(base..base + count as u32),
        }
        match (reader.read_joints(0), reader.read_weights(0)) {
            (Some(j), Some(w)) if skinned => {
                joints.extend(read_joints(j));
                weights.extend(read_weights(w));
            }
            _ => skinned = false,
        }
        positions.extend(prim_positions);

        material.get_or_insert_with(|| {
            let source = primitive.material();
            Material {
                base_color: source.pbr_metallic_roughness().base_color_factor(),
                double_sided: source.double_sided(),
                ..Material::default()
            }
        });
    }

    let mut out = Mesh::new(positions, normals, indices, material.unwrap_or_default());
    if skinned && joints.len() == out.positions.len() && weights.len() == out.positions.len() {
        out.skin_weights = Some(SkinWeights { joints, weights });
    }
    Ok(out)
}

fn read_joints(joints: ReadJoints<'_>) -> Vec<[u16; 4]> {
    match joints {
        ReadJoints::U8(it) => it.map(|j| j.map(u16::from)).collect(),
        ReadJoints::U16(it) => it.collect(),
    }
}

fn read_weights(weights: ReadWeights<'_>) -> Vec<[f32; 4]> {
    match weights {
        ReadWeights::F32(it) => it.collect(),
        ReadWeights::U16(it) => it.map(|w| w.map(|v| v as f32 / 65535.0)).collect(),
        ReadWeights::U8(it) => it.map(|w| w.map(|v| v as f32 / 255.0)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_names_come_from_the_file_stem() {
        assert_eq!(object_name("models/astra.glb"), "astra");
        assert_eq!(object_name("models/animations/walking-backward.glb"), "walking-backward");
        assert_eq!(object_name("room"), "room");
    }

    #[test]
    fn cubic_spline_keys_keep_only_values() {
        let raw = [10, 1, 11, 20, 2, 21, 30, 3, 31];
        assert_eq!(keys(raw.into_iter(), true), vec![1, 2, 3]);
        assert_eq!(keys(raw.into_iter(), false).len(), 9);
    }

    #[test]
    fn garbage_bytes_are_a_parse_error() {
        let err = parse_glb("models/broken.glb", b"not a gltf file").unwrap_err();
        assert!(matches!(err, AssetError::Gltf { .. }));
        assert_eq!(err.path(), "models/broken.glb");
    }
}
