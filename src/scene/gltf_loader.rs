use std::path::Path;

use tracing::{debug, warn};

use super::obj_loader::append_mesh;
use crate::error::{GiTweaksError, Result};
use crate::types::SurfaceMesh;

/// Load every primitive of a glTF or GLB file as one surface mesh.
///
/// The lightmap channel is `TEXCOORD_1` when present.
pub fn load_gltf(path: &Path) -> Result<SurfaceMesh> {
    let (document, buffers, _images) = gltf::import(path)
        .map_err(|e| GiTweaksError::Scene(format!("Failed to load glTF {}: {e}", path.display())))?;

    debug!(meshes = document.meshes().len(), path = %path.display(), "Loaded glTF document");

    let mut merged = SurfaceMesh::default();
    for mesh in document.meshes() {
        for primitive in mesh.primitives() {
            match extract_primitive(&primitive, &buffers) {
                Ok(part) => append_mesh(&mut merged, part),
                Err(e) => warn!(mesh = ?mesh.name(), "Skipping primitive: {e}"),
            }
        }
    }

    if merged.is_empty() {
        return Err(GiTweaksError::Scene(format!(
            "No triangle geometry in {}",
            path.display()
        )));
    }
    Ok(merged)
}

fn extract_primitive(primitive: &gltf::Primitive<'_>, buffers: &[gltf::buffer::Data]) -> Result<SurfaceMesh> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        return Err(GiTweaksError::Scene(format!(
            "Unsupported primitive mode {:?}",
            primitive.mode()
        )));
    }

    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Vec<f32> = reader
        .read_positions()
        .ok_or_else(|| GiTweaksError::Scene("Primitive missing positions".into()))?
        .flatten()
        .collect();

    let normals: Vec<f32> = reader
        .read_normals()
        .map(|iter| iter.flatten().collect())
        .unwrap_or_default();

    // glTF has a top-left UV origin, lightmap UVs are bottom-left
    let read_uvs = |set: u32| -> Vec<f32> {
        reader
            .read_tex_coords(set)
            .map(|iter| iter.into_f32().flat_map(|[u, v]| [u, 1.0 - v]).collect())
            .unwrap_or_default()
    };
    let uvs = read_uvs(0);
    let lightmap_uvs = read_uvs(1);

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..(positions.len() / 3) as u32).collect(),
    };

    Ok(SurfaceMesh {
        positions,
        normals,
        uvs,
        lightmap_uvs,
        indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal glTF with one triangle, positions and two UV sets.
    fn write_triangle_gltf(dir: &Path) -> std::path::PathBuf {
        let mut bytes: Vec<u8> = Vec::new();
        for v in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        for v in [0.0f32, 0.0, 1.0, 0.0, 0.0, 1.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        for v in [0.0f32, 0.25, 0.5, 0.25, 0.0, 0.75] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        std::fs::write(dir.join("tri.bin"), &bytes).unwrap();

        let json = format!(
            r#"{{
  "asset": {{"version": "2.0"}},
  "buffers": [{{"byteLength": {len}, "uri": "tri.bin"}}],
  "bufferViews": [
    {{"buffer": 0, "byteOffset": 0, "byteLength": 36}},
    {{"buffer": 0, "byteOffset": 36, "byteLength": 24}},
    {{"buffer": 0, "byteOffset": 60, "byteLength": 24}}
  ],
  "accessors": [
    {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0,0,0], "max": [1,1,0]}},
    {{"bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC2"}},
    {{"bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC2"}}
  ],
  "meshes": [{{"primitives": [{{"attributes": {{"POSITION": 0, "TEXCOORD_0": 1, "TEXCOORD_1": 2}}}}]}}],
  "nodes": [{{"mesh": 0}}],
  "scenes": [{{"nodes": [0]}}],
  "scene": 0
}}"#,
            len = bytes.len()
        );
        let path = dir.join("tri.gltf");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn loads_second_uv_set_as_lightmap_channel() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = load_gltf(&write_triangle_gltf(dir.path())).unwrap();

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert!(mesh.has_lightmap_uvs());
        assert!(!mesh.has_normals());
        // v flipped: 0.25 -> 0.75
        assert!((mesh.lightmap_uvs[1] - 0.75).abs() < 1e-6);
        assert!((mesh.uvs[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn missing_gltf_is_scene_error() {
        let err = load_gltf(Path::new("/nonexistent/mesh.glb")).unwrap_err();
        assert!(matches!(err, GiTweaksError::Scene(_)));
    }
}
