use std::path::Path;

use tracing::debug;

use crate::error::{GiTweaksError, Result};
use crate::types::SurfaceMesh;

/// Load an OBJ file as a single surface mesh.
///
/// OBJ carries one UV channel, which doubles as the lightmap channel. Models
/// in the file are merged; materials are ignored.
pub fn load_obj(path: &Path) -> Result<SurfaceMesh> {
    let (models, _materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)
        .map_err(|e| GiTweaksError::Scene(format!("Failed to load OBJ {}: {e}", path.display())))?;

    debug!(model_count = models.len(), path = %path.display(), "Loaded OBJ models");

    let mut merged = SurfaceMesh::default();
    for model in models {
        append_mesh(&mut merged, convert_mesh(model.mesh));
    }
    Ok(merged)
}

/// Convert a `tobj::Mesh` into a `SurfaceMesh`.
///
/// UVs keep the OBJ bottom-left origin, which matches lightmap UV space.
fn convert_mesh(mesh: tobj::Mesh) -> SurfaceMesh {
    SurfaceMesh {
        positions: mesh.positions,
        normals: mesh.normals,
        uvs: mesh.texcoords,
        lightmap_uvs: Vec::new(),
        indices: mesh.indices,
    }
}

/// Append `part` to `mesh`, offsetting its indices.
///
/// Optional channels are kept only if every part provides them.
pub(crate) fn append_mesh(mesh: &mut SurfaceMesh, part: SurfaceMesh) {
    let first = mesh.positions.is_empty();
    let base = mesh.vertex_count() as u32;
    let part_vertices = part.vertex_count();

    let keep = |have: &Vec<f32>, add: &Vec<f32>, stride: usize| {
        (first || have.len() == base as usize * stride) && add.len() == part_vertices * stride
    };
    let keep_normals = keep(&mesh.normals, &part.normals, 3);
    let keep_uvs = keep(&mesh.uvs, &part.uvs, 2);
    let keep_lightmap_uvs = keep(&mesh.lightmap_uvs, &part.lightmap_uvs, 2);

    mesh.positions.extend_from_slice(&part.positions);
    mesh.indices.extend(part.indices.iter().map(|i| i + base));

    if keep_normals {
        mesh.normals.extend_from_slice(&part.normals);
    } else {
        mesh.normals.clear();
    }
    if keep_uvs {
        mesh.uvs.extend_from_slice(&part.uvs);
    } else {
        mesh.uvs.clear();
    }
    if keep_lightmap_uvs {
        mesh.lightmap_uvs.extend_from_slice(&part.lightmap_uvs);
    } else {
        mesh.lightmap_uvs.clear();
    }
}
