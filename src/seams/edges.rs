use std::collections::HashMap;

use glam::{Vec2, Vec3};

use crate::types::{Bounds, Surface};

/// A point on a boundary edge of a surface, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub position: Vec3,
    /// Unit normal, or zero when the mesh has no usable normal here.
    pub normal: Vec3,
    /// Local lightmap UV (before the atlas scale/offset).
    pub uv: Vec2,
}

/// Edges referenced by exactly one triangle, as `(low, high)` vertex pairs in
/// ascending order.
pub fn boundary_edges(indices: &[u32]) -> Vec<(u32, u32)> {
    let mut refs: HashMap<(u32, u32), u32> = HashMap::new();
    for tri in indices.chunks_exact(3) {
        for j in 0..3 {
            let (a, b) = (tri[j], tri[(j + 1) % 3]);
            let edge = if a > b { (b, a) } else { (a, b) };
            *refs.entry(edge).or_insert(0) += 1;
        }
    }

    let mut edges: Vec<(u32, u32)> = refs
        .into_iter()
        .filter(|&(_, count)| count == 1)
        .map(|(edge, _)| edge)
        .collect();
    edges.sort_unstable();
    edges
}

/// Samples placed along an edge of `length`, including both endpoints.
pub fn sample_count(length: f32, samples_per_meter: f32, min_samples: usize) -> usize {
    let n = (length * samples_per_meter).ceil();
    let n = if n.is_finite() && n > 0.0 { n as usize } else { 0 };
    n.max(min_samples).max(2)
}

/// Evenly spaced samples along every boundary edge of `surface`.
///
/// Positions and normals are transformed to world space. When `bounds` is
/// given, only samples inside it are kept. Surfaces without geometry or
/// lightmap UVs produce no samples.
pub fn generate_samples(
    surface: &Surface,
    samples_per_meter: f32,
    min_samples: usize,
    bounds: Option<&Bounds>,
) -> Vec<SamplePoint> {
    let mesh = &surface.mesh;
    if mesh.is_empty() || !mesh.has_usable_uvs() || samples_per_meter <= 0.0 {
        return Vec::new();
    }

    let l2w = surface.local_to_world;
    let vertex_count = mesh.vertex_count() as u32;
    let mut samples = Vec::new();

    for (ia, ib) in boundary_edges(&mesh.indices) {
        if ia >= vertex_count || ib >= vertex_count {
            continue;
        }
        let (ia, ib) = (ia as usize, ib as usize);

        let pa = l2w.transform_point3(mesh.position(ia));
        let pb = l2w.transform_point3(mesh.position(ib));
        let na = l2w.transform_vector3(mesh.normal(ia)).normalize_or_zero();
        let nb = l2w.transform_vector3(mesh.normal(ib)).normalize_or_zero();
        let uva = mesh.lightmap_uv(ia);
        let uvb = mesh.lightmap_uv(ib);

        let n = sample_count(pa.distance(pb), samples_per_meter, min_samples);
        for j in 0..n {
            let t = j as f32 / (n - 1) as f32;
            samples.push(SamplePoint {
                position: pa.lerp(pb, t),
                normal: na.lerp(nb, t).normalize_or_zero(),
                uv: uva.lerp(uvb, t),
            });
        }
    }

    if let Some(bounds) = bounds {
        samples.retain(|s| bounds.contains_point(s.position));
    }
    samples
}
