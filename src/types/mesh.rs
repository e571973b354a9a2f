use glam::{Mat4, Vec2, Vec3};

use super::bounds::Bounds;

/// Triangle mesh of a lit surface, in object space.
///
/// Buffers are interleaved `Vec<f32>` / `Vec<u32>` as produced by the mesh
/// loaders.
#[derive(Debug, Clone, Default)]
pub struct SurfaceMesh {
    /// Interleaved positions: [x, y, z, x, y, z, ...]
    pub positions: Vec<f32>,
    /// Interleaved normals: [nx, ny, nz, ...] or empty
    pub normals: Vec<f32>,
    /// Primary UV channel: [u, v, u, v, ...] or empty
    pub uvs: Vec<f32>,
    /// Dedicated lightmap UV channel, or empty
    pub lightmap_uvs: Vec<f32>,
    /// Triangle indices into the vertex buffers
    pub indices: Vec<u32>,
}

impl SurfaceMesh {
    /// Number of vertices (positions / 3).
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of triangles (indices / 3).
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    pub fn has_lightmap_uvs(&self) -> bool {
        !self.lightmap_uvs.is_empty()
    }

    /// Whether the mesh contains no geometry.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    /// UV channel used for lightmapping: the lightmap channel, else the primary one.
    pub fn lightmap_uv_channel(&self) -> &[f32] {
        if self.has_lightmap_uvs() {
            &self.lightmap_uvs
        } else {
            &self.uvs
        }
    }

    /// Whether every vertex has a lightmap UV.
    pub fn has_usable_uvs(&self) -> bool {
        self.lightmap_uv_channel().len() / 2 >= self.vertex_count()
    }

    pub fn position(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.positions[i * 3..i * 3 + 3])
    }

    /// Vertex normal, or zero when the mesh carries none.
    pub fn normal(&self, i: usize) -> Vec3 {
        self.normals
            .get(i * 3..i * 3 + 3)
            .map(Vec3::from_slice)
            .unwrap_or(Vec3::ZERO)
    }

    pub fn lightmap_uv(&self, i: usize) -> Vec2 {
        Vec2::from_slice(&self.lightmap_uv_channel()[i * 2..i * 2 + 2])
    }

    /// Min/max of the lightmap UV channel, `None` without UVs.
    pub fn lightmap_uv_bounds(&self) -> Option<(Vec2, Vec2)> {
        let uvs = self.lightmap_uv_channel();
        if uvs.len() < 2 {
            return None;
        }
        let (min, max) = uvs.chunks_exact(2).map(Vec2::from_slice).fold(
            (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)),
            |(min, max), uv| (min.min(uv), max.max(uv)),
        );
        Some((min, max))
    }

    /// World-space bounds after applying `local_to_world`.
    pub fn world_bounds(&self, local_to_world: &Mat4) -> Option<Bounds> {
        Bounds::from_points(
            self.positions
                .chunks_exact(3)
                .map(|p| local_to_world.transform_point3(Vec3::from_slice(p))),
        )
    }

    /// Replace the normals with area-weighted vertex normals.
    pub fn compute_vertex_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.vertex_count()];

        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= accum.len() || b >= accum.len() || c >= accum.len() {
                continue;
            }
            // Magnitude is twice the triangle area.
            let n = (self.position(b) - self.position(a)).cross(self.position(c) - self.position(a));
            accum[a] += n;
            accum[b] += n;
            accum[c] += n;
        }

        self.normals = accum
            .into_iter()
            .flat_map(|n| n.normalize_or_zero().to_array())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> SurfaceMesh {
        SurfaceMesh {
            positions: vec![
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
            ],
            uvs: vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
            indices: vec![0, 1, 2, 0, 2, 3],
            ..Default::default()
        }
    }

    #[test]
    fn empty_mesh() {
        let mesh = SurfaceMesh::default();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.triangle_count(), 0);
        assert!(!mesh.has_normals());
        assert!(mesh.lightmap_uv_bounds().is_none());
    }

    #[test]
    fn quad_counts() {
        let mesh = quad();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert!(mesh.has_usable_uvs());
    }

    #[test]
    fn lightmap_channel_preferred() {
        let mut mesh = quad();
        assert_eq!(mesh.lightmap_uv(2), Vec2::new(1.0, 1.0));

        mesh.lightmap_uvs = vec![0.0, 0.0, 0.5, 0.0, 0.5, 0.5, 0.0, 0.5];
        assert_eq!(mesh.lightmap_uv(2), Vec2::new(0.5, 0.5));
        let (min, max) = mesh.lightmap_uv_bounds().unwrap();
        assert_eq!(min, Vec2::ZERO);
        assert_eq!(max, Vec2::splat(0.5));
    }

    #[test]
    fn computed_normals_face_up() {
        let mut mesh = quad();
        mesh.compute_vertex_normals();
        assert!(mesh.has_normals());
        for i in 0..mesh.vertex_count() {
            assert!((mesh.normal(i) - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn world_bounds_apply_transform() {
        let mesh = quad();
        let t = Mat4::from_translation(Vec3::new(2.0, 0.0, -1.0));
        let b = mesh.world_bounds(&t).unwrap();
        assert_eq!(b.min, Vec3::new(2.0, 0.0, -1.0));
        assert_eq!(b.max, Vec3::new(3.0, 1.0, -1.0));
    }
}
