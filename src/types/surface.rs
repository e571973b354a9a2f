use std::fmt;

use glam::Mat4;
use serde::{Deserialize, Serialize};

use super::bounds::Bounds;
use super::mesh::SurfaceMesh;

/// Stable identifier of a lit surface (renderer) within a scene.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceKey(pub String);

impl SurfaceKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SurfaceKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for SurfaceKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for SurfaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One lit mesh instance.
#[derive(Debug, Clone)]
pub struct Surface {
    pub key: SurfaceKey,
    pub mesh: SurfaceMesh,
    pub local_to_world: Mat4,
    /// Per-renderer multiplier on the bake's texels-per-unit.
    pub scale_in_lightmap: f32,
}

impl Surface {
    pub fn new(key: impl Into<SurfaceKey>, mesh: SurfaceMesh) -> Self {
        Self {
            key: key.into(),
            mesh,
            local_to_world: Mat4::IDENTITY,
            scale_in_lightmap: 1.0,
        }
    }

    pub fn with_transform(mut self, local_to_world: Mat4) -> Self {
        self.local_to_world = local_to_world;
        self
    }

    pub fn with_scale_in_lightmap(mut self, scale: f32) -> Self {
        self.scale_in_lightmap = scale;
        self
    }

    pub fn world_bounds(&self) -> Option<Bounds> {
        self.mesh.world_bounds(&self.local_to_world)
    }
}
