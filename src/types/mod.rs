pub mod bounds;
pub mod lightmap;
pub mod mesh;
pub mod placement;
pub mod surface;

pub use bounds::Bounds;
pub use lightmap::{LightmapBuffer, LightmapChannel, LightmapSet};
pub use mesh::SurfaceMesh;
pub use placement::{AtlasPlacement, PlacementMap, ScaleOffset, NOT_LIGHTMAPPED};
pub use surface::{Surface, SurfaceKey};
