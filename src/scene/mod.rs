pub mod gltf_loader;
pub mod obj_loader;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{BakeSettings, SeamFixOverrides};
use crate::error::{GiTweaksError, Result};
use crate::types::{Bounds, Surface, SurfaceKey, SurfaceMesh};

/// Supported mesh formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Obj,
    Gltf,
}

impl MeshFormat {
    /// Detect format from file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "obj" => Ok(MeshFormat::Obj),
            "gltf" | "glb" => Ok(MeshFormat::Gltf),
            _ => Err(GiTweaksError::Scene(format!(
                "Unsupported mesh format: .{ext}"
            ))),
        }
    }
}

/// Load a mesh file, recomputing normals when it has none.
pub fn load_mesh(path: &Path) -> Result<SurfaceMesh> {
    let mut mesh = match MeshFormat::from_path(path)? {
        MeshFormat::Obj => obj_loader::load_obj(path)?,
        MeshFormat::Gltf => gltf_loader::load_gltf(path)?,
    };
    if !mesh.has_normals() {
        mesh.compute_vertex_normals();
    }
    Ok(mesh)
}

fn identity() -> Mat4 {
    Mat4::IDENTITY
}

fn one() -> f32 {
    1.0
}

fn yes() -> bool {
    true
}

/// A lit renderer in `scene.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceEntry {
    pub name: SurfaceKey,
    /// Mesh file, relative to the manifest.
    pub mesh: PathBuf,
    /// Column-major local-to-world matrix.
    #[serde(default = "identity")]
    pub transform: Mat4,
    #[serde(default = "one")]
    pub scale_in_lightmap: f32,
}

/// Seam fixes between one surface and a list of partners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeamFixEntry {
    pub surface: SurfaceKey,
    pub with: Vec<SurfaceKey>,
    #[serde(default)]
    pub overrides: SeamFixOverrides,
}

/// Box in which every pair of overlapping surfaces gets its seams fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeamFixVolumeEntry {
    pub center: Vec3,
    pub extents: Vec3,
    #[serde(default)]
    pub exclude: Vec<SurfaceKey>,
    /// Run as part of the post-bake pipeline.
    #[serde(default = "yes")]
    pub run_on_bake: bool,
    #[serde(default)]
    pub overrides: SeamFixOverrides,
}

impl SeamFixVolumeEntry {
    pub fn bounds(&self) -> Bounds {
        Bounds::from_center_extents(self.center, self.extents)
    }
}

/// LOD renderers reusing the lightmap region of LOD0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedLodEntry {
    pub lod0: SurfaceKey,
    pub renderers: Vec<SurfaceKey>,
}

/// Contents of `scene.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneManifest {
    #[serde(default)]
    pub lighting_settings: BakeSettings,
    pub surfaces: Vec<SurfaceEntry>,
    #[serde(default)]
    pub seam_fixes: Vec<SeamFixEntry>,
    #[serde(default)]
    pub seam_fix_volumes: Vec<SeamFixVolumeEntry>,
    #[serde(default)]
    pub shared_lods: Vec<SharedLodEntry>,
}

/// Loaded scene: surfaces with geometry plus the post-bake setup.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub bake: BakeSettings,
    pub surfaces: Vec<Surface>,
    pub seam_fixes: Vec<SeamFixEntry>,
    pub seam_fix_volumes: Vec<SeamFixVolumeEntry>,
    pub shared_lods: Vec<SharedLodEntry>,
}

impl Scene {
    /// Read `scene.json` and load every referenced mesh.
    ///
    /// Surfaces whose mesh cannot be loaded are skipped with a warning.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            GiTweaksError::Scene(format!("Failed to read {}: {e}", path.display()))
        })?;
        let manifest: SceneManifest = serde_json::from_str(&text)?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Ok(Self::from_manifest(manifest, dir))
    }

    pub fn from_manifest(manifest: SceneManifest, dir: &Path) -> Self {
        let mut cache: HashMap<PathBuf, Option<SurfaceMesh>> = HashMap::new();
        let mut surfaces = Vec::with_capacity(manifest.surfaces.len());

        for entry in manifest.surfaces {
            let mesh_path = dir.join(&entry.mesh);
            let mesh = cache
                .entry(mesh_path.clone())
                .or_insert_with(|| match load_mesh(&mesh_path) {
                    Ok(mesh) => Some(mesh),
                    Err(e) => {
                        warn!(surface = %entry.name, "Skipping surface: {e}");
                        None
                    }
                })
                .clone();

            if let Some(mesh) = mesh {
                debug!(
                    surface = %entry.name,
                    vertices = mesh.vertex_count(),
                    triangles = mesh.triangle_count(),
                    "Loaded surface"
                );
                surfaces.push(
                    Surface::new(entry.name, mesh)
                        .with_transform(entry.transform)
                        .with_scale_in_lightmap(entry.scale_in_lightmap),
                );
            }
        }

        info!(
            surfaces = surfaces.len(),
            seam_fixes = manifest.seam_fixes.len(),
            volumes = manifest.seam_fix_volumes.len(),
            shared_lods = manifest.shared_lods.len(),
            "Loaded scene"
        );

        Self {
            bake: manifest.lighting_settings,
            surfaces,
            seam_fixes: manifest.seam_fixes,
            seam_fix_volumes: manifest.seam_fix_volumes,
            shared_lods: manifest.shared_lods,
        }
    }

    pub fn surface(&self, key: &SurfaceKey) -> Option<&Surface> {
        self.surfaces.iter().find(|s| &s.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD_OBJ: &str = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\nf 1/1 2/2 3/3 4/4\n";

    #[test]
    fn format_detection() {
        assert_eq!(MeshFormat::from_path(Path::new("a.OBJ")).unwrap(), MeshFormat::Obj);
        assert_eq!(MeshFormat::from_path(Path::new("a.glb")).unwrap(), MeshFormat::Gltf);
        assert!(MeshFormat::from_path(Path::new("a.ply")).is_err());
    }

    #[test]
    fn manifest_defaults() {
        let m: SceneManifest = serde_json::from_str(
            r#"{
                "surfaces": [{"name": "wall", "mesh": "wall.obj"}],
                "seam_fix_volumes": [{"center": [0, 0, 0], "extents": [1, 2, 3]}]
            }"#,
        )
        .unwrap();
        assert_eq!(m.lighting_settings.lightmap_resolution, 40.0);
        assert_eq!(m.surfaces[0].transform, Mat4::IDENTITY);
        assert_eq!(m.surfaces[0].scale_in_lightmap, 1.0);
        assert!(m.seam_fix_volumes[0].run_on_bake);
        assert_eq!(m.seam_fix_volumes[0].bounds().max, Vec3::new(1.0, 2.0, 3.0));
        assert!(m.seam_fixes.is_empty());
    }

    #[test]
    fn load_scene_with_missing_mesh() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("quad.obj"), QUAD_OBJ).unwrap();
        std::fs::write(
            dir.path().join("scene.json"),
            r#"{
                "lighting_settings": {"lightmap_resolution": 16},
                "surfaces": [
                    {"name": "a", "mesh": "quad.obj"},
                    {"name": "b", "mesh": "quad.obj", "scale_in_lightmap": 2.0,
                     "transform": [1,0,0,0, 0,1,0,0, 0,0,1,0, 1,0,0,1]},
                    {"name": "ghost", "mesh": "missing.obj"}
                ],
                "seam_fixes": [{"surface": "a", "with": ["b"], "overrides": {"seam_fix_strength": 2.0}}]
            }"#,
        )
        .unwrap();

        let scene = Scene::load(&dir.path().join("scene.json")).unwrap();
        assert_eq!(scene.bake.lightmap_resolution, 16.0);
        assert_eq!(scene.surfaces.len(), 2);
        let b = scene.surface(&SurfaceKey::from("b")).unwrap();
        assert_eq!(b.scale_in_lightmap, 2.0);
        assert_eq!(b.world_bounds().unwrap().min, Vec3::new(1.0, 0.0, 0.0));
        // normals are recomputed for OBJ without vn
        assert!(b.mesh.has_normals());
        assert!(scene.surface(&SurfaceKey::from("ghost")).is_none());
        assert_eq!(scene.seam_fixes[0].overrides.seam_fix_strength, Some(2.0));
    }

    #[test]
    fn malformed_manifest_is_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("scene.json"), "{ not json").unwrap();
        assert!(Scene::load(&dir.path().join("scene.json")).is_err());
    }
}
