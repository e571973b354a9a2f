use std::collections::HashSet;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::LightingStore;
use crate::error::{GiTweaksError, Result};
use crate::types::{LightmapBuffer, LightmapChannel, LightmapSet, PlacementMap};

/// Texture file names of one lightmap slot, relative to the manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightmapFiles {
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directional: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadowmask: Option<String>,
}

impl LightmapFiles {
    pub fn get(&self, channel: LightmapChannel) -> Option<&str> {
        match channel {
            LightmapChannel::Color => Some(&self.color),
            LightmapChannel::Directional => self.directional.as_deref(),
            LightmapChannel::ShadowMask => self.shadowmask.as_deref(),
        }
    }

    fn set(&mut self, channel: LightmapChannel, name: String) {
        match channel {
            LightmapChannel::Color => self.color = name,
            LightmapChannel::Directional => self.directional = Some(name),
            LightmapChannel::ShadowMask => self.shadowmask = Some(name),
        }
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        LightmapChannel::ALL.into_iter().filter_map(|c| self.get(c))
    }
}

/// Contents of `lighting.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightingManifest {
    /// Bumped on every repack so new textures never overwrite live ones.
    #[serde(default)]
    pub generation: u32,
    pub lightmaps: Vec<LightmapFiles>,
    #[serde(default)]
    pub placements: PlacementMap,
}

/// Lighting data stored as a JSON manifest next to EXR/PNG textures.
pub struct FsStore {
    manifest_path: PathBuf,
    dir: PathBuf,
    manifest: LightingManifest,
    lightmaps: Vec<LightmapSet>,
}

impl FsStore {
    /// Load a manifest and every texture it lists.
    pub fn open(manifest_path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(manifest_path).map_err(|e| {
            GiTweaksError::Lighting(format!(
                "Failed to read {}: {e}",
                manifest_path.display()
            ))
        })?;
        let manifest: LightingManifest = serde_json::from_str(&text)?;
        let dir = manifest_dir(manifest_path);

        let mut lightmaps = Vec::with_capacity(manifest.lightmaps.len());
        for (index, files) in manifest.lightmaps.iter().enumerate() {
            let mut set = LightmapSet::new(load_lightmap(&dir.join(&files.color))?);
            for channel in [LightmapChannel::Directional, LightmapChannel::ShadowMask] {
                if let Some(name) = files.get(channel) {
                    let buffer = load_lightmap(&dir.join(name))?;
                    if buffer.dimensions() != set.size() {
                        return Err(GiTweaksError::Lighting(format!(
                            "{channel} texture {name} of lightmap {index} does not match color size {:?}",
                            set.size()
                        )));
                    }
                    set.set(channel, buffer);
                }
            }
            lightmaps.push(set);
        }

        info!(
            path = %manifest_path.display(),
            lightmaps = lightmaps.len(),
            surfaces = manifest.placements.len(),
            "Loaded lighting data"
        );

        Ok(Self {
            manifest_path: manifest_path.to_path_buf(),
            dir,
            manifest,
            lightmaps,
        })
    }

    /// Write a new lighting data directory as EXR textures plus manifest.
    pub fn create(
        manifest_path: &Path,
        lightmaps: Vec<LightmapSet>,
        placements: PlacementMap,
    ) -> Result<Self> {
        let dir = manifest_dir(manifest_path);
        std::fs::create_dir_all(&dir)?;

        let mut manifest = LightingManifest {
            generation: 0,
            lightmaps: Vec::with_capacity(lightmaps.len()),
            placements,
        };
        for (index, set) in lightmaps.iter().enumerate() {
            manifest
                .lightmaps
                .push(write_set(&dir, set, index, manifest.generation, "exr")?);
        }

        let store = Self {
            manifest_path: manifest_path.to_path_buf(),
            dir,
            manifest,
            lightmaps,
        };
        store.write_manifest()?;
        Ok(store)
    }

    pub fn manifest(&self) -> &LightingManifest {
        &self.manifest
    }

    /// Extension of existing textures, used for newly created ones.
    fn texture_extension(&self) -> String {
        self.manifest
            .lightmaps
            .first()
            .and_then(|f| Path::new(&f.color).extension())
            .and_then(|e| e.to_str())
            .unwrap_or("exr")
            .to_ascii_lowercase()
    }

    /// Slot `index` exists and `buffer` matches its size.
    fn check_slot(&self, index: usize, channel: LightmapChannel, buffer: &LightmapBuffer) -> Result<()> {
        let set = self
            .lightmaps
            .get(index)
            .ok_or_else(|| GiTweaksError::Lighting(format!("no lightmap slot {index}")))?;
        if buffer.dimensions() != set.size() {
            return Err(GiTweaksError::Lighting(format!(
                "{channel} lightmap {index} must be {:?}, got {:?}",
                set.size(),
                buffer.dimensions()
            )));
        }
        Ok(())
    }

    fn write_manifest(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.manifest)?;
        let tmp = self.manifest_path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .and_then(|_| std::fs::rename(&tmp, &self.manifest_path))
            .map_err(|e| {
                GiTweaksError::Persistence(format!(
                    "Failed to write {}: {e}",
                    self.manifest_path.display()
                ))
            })
    }
}

impl LightingStore for FsStore {
    fn lightmap_count(&self) -> usize {
        self.lightmaps.len()
    }

    fn lightmap_set(&self, index: usize) -> Option<&LightmapSet> {
        self.lightmaps.get(index)
    }

    fn preview_lightmap(&mut self, index: usize, channel: LightmapChannel, buffer: LightmapBuffer) -> Result<()> {
        self.check_slot(index, channel, &buffer)?;
        if let Some(set) = self.lightmaps.get_mut(index) {
            set.set(channel, buffer);
        }
        Ok(())
    }

    fn persist_lightmap(&mut self, index: usize, channel: LightmapChannel, buffer: LightmapBuffer) -> Result<()> {
        self.check_slot(index, channel, &buffer)?;
        let existing = self
            .manifest
            .lightmaps
            .get(index)
            .and_then(|f| f.get(channel))
            .map(str::to_owned);
        let (name, is_new) = match existing {
            Some(name) => (name, false),
            None => (
                texture_name(index, channel, self.manifest.generation, &self.texture_extension()),
                true,
            ),
        };

        save_lightmap(&buffer, &self.dir.join(&name))?;
        self.preview_lightmap(index, channel, buffer)?;

        if is_new {
            if let Some(files) = self.manifest.lightmaps.get_mut(index) {
                files.set(channel, name);
            }
            self.write_manifest()?;
        }
        Ok(())
    }

    fn placements(&self) -> &PlacementMap {
        &self.manifest.placements
    }

    fn save_placements(&mut self, placements: PlacementMap) -> Result<()> {
        let previous = std::mem::replace(&mut self.manifest.placements, placements);
        if let Err(e) = self.write_manifest() {
            self.manifest.placements = previous;
            return Err(e);
        }
        Ok(())
    }

    fn commit_repack(&mut self, atlases: Vec<LightmapSet>, placements: PlacementMap) -> Result<()> {
        let generation = self.manifest.generation + 1;
        let ext = self.texture_extension();

        let mut files = Vec::with_capacity(atlases.len());
        for (index, set) in atlases.iter().enumerate() {
            files.push(write_set(&self.dir, set, index, generation, &ext)?);
        }

        let new_manifest = LightingManifest {
            generation,
            lightmaps: files,
            placements,
        };
        let old_manifest = std::mem::replace(&mut self.manifest, new_manifest);
        if let Err(e) = self.write_manifest() {
            let failed = std::mem::replace(&mut self.manifest, old_manifest);
            for name in failed.lightmaps.iter().flat_map(|f| f.names()) {
                if let Err(e) = std::fs::remove_file(self.dir.join(name)) {
                    warn!(name, "Failed to remove uncommitted lightmap: {e}");
                }
            }
            return Err(e);
        }

        let referenced: HashSet<&str> = self
            .manifest
            .lightmaps
            .iter()
            .flat_map(|f| f.names())
            .collect();
        for name in old_manifest.lightmaps.iter().flat_map(|f| f.names()) {
            if referenced.contains(name) {
                continue;
            }
            let path = self.dir.join(name);
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "Removed unreferenced lightmap"),
                Err(e) => warn!(path = %path.display(), "Failed to remove unreferenced lightmap: {e}"),
            }
        }

        self.lightmaps = atlases;
        info!(
            lightmaps = self.lightmaps.len(),
            generation, "Committed repacked lighting data"
        );
        Ok(())
    }
}

fn manifest_dir(manifest_path: &Path) -> PathBuf {
    manifest_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf()
}

fn texture_name(index: usize, channel: LightmapChannel, generation: u32, ext: &str) -> String {
    if generation == 0 {
        format!("Lightmap-{index}_{}.{ext}", channel.suffix())
    } else {
        format!("Lightmap-g{generation}-{index}_{}.{ext}", channel.suffix())
    }
}

fn write_set(dir: &Path, set: &LightmapSet, index: usize, generation: u32, ext: &str) -> Result<LightmapFiles> {
    let mut files = LightmapFiles::default();
    for channel in set.channels() {
        if let Some(buffer) = set.get(channel) {
            let name = texture_name(index, channel, generation, ext);
            save_lightmap(buffer, &dir.join(&name))?;
            files.set(channel, name);
        }
    }
    Ok(files)
}

/// Load a texture as float RGBA with row 0 at V = 0.
pub fn load_lightmap(path: &Path) -> Result<LightmapBuffer> {
    let mut buffer = image::open(path)
        .map_err(|e| {
            GiTweaksError::Lighting(format!("Failed to load lightmap {}: {e}", path.display()))
        })?
        .into_rgba32f();
    image::imageops::flip_vertical_in_place(&mut buffer);

    debug!(
        path = %path.display(),
        width = buffer.width(),
        height = buffer.height(),
        "Loaded lightmap"
    );
    Ok(buffer)
}

/// Encode a lightmap by extension: `.png` as 16-bit RGBA, anything else as float EXR.
pub fn save_lightmap(buffer: &LightmapBuffer, path: &Path) -> Result<()> {
    let image = DynamicImage::ImageRgba32F(image::imageops::flip_vertical(buffer));
    let is_png = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"));

    let result = if is_png {
        image.into_rgba16().save(path)
    } else {
        image.save_with_format(path, image::ImageFormat::OpenExr)
    };
    result.map_err(|e| {
        GiTweaksError::Persistence(format!("Failed to write lightmap {}: {e}", path.display()))
    })
}
