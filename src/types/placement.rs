use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::surface::SurfaceKey;

/// Reserved lightmap index marking a surface that is not lightmapped.
///
/// Any index at or above this value is treated as unlit.
pub const NOT_LIGHTMAPPED: u32 = 65534;

/// Affine map from a surface's local lightmap UVs into its atlas' UV space.
///
/// Serialized as `[scale_u, scale_v, offset_u, offset_v]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct ScaleOffset {
    pub scale: Vec2,
    pub offset: Vec2,
}

impl ScaleOffset {
    pub const IDENTITY: Self = Self {
        scale: Vec2::ONE,
        offset: Vec2::ZERO,
    };

    pub fn new(scale_u: f32, scale_v: f32, offset_u: f32, offset_v: f32) -> Self {
        Self {
            scale: Vec2::new(scale_u, scale_v),
            offset: Vec2::new(offset_u, offset_v),
        }
    }

    /// Local UV to atlas UV.
    pub fn apply(&self, uv: Vec2) -> Vec2 {
        uv * self.scale + self.offset
    }

    /// Atlas UV back to local UV. Zero scale components map to zero.
    pub fn invert(&self, atlas_uv: Vec2) -> Vec2 {
        let d = atlas_uv - self.offset;
        Vec2::new(
            if self.scale.x != 0.0 { d.x / self.scale.x } else { 0.0 },
            if self.scale.y != 0.0 { d.y / self.scale.y } else { 0.0 },
        )
    }

    /// Atlas-space rectangle `(min, size)` covered by local UVs in `[uv_min, uv_max]`.
    pub fn chart_rect(&self, uv_min: Vec2, uv_max: Vec2) -> (Vec2, Vec2) {
        (self.apply(uv_min), (uv_max - uv_min) * self.scale)
    }
}

impl Default for ScaleOffset {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<[f32; 4]> for ScaleOffset {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<ScaleOffset> for [f32; 4] {
    fn from(st: ScaleOffset) -> Self {
        [st.scale.x, st.scale.y, st.offset.x, st.offset.y]
    }
}

/// Where a surface lives in the lightmap atlases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtlasPlacement {
    pub lightmap_index: u32,
    pub scale_offset: ScaleOffset,
}

impl AtlasPlacement {
    pub fn new(lightmap_index: u32, scale_offset: ScaleOffset) -> Self {
        Self {
            lightmap_index,
            scale_offset,
        }
    }

    /// Placement of a surface that receives no lightmap.
    pub fn unlit() -> Self {
        Self::new(NOT_LIGHTMAPPED, ScaleOffset::IDENTITY)
    }

    pub fn is_lightmapped(&self) -> bool {
        self.lightmap_index < NOT_LIGHTMAPPED
    }

    /// Lightmap slot when lightmapped.
    pub fn atlas_index(&self) -> Option<usize> {
        self.is_lightmapped().then_some(self.lightmap_index as usize)
    }
}

/// Surface to atlas placement ("atlassing") map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlacementMap {
    entries: BTreeMap<SurfaceKey, AtlasPlacement>,
}

impl PlacementMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &SurfaceKey) -> Option<&AtlasPlacement> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &SurfaceKey) -> Option<&mut AtlasPlacement> {
        self.entries.get_mut(key)
    }

    pub fn insert(&mut self, key: SurfaceKey, placement: AtlasPlacement) -> Option<AtlasPlacement> {
        self.entries.insert(key, placement)
    }

    /// Placement for `key` when it is lightmapped.
    pub fn lit(&self, key: &SurfaceKey) -> Option<&AtlasPlacement> {
        self.get(key).filter(|p| p.is_lightmapped())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SurfaceKey, &AtlasPlacement)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(SurfaceKey, AtlasPlacement)> for PlacementMap {
    fn from_iter<I: IntoIterator<Item = (SurfaceKey, AtlasPlacement)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_offset_apply_and_invert() {
        let st = ScaleOffset::new(0.25, 0.5, 0.125, 0.25);
        let uv = Vec2::new(0.5, 0.5);
        let atlas = st.apply(uv);
        assert_eq!(atlas, Vec2::new(0.25, 0.5));
        assert_eq!(st.invert(atlas), uv);
    }

    #[test]
    fn chart_rect_uses_uv_bounds() {
        let st = ScaleOffset::new(0.5, 0.5, 0.1, 0.2);
        let (min, size) = st.chart_rect(Vec2::new(0.2, 0.0), Vec2::new(1.0, 0.5));
        assert!((min - Vec2::new(0.2, 0.2)).length() < 1e-6);
        assert!((size - Vec2::new(0.4, 0.25)).length() < 1e-6);
    }

    #[test]
    fn sentinel_is_unlit() {
        assert!(!AtlasPlacement::unlit().is_lightmapped());
        assert!(!AtlasPlacement::new(70000, ScaleOffset::IDENTITY).is_lightmapped());
        assert_eq!(AtlasPlacement::new(3, ScaleOffset::IDENTITY).atlas_index(), Some(3));
    }

    #[test]
    fn scale_offset_serializes_as_array() {
        let st = ScaleOffset::new(1.0, 2.0, 3.0, 4.0);
        let json = serde_json::to_string(&st).unwrap();
        assert_eq!(json, "[1.0,2.0,3.0,4.0]");
        let back: ScaleOffset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, st);
    }

    #[test]
    fn placement_map_queries() {
        let map: PlacementMap = [
            (SurfaceKey::from("a"), AtlasPlacement::new(0, ScaleOffset::IDENTITY)),
            (SurfaceKey::from("b"), AtlasPlacement::new(1, ScaleOffset::IDENTITY)),
            (SurfaceKey::from("c"), AtlasPlacement::new(0, ScaleOffset::IDENTITY)),
            (SurfaceKey::from("d"), AtlasPlacement::unlit()),
        ]
        .into_iter()
        .collect();

        assert_eq!(map.len(), 4);
        assert_eq!(map.get(&SurfaceKey::from("c")).unwrap().atlas_index(), Some(0));
        assert!(map.lit(&SurfaceKey::from("d")).is_none());
        assert!(map.lit(&SurfaceKey::from("b")).is_some());
    }
}
