use std::collections::BTreeMap;

use glam::Vec2;

use super::rect::PixelRect;
use crate::store::LightingStore;
use crate::types::{AtlasPlacement, PlacementMap, Surface, SurfaceKey};

/// Lightmap UV bounds per surface. Surfaces missing here are assumed to span `[0, 1]²`.
pub type UvBounds = BTreeMap<SurfaceKey, (Vec2, Vec2)>;

pub fn uv_bounds_of(surfaces: &[Surface]) -> UvBounds {
    surfaces
        .iter()
        .filter_map(|s| s.mesh.lightmap_uv_bounds().map(|b| (s.key.clone(), b)))
        .collect()
}

/// Pixels of a `width` x `height` atlas covered by a surface's chart.
pub fn chart_rect(placement: &AtlasPlacement, uv_bounds: (Vec2, Vec2), width: u32, height: u32) -> PixelRect {
    let (min, size) = placement.scale_offset.chart_rect(uv_bounds.0, uv_bounds.1);
    let max = min + size;
    let (lo, hi) = (min.min(max), min.max(max));
    let dims = Vec2::new(width as f32, height as f32);

    let lo = (lo * dims).floor().clamp(Vec2::ZERO, dims);
    let hi = (hi * dims).ceil().clamp(Vec2::ZERO, dims);
    PixelRect::new(
        lo.x as u32,
        lo.y as u32,
        (hi.x - lo.x) as u32,
        (hi.y - lo.y) as u32,
    )
}

/// Surfaces occupying one rectangle of one atlas.
///
/// Surfaces sharing a placement (shared LODs) map to the same chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub atlas: usize,
    pub rect: PixelRect,
    pub members: Vec<SurfaceKey>,
}

/// Charts of every lit placement with a valid atlas, ordered by atlas then position.
pub fn collect_charts(placements: &PlacementMap, uv_bounds: &UvBounds, sizes: &[(u32, u32)]) -> Vec<Chart> {
    let mut charts: BTreeMap<(usize, u32, u32, u32, u32), Vec<SurfaceKey>> = BTreeMap::new();
    for (key, placement) in placements.iter() {
        let Some(atlas) = placement.atlas_index() else {
            continue;
        };
        let Some(&(w, h)) = sizes.get(atlas) else {
            continue;
        };
        let bounds = uv_bounds.get(key).copied().unwrap_or((Vec2::ZERO, Vec2::ONE));
        let rect = chart_rect(placement, bounds, w, h);
        if rect.is_empty() {
            continue;
        }
        charts
            .entry((atlas, rect.y, rect.x, rect.w, rect.h))
            .or_default()
            .push(key.clone());
    }

    charts
        .into_iter()
        .map(|((atlas, y, x, w, h), members)| Chart {
            atlas,
            rect: PixelRect::new(x, y, w, h),
            members,
        })
        .collect()
}

/// Used pixels of one atlas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtlasCoverage {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub charts: usize,
    pub used_pixels: u64,
}

impl AtlasCoverage {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Fraction of the atlas covered by charts.
    pub fn coverage(&self) -> f32 {
        fraction(self.used_pixels, self.area())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageReport {
    pub atlases: Vec<AtlasCoverage>,
}

impl CoverageReport {
    /// Covered fraction over all atlases combined.
    pub fn total_coverage(&self) -> f32 {
        let used = self.atlases.iter().map(|a| a.used_pixels).sum();
        let area = self.atlases.iter().map(|a| a.area()).sum();
        fraction(used, area)
    }
}

pub(crate) fn fraction(used: u64, area: u64) -> f32 {
    if area == 0 {
        0.0
    } else {
        (used as f64 / area as f64) as f32
    }
}

/// Per-atlas coverage of the placements in `store`.
pub fn measure_coverage<S: LightingStore + ?Sized>(store: &S, uv_bounds: &UvBounds) -> CoverageReport {
    let sizes = atlas_sizes(store);
    let charts = collect_charts(store.placements(), uv_bounds, &sizes);

    let atlases = sizes
        .iter()
        .enumerate()
        .map(|(index, &(width, height))| {
            let mine = charts.iter().filter(|c| c.atlas == index);
            AtlasCoverage {
                index,
                width,
                height,
                charts: mine.clone().count(),
                used_pixels: mine.map(|c| c.rect.area()).sum(),
            }
        })
        .collect();
    CoverageReport { atlases }
}

pub fn atlas_sizes<S: LightingStore + ?Sized>(store: &S) -> Vec<(u32, u32)> {
    (0..store.lightmap_count())
        .map(|i| store.lightmap_set(i).map(|s| s.size()).unwrap_or((0, 0)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::lightmap::solid_lightmap;
    use crate::types::{LightmapSet, ScaleOffset};

    fn placed(index: u32, st: ScaleOffset) -> AtlasPlacement {
        AtlasPlacement::new(index, st)
    }

    #[test]
    fn chart_rect_rounds_outwards() {
        let p = placed(0, ScaleOffset::new(0.25, 0.25, 0.126, 0.5));
        let r = chart_rect(&p, (Vec2::ZERO, Vec2::ONE), 64, 64);
        assert_eq!(r, PixelRect::new(8, 32, 17, 16));

        let half = chart_rect(&p, (Vec2::ZERO, Vec2::new(0.5, 1.0)), 64, 64);
        assert_eq!(half.w, 9);
    }

    #[test]
    fn shared_placements_form_one_chart() {
        let st = ScaleOffset::new(0.5, 0.5, 0.0, 0.0);
        let placements: PlacementMap = [
            (SurfaceKey::from("lod0"), placed(0, st)),
            (SurfaceKey::from("lod1"), placed(0, st)),
            (SurfaceKey::from("other"), placed(0, ScaleOffset::new(0.5, 0.5, 0.5, 0.5))),
            (SurfaceKey::from("unlit"), AtlasPlacement::unlit()),
            (SurfaceKey::from("dangling"), placed(7, st)),
        ]
        .into_iter()
        .collect();

        let charts = collect_charts(&placements, &UvBounds::new(), &[(32, 32)]);
        assert_eq!(charts.len(), 2);
        assert_eq!(charts[0].members, vec![SurfaceKey::from("lod0"), SurfaceKey::from("lod1")]);
        assert_eq!(charts[1].rect, PixelRect::new(16, 16, 16, 16));
    }

    #[test]
    fn coverage_per_atlas_and_total() {
        let placements: PlacementMap = [
            (SurfaceKey::from("a"), placed(0, ScaleOffset::new(0.5, 0.5, 0.0, 0.0))),
            (SurfaceKey::from("b"), placed(1, ScaleOffset::IDENTITY)),
        ]
        .into_iter()
        .collect();
        let store = MemoryStore::new(
            vec![
                LightmapSet::new(solid_lightmap(64, 64, [0.0; 4])),
                LightmapSet::new(solid_lightmap(32, 32, [0.0; 4])),
            ],
            placements,
        );

        let report = measure_coverage(&store, &UvBounds::new());
        assert_eq!(report.atlases.len(), 2);
        assert!((report.atlases[0].coverage() - 0.25).abs() < 1e-6);
        assert!((report.atlases[1].coverage() - 1.0).abs() < 1e-6);
        // (1024 + 1024) / (4096 + 1024)
        assert!((report.total_coverage() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn empty_store_has_zero_coverage() {
        let store = MemoryStore::default();
        assert_eq!(measure_coverage(&store, &UvBounds::new()).total_coverage(), 0.0);
    }
}
