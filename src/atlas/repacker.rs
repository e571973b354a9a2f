use std::collections::{HashMap, HashSet};

use glam::Vec2;
use tracing::{debug, info, warn};

use super::blit::render_atlases;
use super::coverage::{atlas_sizes, collect_charts, fraction, UvBounds};
use super::packer::SkylinePacker;
use super::rect::PixelRect;
use crate::config::RepackConfig;
use crate::error::Result;
use crate::store::LightingStore;
use crate::types::{AtlasPlacement, PlacementMap, ScaleOffset, SurfaceKey};

/// Before/after summary of a repack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepackReport {
    pub old_atlas_count: usize,
    pub new_atlas_count: usize,
    pub old_coverage_percent: f32,
    pub new_coverage_percent: f32,
}

impl RepackReport {
    pub fn changed(&self) -> bool {
        self.old_atlas_count != self.new_atlas_count
            || self.old_coverage_percent != self.new_coverage_percent
    }
}

/// A chart tracked through repeated splits.
#[derive(Debug, Clone)]
struct PackedChart {
    members: Vec<SurfaceKey>,
    origin_atlas: usize,
    origin_rect: PixelRect,
    /// Position in the atlas currently holding the chart.
    rect: PixelRect,
}

#[derive(Debug, Clone)]
struct WorkAtlas {
    /// Source atlas index while the atlas is still untouched.
    untouched: Option<usize>,
    width: u32,
    height: u32,
    charts: Vec<PackedChart>,
}

impl WorkAtlas {
    fn used_pixels(&self) -> u64 {
        self.charts.iter().map(|c| c.rect.area()).sum()
    }

    fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    fn coverage(&self) -> f32 {
        fraction(self.used_pixels(), self.area())
    }
}

/// Copy of a chart's dilated source pixels into a new atlas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blit {
    pub source_atlas: usize,
    pub source: PixelRect,
    pub dest_x: u32,
    pub dest_y: u32,
}

/// How one atlas of the repacked set is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedAtlas {
    /// Reuse a source atlas as is.
    Keep { source: usize },
    /// Start blank and copy charts in.
    Render { width: u32, height: u32, blits: Vec<Blit> },
}

/// Staged result of planning a repack; nothing is written until committed.
#[derive(Debug, Clone)]
pub struct RepackPlan {
    pub atlases: Vec<PlannedAtlas>,
    pub placements: PlacementMap,
    pub report: RepackReport,
}

/// Pack `charts` into as many `width` x `height` bins as needed.
///
/// Largest charts go first. `None` when a bin ends up empty, meaning some
/// chart does not fit a bin of this size at all.
fn split_into_bins(charts: &[PackedChart], width: u32, height: u32, config: &RepackConfig) -> Option<Vec<WorkAtlas>> {
    let mut remaining: Vec<PackedChart> = charts.to_vec();
    remaining.sort_by(|a, b| {
        b.rect
            .area()
            .cmp(&a.rect.area())
            .then(b.rect.h.cmp(&a.rect.h))
            .then(a.origin_rect.y.cmp(&b.origin_rect.y))
            .then(a.origin_rect.x.cmp(&b.origin_rect.x))
    });

    let mut bins = Vec::new();
    while !remaining.is_empty() {
        let mut packer = SkylinePacker::new(width, height, config.padding, config.dilation);
        let mut placed = Vec::new();
        let mut left = Vec::new();
        for mut chart in remaining {
            match packer.pack(chart.rect.w, chart.rect.h) {
                Some(rect) => {
                    chart.rect = rect;
                    placed.push(chart);
                }
                None => left.push(chart),
            }
        }
        if placed.is_empty() {
            return None;
        }
        bins.push(WorkAtlas {
            untouched: None,
            width,
            height,
            charts: placed,
        });
        remaining = left;
    }
    Some(bins)
}

/// Final atlases for `atlas`, halving it for as long as that improves coverage.
fn plan_atlas(atlas: WorkAtlas, config: &RepackConfig) -> Vec<WorkAtlas> {
    let (half_w, half_h) = (atlas.width / 2, atlas.height / 2);
    if atlas.charts.is_empty()
        || atlas.coverage() >= config.target_coverage
        || half_w < config.min_lightmap_size
        || half_h < config.min_lightmap_size
    {
        return vec![atlas];
    }

    let Some(bins) = split_into_bins(&atlas.charts, half_w, half_h, config) else {
        debug!(width = atlas.width, height = atlas.height, "Charts do not fit half-size atlas");
        return vec![atlas];
    };

    let area: u64 = bins.iter().map(WorkAtlas::area).sum();
    let new_coverage = fraction(atlas.used_pixels(), area);
    if new_coverage <= atlas.coverage() {
        debug!(
            bins = bins.len(),
            old = atlas.coverage(),
            new = new_coverage,
            "Rejected atlas split"
        );
        return vec![atlas];
    }

    debug!(
        from = atlas.width,
        to = half_w,
        bins = bins.len(),
        coverage = new_coverage,
        "Split atlas"
    );
    bins.into_iter()
        .flat_map(|bin| plan_atlas(bin, config))
        .collect()
}

/// Placement of a surface moved from its origin atlas to `dest` in a new atlas.
///
/// Scale follows the size ratio; the offset moves by a whole number of pixels
/// so texels stay aligned.
fn moved_placement(
    old: &AtlasPlacement,
    index: usize,
    origin_size: (u32, u32),
    origin_rect: PixelRect,
    dest: PixelRect,
    new_size: (u32, u32),
) -> AtlasPlacement {
    let old_dims = Vec2::new(origin_size.0 as f32, origin_size.1 as f32);
    let new_dims = Vec2::new(new_size.0 as f32, new_size.1 as f32);
    let delta = Vec2::new(
        dest.x as f32 - origin_rect.x as f32,
        dest.y as f32 - origin_rect.y as f32,
    );
    let st = old.scale_offset;
    AtlasPlacement::new(
        index as u32,
        ScaleOffset {
            scale: st.scale * old_dims / new_dims,
            offset: (st.offset * old_dims + delta) / new_dims,
        },
    )
}

/// Plan shrinking of every atlas covered below the target.
pub fn plan_repack<S: LightingStore + ?Sized>(store: &S, uv_bounds: &UvBounds, config: &RepackConfig) -> RepackPlan {
    let sizes = atlas_sizes(store);
    let charts = collect_charts(store.placements(), uv_bounds, &sizes);

    let mut final_atlases = Vec::new();
    for (index, &(width, height)) in sizes.iter().enumerate() {
        let work = WorkAtlas {
            untouched: Some(index),
            width,
            height,
            charts: charts
                .iter()
                .filter(|c| c.atlas == index)
                .map(|c| PackedChart {
                    members: c.members.clone(),
                    origin_atlas: index,
                    origin_rect: c.rect,
                    rect: c.rect,
                })
                .collect(),
        };
        final_atlases.extend(plan_atlas(work, config));
    }

    let used: u64 = charts.iter().map(|c| c.rect.area()).sum();
    let old_area: u64 = sizes.iter().map(|&(w, h)| u64::from(w) * u64::from(h)).sum();
    let new_area: u64 = final_atlases.iter().map(WorkAtlas::area).sum();
    let report = RepackReport {
        old_atlas_count: sizes.len(),
        new_atlas_count: final_atlases.len(),
        old_coverage_percent: fraction(used, old_area) * 100.0,
        new_coverage_percent: fraction(used, new_area) * 100.0,
    };

    let old_placements = store.placements();
    let mut placements = old_placements.clone();
    let mut atlases = Vec::with_capacity(final_atlases.len());
    for (index, atlas) in final_atlases.iter().enumerate() {
        for chart in &atlas.charts {
            for key in &chart.members {
                let Some(old) = old_placements.get(key) else {
                    continue;
                };
                let new = match atlas.untouched {
                    Some(_) => AtlasPlacement::new(index as u32, old.scale_offset),
                    None => moved_placement(
                        old,
                        index,
                        sizes[chart.origin_atlas],
                        chart.origin_rect,
                        chart.rect,
                        (atlas.width, atlas.height),
                    ),
                };
                placements.insert(key.clone(), new);
            }
        }

        atlases.push(match atlas.untouched {
            Some(source) => PlannedAtlas::Keep { source },
            None => PlannedAtlas::Render {
                width: atlas.width,
                height: atlas.height,
                blits: atlas
                    .charts
                    .iter()
                    .map(|c| {
                        let (sw, sh) = sizes[c.origin_atlas];
                        let source = c.origin_rect.dilate(config.dilation, sw, sh);
                        Blit {
                            source_atlas: c.origin_atlas,
                            source,
                            dest_x: c.rect.x - (c.origin_rect.x - source.x),
                            dest_y: c.rect.y - (c.origin_rect.y - source.y),
                        }
                    })
                    .collect(),
            },
        });
    }

    remap_chartless(old_placements, &mut placements, &final_atlases);

    RepackPlan {
        atlases,
        placements,
        report,
    }
}

/// Lit placements covering no pixels belong to no chart. They follow their
/// atlas when it is kept and become unlit when it is split.
fn remap_chartless(old: &PlacementMap, placements: &mut PlacementMap, final_atlases: &[WorkAtlas]) {
    let charted: HashSet<&SurfaceKey> = final_atlases
        .iter()
        .flat_map(|a| a.charts.iter().flat_map(|c| c.members.iter()))
        .collect();
    let kept: HashMap<usize, usize> = final_atlases
        .iter()
        .enumerate()
        .filter_map(|(index, a)| a.untouched.map(|source| (source, index)))
        .collect();

    for (key, placement) in old.iter() {
        let Some(atlas) = placement.atlas_index() else {
            continue;
        };
        if charted.contains(key) {
            continue;
        }
        let new = match kept.get(&atlas) {
            Some(&index) => AtlasPlacement::new(index as u32, placement.scale_offset),
            None => {
                warn!(surface = %key, atlas, "Surface has no chart in a split atlas, making it unlit");
                AtlasPlacement::unlit()
            }
        };
        placements.insert(key.clone(), new);
    }
}

/// Shrink poorly covered atlases and commit the result to `store`.
///
/// Nothing is written when no atlas changes.
pub fn repack_atlases<S: LightingStore + ?Sized>(
    store: &mut S,
    uv_bounds: &UvBounds,
    config: &RepackConfig,
) -> Result<RepackReport> {
    let plan = plan_repack(store, uv_bounds, config);
    let report = plan.report;

    let untouched = plan
        .atlases
        .iter()
        .enumerate()
        .all(|(i, a)| *a == PlannedAtlas::Keep { source: i });
    if untouched {
        info!(
            atlases = report.old_atlas_count,
            coverage = report.old_coverage_percent,
            "Lightmap sizes already optimal"
        );
        return Ok(report);
    }

    let atlases = render_atlases(store, &plan.atlases)?;
    store.commit_repack(atlases, plan.placements)?;

    info!(
        old_atlases = report.old_atlas_count,
        new_atlases = report.new_atlas_count,
        old_coverage = report.old_coverage_percent,
        new_coverage = report.new_coverage_percent,
        "Optimized lightmap sizes"
    );
    Ok(report)
}
