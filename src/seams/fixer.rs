use std::collections::HashMap;

use glam::UVec2;
use tracing::{debug, info, warn};

use super::edges::{generate_samples, SamplePoint};
use super::mapping::BilinearTaps;
use super::pairing::{find_sample_pairs, pairing_distance};
use crate::config::{ApplyMode, BakeSettings, SeamFixConfig};
use crate::error::Result;
use crate::solver::{conjugate_gradient, CgParams, DenseVector, SparseMatrix};
use crate::store::{apply_lightmap, LightingStore};
use crate::types::{
    AtlasPlacement, Bounds, LightmapBuffer, LightmapChannel, Surface, SurfaceKey,
};

/// Why a seam fix did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotLightmapped,
    NoLightmaps,
    MissingLightmap,
    NoSamplePairs,
}

/// Outcome of one seam fix between two surfaces.
#[derive(Debug, Clone, PartialEq)]
pub struct SeamFixReport {
    pub surface: SurfaceKey,
    pub partner: SurfaceKey,
    pub skipped: Option<SkipReason>,
    pub sample_pairs: usize,
    /// Texels in the linear system.
    pub pixels: usize,
    /// CG iterations for the R, G and B solves.
    pub iterations: [usize; 3],
    /// Sum of squared color differences over sample pairs.
    pub error_before: f32,
    pub error_after: f32,
}

impl SeamFixReport {
    fn skipped(a: &Surface, b: &Surface, reason: SkipReason) -> Self {
        Self {
            surface: a.key.clone(),
            partner: b.key.clone(),
            skipped: Some(reason),
            sample_pairs: 0,
            pixels: 0,
            iterations: [0; 3],
            error_before: 0.0,
            error_after: 0.0,
        }
    }

    pub fn applied(&self) -> bool {
        self.skipped.is_none()
    }
}

/// One texel taking part in the solve.
#[derive(Debug, Clone, Copy)]
struct PixelRecord {
    atlas: usize,
    texel: UVec2,
    color: [f32; 4],
}

/// Bilinear taps of both ends of a sample pair.
struct Constraint {
    self_taps: BilinearTaps,
    self_atlas: usize,
    other_taps: BilinearTaps,
    other_atlas: usize,
}

/// Color textures of the atlases involved, keyed by atlas index.
///
/// Two surfaces sharing an atlas share one buffer.
type AtlasBuffers = HashMap<usize, LightmapBuffer>;

/// Everything needed to solve one seam, built from the store without mutating it.
struct SeamProblem {
    constraints: Vec<Constraint>,
    buffers: AtlasBuffers,
}

enum Prepared {
    Ready(SeamProblem),
    Skipped(SkipReason),
}

fn samples_per_meter(surface: &Surface, bake: &BakeSettings) -> f32 {
    surface.scale_in_lightmap * bake.lightmap_resolution
}

fn prepare<S: LightingStore + ?Sized>(
    store: &S,
    a: &Surface,
    b: &Surface,
    bounds: Option<&Bounds>,
    config: &SeamFixConfig,
    bake: &BakeSettings,
) -> Prepared {
    let placements = store.placements();
    let (Some(pa), Some(pb)) = (placements.lit(&a.key).copied(), placements.lit(&b.key).copied())
    else {
        return Prepared::Skipped(SkipReason::NotLightmapped);
    };
    if store.lightmap_count() == 0 {
        return Prepared::Skipped(SkipReason::NoLightmaps);
    }
    let (Some(atlas_a), Some(atlas_b)) = (pa.atlas_index(), pb.atlas_index()) else {
        return Prepared::Skipped(SkipReason::NotLightmapped);
    };

    let mut buffers = AtlasBuffers::new();
    for atlas in [atlas_a, atlas_b] {
        if buffers.contains_key(&atlas) {
            continue;
        }
        match store.read_lightmap(atlas, LightmapChannel::Color) {
            Some(buffer) if buffer.width() > 0 && buffer.height() > 0 => {
                buffers.insert(atlas, buffer);
            }
            _ => return Prepared::Skipped(SkipReason::MissingLightmap),
        }
    }

    let spm_a = samples_per_meter(a, bake);
    let spm_b = samples_per_meter(b, bake);
    let Some(max_distance) = pairing_distance(spm_a, spm_b) else {
        return Prepared::Skipped(SkipReason::NoSamplePairs);
    };

    let self_samples = generate_samples(a, spm_a * config.sample_density, config.min_samples_per_edge, bounds);
    let other_samples = generate_samples(b, spm_b * config.sample_density, config.min_samples_per_edge, bounds);
    let pairs = find_sample_pairs(
        &self_samples,
        &other_samples,
        max_distance,
        config.max_search_angle_degrees,
    );
    if pairs.is_empty() {
        return Prepared::Skipped(SkipReason::NoSamplePairs);
    }

    let constraints = build_constraints(&pairs, &pa, &pb, &buffers);
    Prepared::Ready(SeamProblem {
        constraints,
        buffers,
    })
}

fn build_constraints(
    pairs: &[(SamplePoint, SamplePoint)],
    pa: &AtlasPlacement,
    pb: &AtlasPlacement,
    buffers: &AtlasBuffers,
) -> Vec<Constraint> {
    let atlas_a = pa.lightmap_index as usize;
    let atlas_b = pb.lightmap_index as usize;
    let (wa, ha) = buffers[&atlas_a].dimensions();
    let (wb, hb) = buffers[&atlas_b].dimensions();

    pairs
        .iter()
        .map(|(s, o)| Constraint {
            self_taps: BilinearTaps::for_uv(s.uv, &pa.scale_offset, wa, ha, 1.0),
            self_atlas: atlas_a,
            other_taps: BilinearTaps::for_uv(o.uv, &pb.scale_offset, wb, hb, 1.0),
            other_atlas: atlas_b,
        })
        .collect()
}

/// Sum over constraints of the squared RGB difference between both sides.
fn constraint_error(constraints: &[Constraint], buffers: &AtlasBuffers) -> f32 {
    constraints
        .iter()
        .map(|c| {
            let sa = c.self_taps.sample_rgb(&buffers[&c.self_atlas]);
            let sb = c.other_taps.sample_rgb(&buffers[&c.other_atlas]);
            (0..3).map(|i| (sa[i] - sb[i]).powi(2)).sum::<f32>()
        })
        .sum()
}

/// Deduplicated texels of every constraint, indexed by (atlas, texel).
fn gather_pixels(
    constraints: &[Constraint],
    buffers: &AtlasBuffers,
) -> (Vec<PixelRecord>, HashMap<(usize, UVec2), usize>) {
    let mut records = Vec::new();
    let mut index = HashMap::new();
    for c in constraints {
        let sides = [(c.self_atlas, &c.self_taps), (c.other_atlas, &c.other_taps)];
        for (atlas, taps) in sides {
            for texel in taps.texels {
                index.entry((atlas, texel)).or_insert_with(|| {
                    records.push(PixelRecord {
                        atlas,
                        texel,
                        color: buffers[&atlas].get_pixel(texel.x, texel.y).0,
                    });
                    records.len() - 1
                });
            }
        }
    }
    (records, index)
}

/// Normal equations of the seam energy.
///
/// Each constraint contributes `(a - b)(a - b)ᵀ` with `a`, `b` the weighted
/// taps of both sides; every texel gets a unit pull towards its current color.
fn build_system(
    constraints: &[Constraint],
    records: &[PixelRecord],
    index: &HashMap<(usize, UVec2), usize>,
    strength: f32,
) -> SparseMatrix {
    let mut ata = SparseMatrix::square(records.len());
    let lookup = |atlas: usize, texel: UVec2| index[&(atlas, texel)];

    for c in constraints {
        let ia = c.self_taps.texels.map(|t| lookup(c.self_atlas, t));
        let ib = c.other_taps.texels.map(|t| lookup(c.other_atlas, t));
        let wa = c.self_taps.weights.map(|w| w * strength);
        let wb = c.other_taps.weights.map(|w| w * strength);

        for i in 0..4 {
            for j in 0..4 {
                ata.add(ia[i], ia[j], wa[i] * wa[j]);
                ata.add(ib[i], ib[j], wb[i] * wb[j]);
                ata.add(ia[i], ib[j], -wa[i] * wb[j]);
                ata.add(ib[i], ia[j], -wb[i] * wa[j]);
            }
        }
    }

    for i in 0..records.len() {
        ata.add(i, i, 1.0);
    }
    ata
}

/// Blend the lightmaps of `a` and `b` along their shared edges.
///
/// Unlit surfaces, missing lightmaps and surfaces with no nearby edges are
/// skipped and reported, not treated as errors. Only writing the result back
/// can fail.
pub fn fix_seams<S: LightingStore + ?Sized>(
    store: &mut S,
    a: &Surface,
    b: &Surface,
    mode: ApplyMode,
    bounds: Option<&Bounds>,
    config: &SeamFixConfig,
    bake: &BakeSettings,
) -> Result<SeamFixReport> {
    let SeamProblem {
        constraints,
        mut buffers,
    } = match prepare(store, a, b, bounds, config, bake) {
        Prepared::Ready(problem) => problem,
        Prepared::Skipped(reason) => {
            warn!(surface = %a.key, partner = %b.key, ?reason, "Skipping seam fix");
            return Ok(SeamFixReport::skipped(a, b, reason));
        }
    };

    let (records, index) = gather_pixels(&constraints, &buffers);
    let ata = build_system(&constraints, &records, &index, config.seam_fix_strength);
    let error_before = constraint_error(&constraints, &buffers);

    let params = CgParams {
        max_iterations: config.max_solver_iterations,
        tolerance: config.solver_tolerance,
    };
    let mut iterations = [0; 3];
    let mut solutions = Vec::with_capacity(3);
    for (channel, iters) in iterations.iter_mut().enumerate() {
        let colors = DenseVector::from_vec(records.iter().map(|r| r.color[channel]).collect());
        let solved = conjugate_gradient(&ata, &colors, &colors, params);
        debug!(
            channel,
            iterations = solved.iterations,
            converged = solved.converged,
            residual = solved.residual_sq,
            "Seam solve"
        );
        *iters = solved.iterations;
        solutions.push(solved.solution);
    }

    for (i, record) in records.iter().enumerate() {
        if let Some(buffer) = buffers.get_mut(&record.atlas) {
            let px = buffer.get_pixel_mut(record.texel.x, record.texel.y);
            for (c, solution) in solutions.iter().enumerate() {
                px.0[c] = solution[i];
            }
        }
    }
    let error_after = constraint_error(&constraints, &buffers);

    let mut written: Vec<(usize, LightmapBuffer)> = buffers.into_iter().collect();
    written.sort_by_key(|(atlas, _)| *atlas);
    for (atlas, buffer) in written {
        apply_lightmap(store, atlas, LightmapChannel::Color, buffer, mode)?;
    }

    info!(
        surface = %a.key,
        partner = %b.key,
        sample_pairs = constraints.len(),
        pixels = records.len(),
        error_before,
        error_after,
        "Fixed seams"
    );

    Ok(SeamFixReport {
        surface: a.key.clone(),
        partner: b.key.clone(),
        skipped: None,
        sample_pairs: constraints.len(),
        pixels: records.len(),
        iterations,
        error_before,
        error_after,
    })
}

/// Current seam error between `a` and `b`; `None` when a fix would be skipped.
pub fn seam_error<S: LightingStore + ?Sized>(
    store: &S,
    a: &Surface,
    b: &Surface,
    bounds: Option<&Bounds>,
    config: &SeamFixConfig,
    bake: &BakeSettings,
) -> Option<f32> {
    match prepare(store, a, b, bounds, config, bake) {
        Prepared::Ready(problem) => Some(constraint_error(&problem.constraints, &problem.buffers)),
        Prepared::Skipped(_) => None,
    }
}

/// Fix seams between every pair of surfaces overlapping `volume`.
///
/// Surfaces listed in `exclude` are left out; only edge samples inside the
/// volume are used.
pub fn fix_seams_for_volume<S: LightingStore + ?Sized>(
    store: &mut S,
    surfaces: &[Surface],
    volume: &Bounds,
    exclude: &[SurfaceKey],
    mode: ApplyMode,
    config: &SeamFixConfig,
    bake: &BakeSettings,
) -> Result<Vec<SeamFixReport>> {
    let members: Vec<&Surface> = surfaces
        .iter()
        .filter(|s| !exclude.contains(&s.key))
        .filter(|s| s.world_bounds().is_some_and(|b| b.intersects(volume)))
        .collect();

    let mut reports = Vec::new();
    for (i, a) in members.iter().enumerate() {
        for b in &members[i + 1..] {
            reports.push(fix_seams(store, a, b, mode, Some(volume), config, bake)?);
        }
    }

    info!(
        surfaces = members.len(),
        fixes = reports.iter().filter(|r| r.applied()).count(),
        "Finished seam fixes for volume"
    );
    Ok(reports)
}
