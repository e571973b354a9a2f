use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::atlas::{self, CoverageReport, RepackReport};
use crate::config::{ApplyMode, PostBakeConfig, RepackConfig, RunConfig, SeamFixConfig, Task};
use crate::error::{GiTweaksError, Result};
use crate::scene::Scene;
use crate::seams::{self, SeamFixReport};
use crate::store::{FsStore, LightingStore};
use crate::types::{Surface, SurfaceKey};

/// Summary of a completed run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Placements rewritten by shared LOD groups.
    pub shared_lod_changes: usize,
    /// Surfaces switched to light probes.
    pub probe_lit: usize,
    pub repack: Option<RepackReport>,
    pub seam_fixes: Vec<SeamFixReport>,
    pub coverage: Option<CoverageReport>,
    pub duration: Duration,
}

impl RunSummary {
    pub fn applied_seam_fixes(&self) -> usize {
        self.seam_fixes.iter().filter(|r| r.applied()).count()
    }
}

/// Pipeline orchestrator: runs one task against a scene and its lighting data.
pub struct Pipeline;

impl Pipeline {
    /// Load the scene and lighting data named in `config` and run its task.
    pub fn run(config: &RunConfig) -> Result<RunSummary> {
        info!(
            scene = %config.scene.display(),
            lighting = %config.lighting.display(),
            "Starting run"
        );
        let scene = Scene::load(&config.scene)?;
        let mut store = FsStore::open(&config.lighting)?;
        Self::execute(&scene, &mut store, &config.task)
    }

    /// Run `task` against an already loaded scene and store.
    pub fn execute<S: LightingStore + ?Sized>(scene: &Scene, store: &mut S, task: &Task) -> Result<RunSummary> {
        let start = Instant::now();

        let mut summary = match task {
            Task::PostBake(config) => Self::post_bake(scene, store, config)?,
            Task::FixSeams {
                surface,
                partners,
                mode,
                config,
            } => Self::fix_seams(scene, store, surface, partners, *mode, config)?,
            Task::Repack(config) => RunSummary {
                repack: Some(Self::repack(scene, store, config)?),
                ..Default::default()
            },
            Task::ProbeLit { surfaces } => RunSummary {
                probe_lit: Self::make_probe_lit(store, surfaces)?,
                ..Default::default()
            },
            Task::Coverage => RunSummary {
                coverage: Some(atlas::measure_coverage(store, &atlas::uv_bounds_of(&scene.surfaces))),
                ..Default::default()
            },
        };

        summary.duration = start.elapsed();
        info!(elapsed = ?summary.duration, "Run complete");
        Ok(summary)
    }

    /// Everything that follows a bake: shared LODs, repacking, then seam fixes.
    pub fn post_bake<S: LightingStore + ?Sized>(
        scene: &Scene,
        store: &mut S,
        config: &PostBakeConfig,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        if config.share_lod_lightmaps && !scene.shared_lods.is_empty() {
            info!(groups = scene.shared_lods.len(), "Stage 1/3: Shared LOD lightmaps");
            summary.shared_lod_changes = Self::share_lods(scene, store)?;
        }

        if config.optimize_lightmap_sizes {
            info!("Stage 2/3: Repacking atlases");
            summary.repack = Some(Self::repack(scene, store, &config.repack)?);
        }

        if config.fix_seams {
            info!(
                components = scene.seam_fixes.len(),
                volumes = scene.seam_fix_volumes.len(),
                "Stage 3/3: Seam fixes"
            );
            summary.seam_fixes = Self::fix_scene_seams(scene, store, &config.seam_fix)?;
        }

        Ok(summary)
    }

    fn share_lods<S: LightingStore + ?Sized>(scene: &Scene, store: &mut S) -> Result<usize> {
        let mut placements = store.placements().clone();
        let changed: usize = scene
            .shared_lods
            .iter()
            .map(|group| atlas::share_lod_placement(&mut placements, &group.lod0, &group.renderers))
            .sum();

        if changed > 0 {
            store.save_placements(placements)?;
        }
        info!(changed, "Shared LOD placements");
        Ok(changed)
    }

    fn make_probe_lit<S: LightingStore + ?Sized>(store: &mut S, surfaces: &[String]) -> Result<usize> {
        let mut placements = store.placements().clone();
        let changed = surfaces
            .iter()
            .filter(|key| atlas::make_probe_lit(&mut placements, &SurfaceKey::from(key.as_str())))
            .count();

        if changed > 0 {
            store.save_placements(placements)?;
        }
        info!(changed, "Made surfaces probe-lit");
        Ok(changed)
    }

    fn repack<S: LightingStore + ?Sized>(scene: &Scene, store: &mut S, config: &RepackConfig) -> Result<RepackReport> {
        let uv_bounds = atlas::uv_bounds_of(&scene.surfaces);
        atlas::repack_atlases(store, &uv_bounds, config)
    }

    /// Seam fixes for every component, then every volume marked to run on bake.
    fn fix_scene_seams<S: LightingStore + ?Sized>(
        scene: &Scene,
        store: &mut S,
        base: &SeamFixConfig,
    ) -> Result<Vec<SeamFixReport>> {
        let mut reports = Vec::new();

        for entry in &scene.seam_fixes {
            let Some(surface) = lookup(scene, &entry.surface) else {
                continue;
            };
            let config = entry.overrides.apply(base);
            for partner in entry.with.iter().filter_map(|key| lookup(scene, key)) {
                reports.push(seams::fix_seams(
                    store,
                    surface,
                    partner,
                    ApplyMode::Persist,
                    None,
                    &config,
                    &scene.bake,
                )?);
            }
        }

        for volume in scene.seam_fix_volumes.iter().filter(|v| v.run_on_bake) {
            let config = volume.overrides.apply(base);
            reports.extend(seams::fix_seams_for_volume(
                store,
                &scene.surfaces,
                &volume.bounds(),
                &volume.exclude,
                ApplyMode::Persist,
                &config,
                &scene.bake,
            )?);
        }

        Ok(reports)
    }

    fn fix_seams<S: LightingStore + ?Sized>(
        scene: &Scene,
        store: &mut S,
        surface: &str,
        partners: &[String],
        mode: ApplyMode,
        config: &SeamFixConfig,
    ) -> Result<RunSummary> {
        let key = SurfaceKey::from(surface);
        let surface = scene
            .surface(&key)
            .ok_or_else(|| GiTweaksError::Scene(format!("Unknown surface '{key}'")))?;

        let mut reports = Vec::with_capacity(partners.len());
        for partner in partners {
            let Some(partner) = lookup(scene, &SurfaceKey::from(partner.as_str())) else {
                continue;
            };
            reports.push(seams::fix_seams(
                store,
                surface,
                partner,
                mode,
                None,
                config,
                &scene.bake,
            )?);
        }

        Ok(RunSummary {
            seam_fixes: reports,
            ..Default::default()
        })
    }
}

fn lookup<'a>(scene: &'a Scene, key: &SurfaceKey) -> Option<&'a Surface> {
    let surface = scene.surface(key);
    if surface.is_none() {
        warn!(surface = %key, "Seam fix references unknown surface");
    }
    surface
}
