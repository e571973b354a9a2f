use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

/// Bake-wide lighting settings the tools depend on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeSettings {
    /// Lightmap texels per world unit.
    pub lightmap_resolution: f32,
}

impl Default for BakeSettings {
    fn default() -> Self {
        Self {
            lightmap_resolution: 40.0,
        }
    }
}

/// Parameters of a single seam fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeamFixConfig {
    /// Sample pairs whose normals differ by this many degrees or more are ignored.
    pub max_search_angle_degrees: f32,
    pub max_solver_iterations: usize,
    pub solver_tolerance: f32,
    /// Weight of the edge-matching constraints relative to the stay-close term.
    pub seam_fix_strength: f32,
    /// Multiplier on samples per meter when sampling edges; above √2 so that
    /// every neighbouring texel is hit.
    pub sample_density: f32,
    pub min_samples_per_edge: usize,
}

impl Default for SeamFixConfig {
    fn default() -> Self {
        Self {
            max_search_angle_degrees: 15.0,
            max_solver_iterations: 100,
            solver_tolerance: 0.001,
            seam_fix_strength: 5.0,
            sample_density: 1.5,
            min_samples_per_edge: 3,
        }
    }
}

/// Per-entry overrides of [`SeamFixConfig`] as written in a scene manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeamFixOverrides {
    pub max_search_angle: Option<f32>,
    pub max_solver_iterations: Option<usize>,
    pub solver_tolerance: Option<f32>,
    pub seam_fix_strength: Option<f32>,
}

impl SeamFixOverrides {
    /// `base` with every set override applied.
    pub fn apply(&self, base: &SeamFixConfig) -> SeamFixConfig {
        SeamFixConfig {
            max_search_angle_degrees: self.max_search_angle.unwrap_or(base.max_search_angle_degrees),
            max_solver_iterations: self.max_solver_iterations.unwrap_or(base.max_solver_iterations),
            solver_tolerance: self.solver_tolerance.unwrap_or(base.solver_tolerance),
            seam_fix_strength: self.seam_fix_strength.unwrap_or(base.seam_fix_strength),
            ..*base
        }
    }
}

/// Lightmap size optimization parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepackConfig {
    /// Atlases covered below this fraction are candidates for shrinking.
    pub target_coverage: f32,
    /// Atlases are never shrunk below this size along either axis.
    pub min_lightmap_size: u32,
    /// Empty pixels between packed charts.
    pub padding: u32,
    /// Pixels copied around each chart when re-rendering.
    pub dilation: u32,
}

impl Default for RepackConfig {
    fn default() -> Self {
        Self {
            target_coverage: 0.85,
            min_lightmap_size: 32,
            padding: 2,
            dilation: 1,
        }
    }
}

/// Operations run after a bake completes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostBakeConfig {
    pub share_lod_lightmaps: bool,
    pub optimize_lightmap_sizes: bool,
    pub fix_seams: bool,
    pub repack: RepackConfig,
    pub seam_fix: SeamFixConfig,
}

impl Default for PostBakeConfig {
    fn default() -> Self {
        Self {
            share_lod_lightmaps: true,
            optimize_lightmap_sizes: false,
            fix_seams: true,
            repack: RepackConfig::default(),
            seam_fix: SeamFixConfig::default(),
        }
    }
}

/// What a seam fix does with its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Replace the lightmap in memory only.
    Preview,
    /// Encode and write the lightmap to its backing storage.
    Persist,
}

/// Task selected on the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    PostBake(PostBakeConfig),
    FixSeams {
        surface: String,
        partners: Vec<String>,
        mode: ApplyMode,
        config: SeamFixConfig,
    },
    Repack(RepackConfig),
    Coverage,
    /// Stop lightmapping these surfaces.
    ProbeLit { surfaces: Vec<String> },
}

/// Fully resolved run configuration (constructed from CLI args).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub scene: PathBuf,
    pub lighting: PathBuf,
    pub task: Task,
    pub verbose: bool,
    pub threads: Option<usize>,
}

/// CLI argument definition (clap derive).
#[derive(Parser, Debug)]
#[command(
    name = "gi-tweaks",
    about = "Lightmap seam fixing and atlas repacking for baked lighting",
    version
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Worker thread count (default: all cores)
    #[arg(short = 'j', long, global = true)]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every enabled post-bake operation
    PostBake(PostBakeArgs),
    /// Fix seams between one surface and its partners
    FixSeams(FixSeamsArgs),
    /// Shrink poorly covered lightmaps
    Repack(RepackArgs),
    /// Print per-lightmap coverage
    Coverage(SceneArgs),
    /// Switch surfaces from lightmaps to light probes
    ProbeLit(ProbeLitArgs),
}

#[derive(Args, Debug)]
pub struct SceneArgs {
    /// Scene manifest (scene.json)
    #[arg(short = 's', long)]
    pub scene: PathBuf,

    /// Lighting data manifest (lighting.json)
    #[arg(short = 'l', long)]
    pub lighting: PathBuf,
}

#[derive(Args, Debug)]
pub struct RepackOptions {
    /// Target coverage percentage (0-100)
    #[arg(long, default_value_t = 85.0)]
    pub target_coverage: f32,

    /// Smallest lightmap size in pixels
    #[arg(long, default_value_t = 32)]
    pub min_lightmap_size: u32,

    /// Padding between charts in pixels
    #[arg(long, default_value_t = 2)]
    pub padding: u32,

    /// Pixels copied around each chart
    #[arg(long, default_value_t = 1)]
    pub dilation: u32,
}

impl From<&RepackOptions> for RepackConfig {
    fn from(o: &RepackOptions) -> Self {
        RepackConfig {
            target_coverage: (o.target_coverage / 100.0).clamp(0.0, 1.0),
            min_lightmap_size: o.min_lightmap_size.max(1),
            padding: o.padding,
            dilation: o.dilation,
        }
    }
}

#[derive(Args, Debug)]
pub struct SolverOptions {
    /// Max angle in degrees between paired sample normals
    #[arg(long, default_value_t = 15.0)]
    pub max_angle: f32,

    /// Max conjugate gradient iterations
    #[arg(long, default_value_t = 100)]
    pub iterations: usize,

    /// Solver tolerance
    #[arg(long, default_value_t = 0.001)]
    pub tolerance: f32,

    /// Seam fix strength (edge constraint weight)
    #[arg(long, default_value_t = 5.0)]
    pub strength: f32,
}

impl From<&SolverOptions> for SeamFixConfig {
    fn from(o: &SolverOptions) -> Self {
        SeamFixConfig {
            max_search_angle_degrees: o.max_angle,
            max_solver_iterations: o.iterations.max(1),
            solver_tolerance: o.tolerance.max(0.0),
            seam_fix_strength: o.strength.max(0.0),
            ..Default::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct PostBakeArgs {
    #[command(flatten)]
    pub scene: SceneArgs,

    /// Shrink poorly covered lightmaps before fixing seams
    #[arg(long)]
    pub optimize_lightmap_sizes: bool,

    /// Skip copying LOD0 lightmap placement to other LODs
    #[arg(long)]
    pub no_shared_lods: bool,

    /// Skip seam fixing
    #[arg(long)]
    pub no_seam_fixes: bool,

    #[command(flatten)]
    pub repack: RepackOptions,
}

#[derive(Args, Debug)]
pub struct FixSeamsArgs {
    #[command(flatten)]
    pub scene: SceneArgs,

    /// Surface whose seams are fixed
    #[arg(long)]
    pub surface: String,

    /// Partner surfaces
    #[arg(long = "with", required = true, num_args = 1..)]
    pub partners: Vec<String>,

    /// Solve and report without writing lightmaps
    #[arg(long)]
    pub preview: bool,

    #[command(flatten)]
    pub solver: SolverOptions,
}

#[derive(Args, Debug)]
pub struct ProbeLitArgs {
    #[command(flatten)]
    pub scene: SceneArgs,

    /// Surfaces to make probe-lit
    #[arg(long = "surface", required = true, num_args = 1..)]
    pub surfaces: Vec<String>,
}

#[derive(Args, Debug)]
pub struct RepackArgs {
    #[command(flatten)]
    pub scene: SceneArgs,

    #[command(flatten)]
    pub options: RepackOptions,
}

impl From<CliArgs> for RunConfig {
    fn from(args: CliArgs) -> Self {
        let (scene, task) = match args.command {
            Command::PostBake(a) => {
                let task = Task::PostBake(PostBakeConfig {
                    share_lod_lightmaps: !a.no_shared_lods,
                    optimize_lightmap_sizes: a.optimize_lightmap_sizes,
                    fix_seams: !a.no_seam_fixes,
                    repack: (&a.repack).into(),
                    seam_fix: SeamFixConfig::default(),
                });
                (a.scene, task)
            }
            Command::FixSeams(a) => {
                let task = Task::FixSeams {
                    surface: a.surface,
                    partners: a.partners,
                    mode: if a.preview {
                        ApplyMode::Preview
                    } else {
                        ApplyMode::Persist
                    },
                    config: (&a.solver).into(),
                };
                (a.scene, task)
            }
            Command::Repack(a) => {
                let task = Task::Repack((&a.options).into());
                (a.scene, task)
            }
            Command::Coverage(scene) => (scene, Task::Coverage),
            Command::ProbeLit(a) => (a.scene, Task::ProbeLit { surfaces: a.surfaces }),
        };

        RunConfig {
            scene: scene.scene,
            lighting: scene.lighting,
            task,
            verbose: args.verbose,
            threads: args.threads,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_seam_fix_config() {
        let c = SeamFixConfig::default();
        assert_eq!(c.max_search_angle_degrees, 15.0);
        assert_eq!(c.max_solver_iterations, 100);
        assert_eq!(c.solver_tolerance, 0.001);
        assert_eq!(c.seam_fix_strength, 5.0);
        assert!(c.sample_density > std::f32::consts::SQRT_2);
        assert_eq!(c.min_samples_per_edge, 3);
    }

    #[test]
    fn default_repack_config() {
        let c = RepackConfig::default();
        assert_eq!(c.target_coverage, 0.85);
        assert_eq!(c.min_lightmap_size, 32);
    }

    #[test]
    fn default_post_bake_config() {
        let c = PostBakeConfig::default();
        assert!(c.share_lod_lightmaps);
        assert!(!c.optimize_lightmap_sizes);
        assert!(c.fix_seams);
    }

    #[test]
    fn overrides_apply_selectively() {
        let o = SeamFixOverrides {
            max_solver_iterations: Some(500),
            seam_fix_strength: Some(2.0),
            ..Default::default()
        };
        let c = o.apply(&SeamFixConfig::default());
        assert_eq!(c.max_solver_iterations, 500);
        assert_eq!(c.seam_fix_strength, 2.0);
        assert_eq!(c.max_search_angle_degrees, 15.0);
    }

    #[test]
    fn overrides_from_json() {
        let o: SeamFixOverrides = serde_json::from_str(r#"{"max_search_angle": 30.0}"#).unwrap();
        assert_eq!(o.max_search_angle, Some(30.0));
        assert_eq!(o.solver_tolerance, None);
    }

    #[test]
    fn cli_fix_seams_to_run_config() {
        let args = CliArgs::parse_from([
            "gi-tweaks",
            "fix-seams",
            "-s",
            "scene.json",
            "-l",
            "lighting.json",
            "--surface",
            "wall",
            "--with",
            "floor",
            "ceiling",
            "--preview",
            "--iterations",
            "250",
            "-v",
        ]);
        let config: RunConfig = args.into();

        assert_eq!(config.scene, PathBuf::from("scene.json"));
        assert_eq!(config.lighting, PathBuf::from("lighting.json"));
        assert!(config.verbose);
        match config.task {
            Task::FixSeams {
                surface,
                partners,
                mode,
                config,
            } => {
                assert_eq!(surface, "wall");
                assert_eq!(partners, vec!["floor", "ceiling"]);
                assert_eq!(mode, ApplyMode::Preview);
                assert_eq!(config.max_solver_iterations, 250);
            }
            other => panic!("unexpected task {other:?}"),
        }
    }

    #[test]
    fn cli_post_bake_percent_to_fraction() {
        let args = CliArgs::parse_from([
            "gi-tweaks",
            "post-bake",
            "-s",
            "scene.json",
            "-l",
            "lighting.json",
            "--optimize-lightmap-sizes",
            "--target-coverage",
            "50",
            "-j",
            "4",
        ]);
        let config: RunConfig = args.into();
        assert_eq!(config.threads, Some(4));
        match config.task {
            Task::PostBake(c) => {
                assert!(c.optimize_lightmap_sizes);
                assert!(c.share_lod_lightmaps);
                assert!((c.repack.target_coverage - 0.5).abs() < 1e-6);
            }
            other => panic!("unexpected task {other:?}"),
        }
    }

    #[test]
    fn cli_coverage_minimal() {
        let args = CliArgs::parse_from(["gi-tweaks", "coverage", "-s", "a.json", "-l", "b.json"]);
        let config: RunConfig = args.into();
        assert_eq!(config.task, Task::Coverage);
        assert!(!config.verbose);
        assert_eq!(config.threads, None);
    }

    #[test]
    fn cli_probe_lit_surfaces() {
        let args = CliArgs::parse_from([
            "gi-tweaks",
            "probe-lit",
            "-s",
            "a.json",
            "-l",
            "b.json",
            "--surface",
            "bush",
            "fence",
        ]);
        let config: RunConfig = args.into();
        assert_eq!(
            config.task,
            Task::ProbeLit {
                surfaces: vec!["bush".into(), "fence".into()]
            }
        );
    }
}
