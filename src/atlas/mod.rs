pub mod blit;
pub mod coverage;
pub mod packer;
pub mod placement;
pub mod rect;
pub mod repacker;

pub use coverage::{measure_coverage, uv_bounds_of, AtlasCoverage, CoverageReport, UvBounds};
pub use packer::SkylinePacker;
pub use placement::{make_probe_lit, share_lod_placement};
pub use rect::PixelRect;
pub use repacker::{plan_repack, repack_atlases, RepackPlan, RepackReport};
