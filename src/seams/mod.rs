pub mod edges;
pub mod fixer;
pub mod mapping;
pub mod pairing;

pub use edges::{boundary_edges, generate_samples, SamplePoint};
pub use fixer::{fix_seams, fix_seams_for_volume, seam_error, SeamFixReport, SkipReason};
pub use mapping::{lightmap_to_uv, uv_to_lightmap, BilinearTaps};
pub use pairing::find_sample_pairs;
