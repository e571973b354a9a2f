use tracing::{debug, warn};

use crate::types::{AtlasPlacement, PlacementMap, SurfaceKey};

/// Point every renderer of a LOD group at LOD0's lightmap region.
///
/// Returns the number of placements changed. Nothing happens when LOD0 is not
/// lightmapped.
pub fn share_lod_placement(placements: &mut PlacementMap, lod0: &SurfaceKey, renderers: &[SurfaceKey]) -> usize {
    let Some(source) = placements.lit(lod0).copied() else {
        debug!(lod0 = %lod0, "LOD0 is not lightmapped, nothing to share");
        return 0;
    };

    let mut changed = 0;
    for key in renderers.iter().filter(|k| *k != lod0) {
        if placements.get(key) != Some(&source) {
            placements.insert(key.clone(), source);
            changed += 1;
        }
    }
    changed
}

/// Stop lightmapping `key`; it falls back to light probes.
///
/// Returns whether the placement changed.
pub fn make_probe_lit(placements: &mut PlacementMap, key: &SurfaceKey) -> bool {
    match placements.get_mut(key) {
        Some(p) if p.is_lightmapped() => {
            *p = AtlasPlacement::unlit();
            true
        }
        Some(_) => false,
        None => {
            warn!(surface = %key, "No placement to make probe-lit");
            false
        }
    }
}
