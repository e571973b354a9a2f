use image::imageops;
use rayon::prelude::*;

use super::repacker::{Blit, PlannedAtlas};
use crate::error::{GiTweaksError, Result};
use crate::store::LightingStore;
use crate::types::{LightmapBuffer, LightmapChannel, LightmapSet};

/// Copy `blit.source` of `src` into `dst`, clipped to `dst`.
pub fn copy_rect(src: &LightmapBuffer, dst: &mut LightmapBuffer, blit: &Blit) {
    let r = blit.source;
    let patch = imageops::crop_imm(src, r.x, r.y, r.w, r.h).to_image();
    imageops::replace(dst, &patch, i64::from(blit.dest_x), i64::from(blit.dest_y));
}

fn render_one(sources: &[&LightmapSet], planned: &PlannedAtlas) -> Result<LightmapSet> {
    let source = |index: usize| {
        sources
            .get(index)
            .copied()
            .ok_or_else(|| GiTweaksError::Lighting(format!("no lightmap slot {index}")))
    };

    match planned {
        PlannedAtlas::Keep { source: index } => Ok(source(*index)?.clone()),
        PlannedAtlas::Render { width, height, blits } => {
            let mut out = match blits.first() {
                Some(first) => LightmapSet::blank_like(source(first.source_atlas)?, *width, *height),
                None => LightmapSet::new(LightmapBuffer::new(*width, *height)),
            };
            for blit in blits.iter().skip(1) {
                let from = source(blit.source_atlas)?;
                for channel in from.channels() {
                    if out.get(channel).is_none() {
                        out.set(channel, LightmapBuffer::new(*width, *height));
                    }
                }
            }

            for blit in blits {
                let from = source(blit.source_atlas)?;
                for channel in LightmapChannel::ALL {
                    if let (Some(src), Some(dst)) = (from.get(channel), out.get_mut(channel)) {
                        copy_rect(src, dst, blit);
                    }
                }
            }
            Ok(out)
        }
    }
}

/// Produce every planned atlas from the current lightmaps of `store`.
///
/// Atlases are rendered in parallel; each reads the source atlases and
/// writes only its own output.
pub fn render_atlases<S: LightingStore + ?Sized>(store: &S, plan: &[PlannedAtlas]) -> Result<Vec<LightmapSet>> {
    let sources: Vec<&LightmapSet> = (0..store.lightmap_count())
        .map(|i| {
            store
                .lightmap_set(i)
                .ok_or_else(|| GiTweaksError::Lighting(format!("no lightmap slot {i}")))
        })
        .collect::<Result<_>>()?;

    plan.par_iter().map(|planned| render_one(&sources, planned)).collect()
}
