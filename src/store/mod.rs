pub mod fs;
pub mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use crate::config::ApplyMode;
use crate::error::Result;
use crate::types::{LightmapBuffer, LightmapChannel, LightmapSet, PlacementMap};

/// Access to baked lightmaps and the surface placement map.
///
/// Implementations own the pixel data of every lightmap slot and know how to
/// write it back to wherever it came from.
pub trait LightingStore {
    /// Number of lightmap slots.
    fn lightmap_count(&self) -> usize;

    /// All channels of slot `index`.
    fn lightmap_set(&self, index: usize) -> Option<&LightmapSet>;

    /// Writable copy of one channel of slot `index`.
    fn read_lightmap(&self, index: usize, channel: LightmapChannel) -> Option<LightmapBuffer> {
        self.lightmap_set(index)
            .and_then(|set| set.get(channel))
            .cloned()
    }

    /// Replace a channel in memory without touching backing storage.
    fn preview_lightmap(
        &mut self,
        index: usize,
        channel: LightmapChannel,
        buffer: LightmapBuffer,
    ) -> Result<()>;

    /// Replace a channel and encode it to backing storage.
    fn persist_lightmap(
        &mut self,
        index: usize,
        channel: LightmapChannel,
        buffer: LightmapBuffer,
    ) -> Result<()>;

    fn placements(&self) -> &PlacementMap;

    /// Replace the placement map and persist it.
    fn save_placements(&mut self, placements: PlacementMap) -> Result<()>;

    /// Replace every lightmap slot and the placement map after a repack.
    ///
    /// All new textures are written before the placement map; textures no
    /// longer referenced are removed last. On error the previous placement
    /// map stays in effect.
    fn commit_repack(&mut self, atlases: Vec<LightmapSet>, placements: PlacementMap) -> Result<()>;
}

/// Write a lightmap channel back according to `mode`.
pub fn apply_lightmap<S: LightingStore + ?Sized>(
    store: &mut S,
    index: usize,
    channel: LightmapChannel,
    buffer: LightmapBuffer,
    mode: ApplyMode,
) -> Result<()> {
    match mode {
        ApplyMode::Preview => store.preview_lightmap(index, channel, buffer),
        ApplyMode::Persist => store.persist_lightmap(index, channel, buffer),
    }
}
