use super::LightingStore;
use crate::error::{GiTweaksError, Result};
use crate::types::{LightmapBuffer, LightmapChannel, LightmapSet, PlacementMap};

/// Lighting data held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    lightmaps: Vec<LightmapSet>,
    placements: PlacementMap,
    /// Number of channel writes that went through `persist_lightmap`.
    persisted_writes: usize,
}

impl MemoryStore {
    pub fn new(lightmaps: Vec<LightmapSet>, placements: PlacementMap) -> Self {
        Self {
            lightmaps,
            placements,
            persisted_writes: 0,
        }
    }

    pub fn lightmaps(&self) -> &[LightmapSet] {
        &self.lightmaps
    }

    pub fn persisted_writes(&self) -> usize {
        self.persisted_writes
    }

    fn replace(&mut self, index: usize, channel: LightmapChannel, buffer: LightmapBuffer) -> Result<()> {
        let set = self
            .lightmaps
            .get_mut(index)
            .ok_or_else(|| GiTweaksError::Lighting(format!("no lightmap slot {index}")))?;
        if buffer.dimensions() != set.size() {
            return Err(GiTweaksError::Lighting(format!(
                "{channel} lightmap {index} must be {:?}, got {:?}",
                set.size(),
                buffer.dimensions()
            )));
        }
        set.set(channel, buffer);
        Ok(())
    }
}

impl LightingStore for MemoryStore {
    fn lightmap_count(&self) -> usize {
        self.lightmaps.len()
    }

    fn lightmap_set(&self, index: usize) -> Option<&LightmapSet> {
        self.lightmaps.get(index)
    }

    fn preview_lightmap(&mut self, index: usize, channel: LightmapChannel, buffer: LightmapBuffer) -> Result<()> {
        self.replace(index, channel, buffer)
    }

    fn persist_lightmap(&mut self, index: usize, channel: LightmapChannel, buffer: LightmapBuffer) -> Result<()> {
        self.replace(index, channel, buffer)?;
        self.persisted_writes += 1;
        Ok(())
    }

    fn placements(&self) -> &PlacementMap {
        &self.placements
    }

    fn save_placements(&mut self, placements: PlacementMap) -> Result<()> {
        self.placements = placements;
        Ok(())
    }

    fn commit_repack(&mut self, atlases: Vec<LightmapSet>, placements: PlacementMap) -> Result<()> {
        self.persisted_writes += atlases.iter().map(|a| a.channels().count()).sum::<usize>();
        self.lightmaps = atlases;
        self.placements = placements;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApplyMode;
    use crate::store::apply_lightmap;
    use crate::types::lightmap::solid_lightmap;

    fn store() -> MemoryStore {
        MemoryStore::new(
            vec![LightmapSet::new(solid_lightmap(4, 4, [0.2, 0.2, 0.2, 1.0]))],
            PlacementMap::new(),
        )
    }

    #[test]
    fn preview_does_not_count_as_persisted() {
        let mut s = store();
        let buf = solid_lightmap(4, 4, [1.0; 4]);
        apply_lightmap(&mut s, 0, LightmapChannel::Color, buf, ApplyMode::Preview).unwrap();
        assert_eq!(s.persisted_writes(), 0);
        assert_eq!(s.read_lightmap(0, LightmapChannel::Color).unwrap().get_pixel(1, 1).0, [1.0; 4]);
    }

    #[test]
    fn persist_counts_writes() {
        let mut s = store();
        let buf = solid_lightmap(4, 4, [0.5; 4]);
        apply_lightmap(&mut s, 0, LightmapChannel::Color, buf, ApplyMode::Persist).unwrap();
        assert_eq!(s.persisted_writes(), 1);
    }

    #[test]
    fn rejects_bad_slot_and_size() {
        let mut s = store();
        assert!(s.preview_lightmap(3, LightmapChannel::Color, solid_lightmap(4, 4, [0.0; 4])).is_err());
        assert!(s.preview_lightmap(0, LightmapChannel::Color, solid_lightmap(8, 4, [0.0; 4])).is_err());
    }

    #[test]
    fn missing_channel_reads_none() {
        let s = store();
        assert!(s.read_lightmap(0, LightmapChannel::Directional).is_none());
        assert!(s.read_lightmap(1, LightmapChannel::Color).is_none());
    }
}
