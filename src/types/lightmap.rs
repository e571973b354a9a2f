use image::{Rgba, Rgba32FImage};
use serde::{Deserialize, Serialize};

/// Writable float copy of one lightmap texture.
///
/// Row 0 is the `v = 0` edge of lightmap UV space.
pub type LightmapBuffer = Rgba32FImage;

/// The textures a bake may produce for each lightmap slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightmapChannel {
    Color,
    Directional,
    ShadowMask,
}

impl LightmapChannel {
    pub const ALL: [LightmapChannel; 3] = [
        LightmapChannel::Color,
        LightmapChannel::Directional,
        LightmapChannel::ShadowMask,
    ];

    /// File suffix used when naming persisted textures.
    pub fn suffix(&self) -> &'static str {
        match self {
            LightmapChannel::Color => "comp_light",
            LightmapChannel::Directional => "comp_dir",
            LightmapChannel::ShadowMask => "comp_shadowmask",
        }
    }
}

impl std::fmt::Display for LightmapChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LightmapChannel::Color => write!(f, "color"),
            LightmapChannel::Directional => write!(f, "directional"),
            LightmapChannel::ShadowMask => write!(f, "shadowmask"),
        }
    }
}

/// All textures of one lightmap slot. Every present channel shares the color size.
#[derive(Debug, Clone)]
pub struct LightmapSet {
    pub color: LightmapBuffer,
    pub directional: Option<LightmapBuffer>,
    pub shadowmask: Option<LightmapBuffer>,
}

impl LightmapSet {
    pub fn new(color: LightmapBuffer) -> Self {
        Self {
            color,
            directional: None,
            shadowmask: None,
        }
    }

    /// Set of blank textures with the same channels as `template`.
    pub fn blank_like(template: &LightmapSet, width: u32, height: u32) -> Self {
        let blank = || LightmapBuffer::new(width, height);
        Self {
            color: blank(),
            directional: template.directional.as_ref().map(|_| blank()),
            shadowmask: template.shadowmask.as_ref().map(|_| blank()),
        }
    }

    /// `(width, height)` of the slot.
    pub fn size(&self) -> (u32, u32) {
        self.color.dimensions()
    }

    pub fn get(&self, channel: LightmapChannel) -> Option<&LightmapBuffer> {
        match channel {
            LightmapChannel::Color => Some(&self.color),
            LightmapChannel::Directional => self.directional.as_ref(),
            LightmapChannel::ShadowMask => self.shadowmask.as_ref(),
        }
    }

    pub fn get_mut(&mut self, channel: LightmapChannel) -> Option<&mut LightmapBuffer> {
        match channel {
            LightmapChannel::Color => Some(&mut self.color),
            LightmapChannel::Directional => self.directional.as_mut(),
            LightmapChannel::ShadowMask => self.shadowmask.as_mut(),
        }
    }

    /// Replace a channel; the color channel must stay present.
    pub fn set(&mut self, channel: LightmapChannel, buffer: LightmapBuffer) {
        match channel {
            LightmapChannel::Color => self.color = buffer,
            LightmapChannel::Directional => self.directional = Some(buffer),
            LightmapChannel::ShadowMask => self.shadowmask = Some(buffer),
        }
    }

    /// Channels present in this set, color first.
    pub fn channels(&self) -> impl Iterator<Item = LightmapChannel> + '_ {
        LightmapChannel::ALL
            .into_iter()
            .filter(|c| self.get(*c).is_some())
    }
}

/// Lightmap filled with a single color.
pub fn solid_lightmap(width: u32, height: u32, color: [f32; 4]) -> LightmapBuffer {
    LightmapBuffer::from_pixel(width, height, Rgba(color))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_suffixes() {
        assert_eq!(LightmapChannel::Color.suffix(), "comp_light");
        assert_eq!(LightmapChannel::Directional.suffix(), "comp_dir");
        assert_eq!(LightmapChannel::ShadowMask.suffix(), "comp_shadowmask");
        assert_eq!(LightmapChannel::ShadowMask.to_string(), "shadowmask");
    }

    #[test]
    fn set_channels() {
        let mut set = LightmapSet::new(solid_lightmap(4, 2, [1.0, 0.0, 0.0, 1.0]));
        assert_eq!(set.size(), (4, 2));
        assert_eq!(set.channels().collect::<Vec<_>>(), vec![LightmapChannel::Color]);
        assert!(set.get(LightmapChannel::Directional).is_none());

        set.set(LightmapChannel::ShadowMask, solid_lightmap(4, 2, [1.0; 4]));
        assert_eq!(
            set.channels().collect::<Vec<_>>(),
            vec![LightmapChannel::Color, LightmapChannel::ShadowMask]
        );
    }

    #[test]
    fn blank_like_copies_channel_layout() {
        let mut template = LightmapSet::new(solid_lightmap(8, 8, [0.5; 4]));
        template.directional = Some(solid_lightmap(8, 8, [0.5; 4]));

        let blank = LightmapSet::blank_like(&template, 4, 4);
        assert_eq!(blank.size(), (4, 4));
        assert!(blank.directional.is_some());
        assert!(blank.shadowmask.is_none());
        assert_eq!(blank.color.get_pixel(0, 0).0, [0.0; 4]);
    }
}
