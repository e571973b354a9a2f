use glam::{UVec2, Vec2};

use crate::types::{LightmapBuffer, ScaleOffset};

/// Local lightmap UV to continuous pixel coordinates of an atlas.
///
/// Integer results land on texel centers.
pub fn uv_to_lightmap(uv: Vec2, st: &ScaleOffset, width: u32, height: u32) -> Vec2 {
    st.apply(uv) * Vec2::new(width as f32, height as f32) - Vec2::splat(0.5)
}

/// Inverse of [`uv_to_lightmap`].
pub fn lightmap_to_uv(pixel: Vec2, st: &ScaleOffset, width: u32, height: u32) -> Vec2 {
    let size = Vec2::new(width as f32, height as f32);
    let atlas_uv = (pixel + Vec2::splat(0.5)) / size.max(Vec2::ONE);
    st.invert(atlas_uv)
}

/// The four texels around a fractional pixel coordinate and their weights.
///
/// Taps are in the order `(x0,y0) (x1,y0) (x1,y1) (x0,y1)` and clamped to the
/// atlas. Weights sum to the caller's `weight`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BilinearTaps {
    pub texels: [UVec2; 4],
    pub weights: [f32; 4],
}

impl BilinearTaps {
    pub fn new(pixel: Vec2, width: u32, height: u32, weight: f32) -> Self {
        let base = pixel.floor();
        let frac = pixel - base;
        let (x0, y0) = (base.x as i64, base.y as i64);

        let max_x = i64::from(width.max(1) - 1);
        let max_y = i64::from(height.max(1) - 1);
        let texel = |x: i64, y: i64| UVec2::new(x.clamp(0, max_x) as u32, y.clamp(0, max_y) as u32);

        Self {
            texels: [
                texel(x0, y0),
                texel(x0 + 1, y0),
                texel(x0 + 1, y0 + 1),
                texel(x0, y0 + 1),
            ],
            weights: [
                (1.0 - frac.x) * (1.0 - frac.y) * weight,
                frac.x * (1.0 - frac.y) * weight,
                frac.x * frac.y * weight,
                (1.0 - frac.x) * frac.y * weight,
            ],
        }
    }

    /// Taps for a local UV of a surface placed with `st`.
    pub fn for_uv(uv: Vec2, st: &ScaleOffset, width: u32, height: u32, weight: f32) -> Self {
        Self::new(uv_to_lightmap(uv, st, width, height), width, height, weight)
    }

    /// Weighted RGB sum of the taps from `buffer`.
    pub fn sample_rgb(&self, buffer: &LightmapBuffer) -> [f32; 3] {
        let mut out = [0.0; 3];
        for (texel, w) in self.texels.iter().zip(self.weights) {
            let px = buffer.get_pixel(texel.x, texel.y).0;
            for c in 0..3 {
                out[c] += px[c] * w;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::Rgba;

    #[test]
    fn texel_centers_are_integers() {
        let st = ScaleOffset::IDENTITY;
        let p = uv_to_lightmap(Vec2::new(0.5 / 64.0, 0.5 / 64.0), &st, 64, 64);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn uv_round_trip() {
        let sts = [
            ScaleOffset::IDENTITY,
            ScaleOffset::new(0.25, 0.25, 0.125, 0.125),
            ScaleOffset::new(0.5, 0.125, 0.5, 0.75),
        ];
        for st in sts {
            for (u, v) in [(0.0, 0.0), (0.3, 0.7), (1.0, 1.0), (0.51, 0.02)] {
                let uv = Vec2::new(u, v);
                let back = lightmap_to_uv(uv_to_lightmap(uv, &st, 128, 64), &st, 128, 64);
                assert_relative_eq!(back.x, uv.x, epsilon = 1e-4);
                assert_relative_eq!(back.y, uv.y, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn weights_sum_to_strength() {
        let taps = BilinearTaps::new(Vec2::new(3.25, 7.75), 16, 16, 5.0);
        assert_relative_eq!(taps.weights.iter().sum::<f32>(), 5.0, epsilon = 1e-5);
        assert_eq!(taps.texels[0], UVec2::new(3, 7));
        assert_eq!(taps.texels[2], UVec2::new(4, 8));
        assert_relative_eq!(taps.weights[0], 0.75 * 0.25 * 5.0, epsilon = 1e-6);
    }

    #[test]
    fn taps_clamp_to_atlas() {
        let low = BilinearTaps::new(Vec2::new(-0.5, -0.5), 8, 8, 1.0);
        assert!(low.texels.iter().all(|t| t.x <= 1 && t.y <= 1));
        assert_eq!(low.texels[0], UVec2::ZERO);

        let high = BilinearTaps::new(Vec2::new(7.5, 7.5), 8, 8, 1.0);
        assert!(high.texels.iter().all(|t| t.x <= 7 && t.y <= 7));
    }

    #[test]
    fn sample_interpolates() {
        let buffer = LightmapBuffer::from_fn(2, 1, |x, _| {
            if x == 0 { Rgba([0.0, 0.0, 0.0, 1.0]) } else { Rgba([1.0, 2.0, 0.0, 1.0]) }
        });
        let taps = BilinearTaps::new(Vec2::new(0.5, 0.0), 2, 1, 1.0);
        let rgb = taps.sample_rgb(&buffer);
        assert_relative_eq!(rgb[0], 0.5, epsilon = 1e-6);
        assert_relative_eq!(rgb[1], 1.0, epsilon = 1e-6);
    }
}
