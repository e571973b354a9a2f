use std::collections::HashMap;

use glam::{IVec3, Vec3};

use super::edges::SamplePoint;

/// Angle between two directions in degrees. Zero-length inputs count as parallel.
pub fn angle_degrees(a: Vec3, b: Vec3) -> f32 {
    let denom = a.length() * b.length();
    if denom <= f32::EPSILON {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Uniform hash grid over sample positions.
struct SampleGrid {
    cell_size: f32,
    cells: HashMap<IVec3, Vec<usize>>,
}

impl SampleGrid {
    fn build(samples: &[SamplePoint], cell_size: f32) -> Self {
        let mut cells: HashMap<IVec3, Vec<usize>> = HashMap::new();
        for (i, s) in samples.iter().enumerate() {
            cells.entry(cell_of(s.position, cell_size)).or_default().push(i);
        }
        Self { cell_size, cells }
    }

    /// Indices in the 27 cells around `p`.
    fn neighbours(&self, p: Vec3) -> impl Iterator<Item = usize> + '_ {
        let center = cell_of(p, self.cell_size);
        (-1..=1)
            .flat_map(|x| (-1..=1).flat_map(move |y| (-1..=1).map(move |z| IVec3::new(x, y, z))))
            .filter_map(move |d| self.cells.get(&(center + d)))
            .flatten()
            .copied()
    }
}

fn cell_of(p: Vec3, cell_size: f32) -> IVec3 {
    (p / cell_size).floor().as_ivec3()
}

/// Distance below which samples of two surfaces are treated as the same point.
///
/// Half a texel of the coarser surface; `None` when either density is not positive.
pub fn pairing_distance(self_samples_per_meter: f32, other_samples_per_meter: f32) -> Option<f32> {
    let spm = self_samples_per_meter.min(other_samples_per_meter);
    (spm > 0.0 && spm.is_finite()).then(|| 0.5 / spm)
}

/// All `(self, other)` sample pairs closer than `max_distance` whose normals
/// differ by less than `max_angle_degrees`.
pub fn find_sample_pairs(
    self_samples: &[SamplePoint],
    other_samples: &[SamplePoint],
    max_distance: f32,
    max_angle_degrees: f32,
) -> Vec<(SamplePoint, SamplePoint)> {
    if self_samples.is_empty() || other_samples.is_empty() || max_distance <= 0.0 {
        return Vec::new();
    }

    let grid = SampleGrid::build(other_samples, max_distance);
    let mut pairs = Vec::new();
    for s in self_samples {
        for j in grid.neighbours(s.position) {
            let o = &other_samples[j];
            if s.position.distance(o.position) <= max_distance
                && angle_degrees(s.normal, o.normal) < max_angle_degrees
            {
                pairs.push((*s, *o));
            }
        }
    }
    pairs
}
