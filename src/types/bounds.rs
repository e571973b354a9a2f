use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    /// Box centred on `center` reaching `extents` (half-size) along each axis.
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        let extents = extents.abs();
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Smallest box containing every point, or `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self { min: first, max: first }, |b, p| Self {
            min: b.min.min(p),
            max: b.max.max(p),
        }))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half-size along each axis.
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Whether a point lies inside (or on the boundary of) the box.
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Whether the two boxes overlap (touching faces count).
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// Return the smallest box that contains both `self` and `other`.
    pub fn merge(&self, other: &Bounds) -> Bounds {
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Bounds {
        Bounds {
            min: Vec3::ZERO,
            max: Vec3::ONE,
        }
    }

    #[test]
    fn center_and_extents() {
        let b = Bounds::from_center_extents(Vec3::new(1.0, 2.0, 3.0), Vec3::splat(0.5));
        assert_eq!(b.min, Vec3::new(0.5, 1.5, 2.5));
        assert_eq!(b.max, Vec3::new(1.5, 2.5, 3.5));
        assert_eq!(b.center(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(b.extents(), Vec3::splat(0.5));
    }

    #[test]
    fn negative_extents_are_normalised() {
        let b = Bounds::from_center_extents(Vec3::ZERO, Vec3::new(-1.0, 1.0, -2.0));
        assert_eq!(b.min, Vec3::new(-1.0, -1.0, -2.0));
    }

    #[test]
    fn contains_point() {
        let bb = unit_box();
        assert!(bb.contains_point(Vec3::splat(0.5)));
        assert!(bb.contains_point(Vec3::ZERO)); // boundary
        assert!(bb.contains_point(Vec3::ONE)); // boundary
        assert!(!bb.contains_point(Vec3::new(1.1, 0.5, 0.5)));
        assert!(!bb.contains_point(Vec3::new(-0.1, 0.5, 0.5)));
    }

    #[test]
    fn intersection() {
        let a = unit_box();
        let touching = Bounds {
            min: Vec3::new(1.0, 0.0, 0.0),
            max: Vec3::new(2.0, 1.0, 1.0),
        };
        let apart = Bounds {
            min: Vec3::splat(3.0),
            max: Vec3::splat(4.0),
        };
        assert!(a.intersects(&touching));
        assert!(!a.intersects(&apart));
    }

    #[test]
    fn from_points_and_merge() {
        assert!(Bounds::from_points(std::iter::empty()).is_none());

        let b = Bounds::from_points([Vec3::new(1.0, -1.0, 0.0), Vec3::new(-2.0, 3.0, 1.0)]).unwrap();
        assert_eq!(b.min, Vec3::new(-2.0, -1.0, 0.0));
        assert_eq!(b.max, Vec3::new(1.0, 3.0, 1.0));

        let merged = b.merge(&unit_box());
        assert_eq!(merged.max, Vec3::new(1.0, 3.0, 1.0));
        assert_eq!(merged.min, Vec3::new(-2.0, -1.0, 0.0));
    }
}
