//! Math type re-exports and mesh-specific math utilities.

// Re-export glam types used throughout the crate
pub use glam::{Vec2, Vec3, Vec4};

use std::fmt;

/// 3D bounding box with single precision.
#[derive(Clone, Copy, PartialEq)]
pub struct BBox3f {
    pub min: Vec3,
    pub max: Vec3,
}

impl BBox3f {
    /// Empty bounding box (inverted, will expand on first point).
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create a new bounding box from min and max points.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Check if this box is empty (has no volume).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this box to include a point.
    #[inline]
    pub fn expand_by_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Expand this box to include another box.
    #[inline]
    pub fn expand_by_box(&mut self, other: &Self) {
        if !other.is_empty() {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        }
    }

    /// Compute the box enclosing a set of points.
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut bbox = Self::EMPTY;
        for &p in points {
            bbox.expand_by_point(p);
        }
        bbox
    }
}

impl Default for BBox3f {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for BBox3f {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BBox3f")
            .field("min", &self.min)
            .field("max", &self.max)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_expand() {
        let mut bbox = BBox3f::EMPTY;
        assert!(bbox.is_empty());
        bbox.expand_by_point(Vec3::new(1.0, -2.0, 3.0));
        bbox.expand_by_point(Vec3::new(-1.0, 2.0, 0.0));
        assert_eq!(bbox.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(bbox.max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_bbox_from_points() {
        let bbox = BBox3f::from_points(&[Vec3::ZERO, Vec3::ONE, Vec3::new(0.5, 2.0, -1.0)]);
        assert_eq!(bbox.min, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(bbox.max, Vec3::new(1.0, 2.0, 1.0));
    }
}
