//! Axis-aligned bounding box with double precision for galaxy-scale space.

use glam::DVec3;

/// Double-precision axis-aligned bounding box.
///
/// Sector boxes are half-open in practice (`min` belongs to the sector, `max`
/// to its neighbour) but the checks here are inclusive on both ends.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DAabb3 {
  /// Minimum corner (inclusive).
  pub min: DVec3,
  /// Maximum corner (inclusive).
  pub max: DVec3,
}

impl DAabb3 {
  /// Create a new AABB from min and max corners.
  ///
  /// # Panics
  /// Debug-asserts that min <= max on all axes.
  pub fn new(min: DVec3, max: DVec3) -> Self {
    debug_assert!(
      min.cmple(max).all(),
      "AABB min must be <= max on all axes"
    );
    Self { min, max }
  }

  /// Check if this AABB contains a point.
  #[inline]
  pub fn contains_point(&self, point: DVec3) -> bool {
    point.cmpge(self.min).all() && point.cmple(self.max).all()
  }

  /// Get the size of the AABB (max - min).
  #[inline]
  pub fn size(&self) -> DVec3 {
    self.max - self.min
  }

  /// Volume enclosed by the box.
  #[inline]
  pub fn volume(&self) -> f64 {
    let size = self.size();
    size.x * size.y * size.z
  }

  /// Get the center of the AABB.
  #[inline]
  pub fn center(&self) -> DVec3 {
    (self.min + self.max) * 0.5
  }

  /// Map a point in unit space (`[0, 1]^3`) into the box.
  #[inline]
  pub fn lerp(&self, t: DVec3) -> DVec3 {
    self.min + self.size() * t
  }
}
