//! SectorPos - immutable value type addressing one octree cell.
//!
//! Coordinates are in units of the sector's own level, not level 0. Level 0 is
//! the finest subdivision, `ROOT_LEVEL` the coarsest.

use glam::{DVec3, IVec3};

use super::DAabb3;
use crate::constants::{sector_width, ROOT_LEVEL};

/// Octree cell address - immutable value type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SectorPos {
  /// Subdivision level (0 = finest, `ROOT_LEVEL` = coarsest).
  pub level: u8,
  /// Grid position at this sector's level.
  pub coords: IVec3,
}

impl SectorPos {
  /// Create a new sector address.
  ///
  /// # Panics
  /// Debug-asserts that `level <= ROOT_LEVEL`.
  pub fn new(level: u8, coords: IVec3) -> Self {
    debug_assert!(level <= ROOT_LEVEL, "level {} above root", level);
    Self { level, coords }
  }

  /// The sector at `level` containing the continuous point `point`.
  pub fn from_point(level: u8, point: DVec3) -> Self {
    let cell = (point / sector_width(level)).floor();
    Self::new(level, cell.as_ivec3())
  }

  /// Width of this sector in galaxy units.
  #[inline]
  pub fn width(&self) -> f64 {
    sector_width(self.level)
  }

  /// Minimum corner in continuous space.
  #[inline]
  pub fn min_bound(&self) -> DVec3 {
    self.coords.as_dvec3() * self.width()
  }

  /// Maximum corner in continuous space.
  #[inline]
  pub fn max_bound(&self) -> DVec3 {
    (self.coords + IVec3::ONE).as_dvec3() * self.width()
  }

  /// Bounding box of this sector.
  #[inline]
  pub fn bounds(&self) -> DAabb3 {
    DAabb3::new(self.min_bound(), self.max_bound())
  }

  /// Center of this sector in continuous space.
  #[inline]
  pub fn center(&self) -> DVec3 {
    (self.coords.as_dvec3() + DVec3::splat(0.5)) * self.width()
  }

  /// Coordinates of the root-level ancestor, used to key root trees.
  ///
  /// Floor division, so negative coordinates map to the correct root cell.
  #[inline]
  pub fn root_coords(&self) -> IVec3 {
    self.ancestor(ROOT_LEVEL).coords
  }

  /// The root-level ancestor.
  #[inline]
  pub fn root(&self) -> Self {
    self.ancestor(ROOT_LEVEL)
  }

  /// Ancestor at `level`. Returns `self` when `level <= self.level`.
  pub fn ancestor(&self, level: u8) -> Self {
    if level <= self.level {
      return *self;
    }
    let shift = (level - self.level) as i32;
    Self {
      level,
      coords: IVec3::new(
        self.coords.x >> shift,
        self.coords.y >> shift,
        self.coords.z >> shift,
      ),
    }
  }

  /// Parent sector (one level coarser), or `None` at the root level.
  pub fn parent(&self) -> Option<Self> {
    if self.level >= ROOT_LEVEL {
      return None;
    }
    Some(self.ancestor(self.level + 1))
  }

  /// Child sector (one level finer).
  ///
  /// Octant bits: X (bit 0), Y (bit 1), Z (bit 2).
  /// Returns `None` at level 0.
  pub fn child(&self, octant: u8) -> Option<Self> {
    if self.level == 0 {
      return None;
    }
    let offset = IVec3::new(
      (octant & 1) as i32,
      ((octant >> 1) & 1) as i32,
      ((octant >> 2) & 1) as i32,
    );
    Some(Self {
      level: self.level - 1,
      coords: self.coords * 2 + offset,
    })
  }

  /// All eight children, or an empty list at level 0.
  pub fn children(&self) -> smallvec::SmallVec<[Self; 8]> {
    (0..8u8).filter_map(|octant| self.child(octant)).collect()
  }

  /// Octant of `self` inside its parent.
  #[inline]
  pub fn octant(&self) -> u8 {
    ((self.coords.x & 1) | ((self.coords.y & 1) << 1) | ((self.coords.z & 1) << 2)) as u8
  }

  /// Check whether `other` is this sector or one of its descendants.
  #[inline]
  pub fn contains(&self, other: &SectorPos) -> bool {
    other.level <= self.level && other.ancestor(self.level) == *self
  }
}

#[cfg(test)]
#[path = "pos_test.rs"]
mod pos_test;
