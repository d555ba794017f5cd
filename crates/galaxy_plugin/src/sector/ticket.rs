//! SectorTicketInfo - declarative description of a region to keep loaded.
//!
//! A ticket either pins one exact sector (`Single`) or covers a box of
//! sectors on every level around a focus point (`Multi`). The per-level
//! radius grows geometrically towards coarse levels:
//!
//! ```text
//! r(0)     = base_radius
//! r(L + 1) = r(L) * multiplicative_factor + additive_factor
//! ```
//!
//! Diffing two infos yields the sectors to load and unload when a ticket
//! changes between ticks.

use std::collections::HashSet;

use glam::{DVec3, IVec3};

use super::SectorPos;
use crate::constants::{sector_width, LEVEL_COUNT, ROOT_LEVEL};

/// Inclusive integer box of sector coordinates on one level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelRange {
  pub level: u8,
  pub min: IVec3,
  pub max: IVec3,
}

impl LevelRange {
  /// True when the range selects no sector.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.min.cmpgt(self.max).any()
  }

  #[inline]
  pub fn contains(&self, coords: IVec3) -> bool {
    coords.cmpge(self.min).all() && coords.cmple(self.max).all()
  }

  /// Number of sectors in the range.
  pub fn len(&self) -> usize {
    if self.is_empty() {
      return 0;
    }
    let extent = self.max - self.min + IVec3::ONE;
    extent.x as usize * extent.y as usize * extent.z as usize
  }

  /// Iterate every sector in the range (X outermost, Z innermost).
  pub fn iter(&self) -> impl Iterator<Item = SectorPos> + '_ {
    let level = self.level;
    (self.min.x..=self.max.x).flat_map(move |x| {
      (self.min.y..=self.max.y).flat_map(move |y| {
        (self.min.z..=self.max.z).map(move |z| SectorPos::new(level, IVec3::new(x, y, z)))
      })
    })
  }
}

/// A focus point with a radius that widens on coarser levels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MultiTicket {
  /// Focus point in galaxy space. Updated in place as the owner moves.
  pub center: DVec3,
  /// Radius at level 0.
  pub base_radius: f64,
  /// Added to the radius for each coarser level.
  pub additive_factor: f64,
  /// Multiplies the radius for each coarser level.
  pub multiplicative_factor: f64,
}

impl MultiTicket {
  pub fn new(
    center: DVec3,
    base_radius: f64,
    additive_factor: f64,
    multiplicative_factor: f64,
  ) -> Self {
    Self {
      center,
      base_radius,
      additive_factor,
      multiplicative_factor,
    }
  }

  /// Radius used on `level`.
  pub fn radius_at(&self, level: u8) -> f64 {
    let mut radius = self.base_radius;
    for _ in 0..level {
      radius = radius * self.multiplicative_factor + self.additive_factor;
    }
    radius
  }

  /// Integer sector range covered on `level`.
  pub fn level_range(&self, level: u8) -> LevelRange {
    self.range_for_radius(level, self.radius_at(level))
  }

  /// Integer ranges for every level, computed with one radius walk.
  pub fn level_ranges(&self) -> [LevelRange; LEVEL_COUNT] {
    let mut radius = self.base_radius;
    std::array::from_fn(|level| {
      let range = self.range_for_radius(level as u8, radius);
      radius = radius * self.multiplicative_factor + self.additive_factor;
      range
    })
  }

  fn range_for_radius(&self, level: u8, radius: f64) -> LevelRange {
    let width = sector_width(level);
    if radius < 0.0 || !radius.is_finite() {
      // Inverted box: selects nothing.
      return LevelRange {
        level,
        min: IVec3::ONE,
        max: IVec3::ZERO,
      };
    }
    LevelRange {
      level,
      min: ((self.center - DVec3::splat(radius)) / width).floor().as_ivec3(),
      max: ((self.center + DVec3::splat(radius)) / width).floor().as_ivec3(),
    }
  }
}

/// Sectors to load and unload after a ticket changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SectorDiff {
  pub added: Vec<SectorPos>,
  pub removed: Vec<SectorPos>,
}

impl SectorDiff {
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.added.is_empty() && self.removed.is_empty()
  }

  /// Diff for a ticket that did not exist before.
  pub fn initial(info: &SectorTicketInfo) -> Self {
    let mut diff = Self::default();
    info.for_each_sector(|pos| diff.added.push(pos));
    diff
  }

  /// Diff for a ticket that is going away.
  pub fn release(info: &SectorTicketInfo) -> Self {
    let mut diff = Self::default();
    info.for_each_sector(|pos| diff.removed.push(pos));
    diff
  }
}

/// What region of space a ticket wants kept loaded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SectorTicketInfo {
  /// Exactly one sector.
  Single(SectorPos),
  /// A box of sectors on every level around a moving point.
  Multi(MultiTicket),
}

impl SectorTicketInfo {
  /// Convenience constructor for [`SectorTicketInfo::Multi`].
  pub fn multi(
    center: DVec3,
    base_radius: f64,
    additive_factor: f64,
    multiplicative_factor: f64,
  ) -> Self {
    Self::Multi(MultiTicket::new(
      center,
      base_radius,
      additive_factor,
      multiplicative_factor,
    ))
  }

  /// Move the focus point of a `Multi` ticket. No-op for `Single`.
  pub fn set_center(&mut self, center: DVec3) {
    if let Self::Multi(multi) = self {
      multi.center = center;
    }
  }

  /// Visit every sector this ticket wants loaded.
  pub fn for_each_sector(&self, mut f: impl FnMut(SectorPos)) {
    match self {
      Self::Single(pos) => f(*pos),
      Self::Multi(multi) => {
        for range in multi.level_ranges() {
          range.iter().for_each(&mut f);
        }
      }
    }
  }

  /// Every sector this ticket wants loaded, across all levels.
  pub fn affected_sectors(&self) -> HashSet<SectorPos> {
    let mut set = HashSet::new();
    self.for_each_sector(|pos| {
      set.insert(pos);
    });
    set
  }

  /// Number of sectors this ticket covers.
  pub fn sector_count(&self) -> usize {
    match self {
      Self::Single(_) => 1,
      Self::Multi(multi) => multi.level_ranges().iter().map(LevelRange::len).sum(),
    }
  }

  /// Check whether `pos` is covered by this ticket.
  pub fn contains(&self, pos: &SectorPos) -> bool {
    match self {
      Self::Single(single) => single == pos,
      Self::Multi(multi) => pos.level <= ROOT_LEVEL && multi.level_range(pos.level).contains(pos.coords),
    }
  }

  /// Sectors gained and lost going from `previous` to `self`.
  ///
  /// Infos of different variants are diffed as a full replacement: every
  /// previous sector is removed and every current sector added.
  pub fn diff(&self, previous: &SectorTicketInfo) -> SectorDiff {
    match (self, previous) {
      (Self::Single(current), Self::Single(previous)) => {
        if current == previous {
          return SectorDiff::default();
        }
        SectorDiff {
          added: vec![*current],
          removed: vec![*previous],
        }
      }
      (Self::Multi(current), Self::Multi(previous)) => diff_multi(current, previous),
      _ => {
        let mut diff = SectorDiff::initial(self);
        previous.for_each_sector(|pos| diff.removed.push(pos));
        diff
      }
    }
  }
}

/// Per-level box diff. Levels whose integer range is unchanged are skipped.
fn diff_multi(current: &MultiTicket, previous: &MultiTicket) -> SectorDiff {
  let mut diff = SectorDiff::default();
  let current_ranges = current.level_ranges();
  let previous_ranges = previous.level_ranges();

  for (new, old) in current_ranges.iter().zip(previous_ranges.iter()) {
    if new == old {
      continue;
    }
    diff
      .added
      .extend(new.iter().filter(|pos| !old.contains(pos.coords)));
    diff
      .removed
      .extend(old.iter().filter(|pos| !new.contains(pos.coords)));
  }

  diff
}

#[cfg(test)]
#[path = "ticket_test.rs"]
mod ticket_test;
