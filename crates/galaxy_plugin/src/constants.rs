//! Sector layout constants.
//!
//! The galaxy is partitioned into an octree per root cell. Level 0 is the
//! finest subdivision, `ROOT_LEVEL` the coarsest.
//!
//! ```text
//! Sector Width = BASE_SIZE * 2^level
//!
//! level 7 (root) ─┬─ 2048 units
//!                 ├─ ...
//! level 0        ─┴─   16 units
//! ```

/// Coarsest octree level. Each root cell spans `2^ROOT_LEVEL` level-0 cells
/// per axis.
pub const ROOT_LEVEL: u8 = 7;

/// Number of levels in a root tree (`0..=ROOT_LEVEL`).
pub const LEVEL_COUNT: usize = ROOT_LEVEL as usize + 1;

/// Width of a level-0 sector in galaxy units.
pub const BASE_SIZE: f64 = 16.0;

/// Default ratio between an orbit and the widest orbit that stays stable
/// inside it (and between a binary separation and the nearest stable
/// circumbinary orbit).
pub const BINARY_SYSTEM_SPACING_FACTOR: f64 = 3.0;

/// Width of a sector at `level` in galaxy units.
#[inline]
pub fn sector_width(level: u8) -> f64 {
  BASE_SIZE * (1u64 << level) as f64
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
