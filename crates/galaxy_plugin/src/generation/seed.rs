//! Deterministic seeding.
//!
//! Every random decision in the galaxy derives from the universe seed through
//! [`mix64`], a fixed splitmix64 finaliser. The mixed seed initialises a
//! `ChaCha8Rng`, whose output stream is stable across platforms and crate
//! releases. No generation step reads the clock or any other external state.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::sector::SectorPos;

/// Random source used by all generation code.
pub type GalaxyRng = ChaCha8Rng;

/// Salts keeping placement, summary and synthesis streams apart.
const SECTOR_SALT: u64 = 0x5EC7_0A11_0CA7_1005;
const INFO_SALT: u64 = 0x1AF0_5EED_0F5E_ED01;
const SYSTEM_SALT: u64 = 0x5157_E55E_ED5A_17ED;

/// splitmix64 finaliser.
#[inline]
pub const fn mix64(mut z: u64) -> u64 {
  z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
  z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
  z ^ (z >> 31)
}

/// Folds a sequence of values into one well-mixed seed.
#[derive(Clone, Copy, Debug)]
pub struct SeedBuilder(u64);

impl SeedBuilder {
  pub const fn new(seed: u64) -> Self {
    Self(mix64(seed))
  }

  #[must_use]
  pub const fn with(self, value: u64) -> Self {
    Self(mix64(self.0 ^ value.wrapping_add(0x9E37_79B9_7F4A_7C15)))
  }

  #[must_use]
  pub const fn with_i32(self, value: i32) -> Self {
    self.with(value as u32 as u64)
  }

  pub const fn finish(self) -> u64 {
    self.0
  }

  pub fn rng(self) -> GalaxyRng {
    GalaxyRng::seed_from_u64(self.0)
  }
}

/// Seed for one generation layer placing stars in one sector.
pub fn sector_seed(universe_seed: u64, pos: &SectorPos, layer_id: u32) -> u64 {
  SeedBuilder::new(universe_seed ^ SECTOR_SALT)
    .with(pos.level as u64)
    .with_i32(pos.coords.x)
    .with_i32(pos.coords.y)
    .with_i32(pos.coords.z)
    .with(layer_id as u64)
    .finish()
}

/// Random stream for rolling the summary info of the system with `seed`.
pub fn info_rng(seed: u64) -> GalaxyRng {
  SeedBuilder::new(seed ^ INFO_SALT).rng()
}

/// Random stream for synthesising the system with `seed`.
pub fn system_rng(seed: u64) -> GalaxyRng {
  SeedBuilder::new(seed ^ SYSTEM_SALT).rng()
}

/// Uniform sample in `[min, max]`; `None` when the range is inverted or
/// either bound is not finite.
pub fn sample_range(rng: &mut impl Rng, min: f64, max: f64) -> Option<f64> {
  if !(min.is_finite() && max.is_finite() && min <= max) {
    return None;
  }
  if min == max {
    return Some(min);
  }
  Some(rng.random_range(min..=max))
}

/// Log-uniform sample in `[min, max]` for strictly positive bounds.
pub fn sample_log_range(rng: &mut impl Rng, min: f64, max: f64) -> Option<f64> {
  if min <= 0.0 {
    return None;
  }
  sample_range(rng, min.ln(), max.ln()).map(f64::exp)
}

/// Pick one entry with probability proportional to its weight.
///
/// # Panics
/// Panics on an empty slice or a non-positive total weight; both are
/// programming errors at the call site.
pub fn choose_weighted<'a, T>(rng: &mut impl Rng, entries: &'a [(T, f64)]) -> &'a T {
  assert!(!entries.is_empty(), "choose_weighted on empty slice");
  let total: f64 = entries.iter().map(|(_, weight)| weight.max(0.0)).sum();
  assert!(total > 0.0, "choose_weighted with zero total weight");

  let mut pick = rng.random_range(0.0..total);
  for (value, weight) in entries {
    let weight = weight.max(0.0);
    if pick < weight {
      return value;
    }
    pick -= weight;
  }
  &entries[entries.len() - 1].0
}
