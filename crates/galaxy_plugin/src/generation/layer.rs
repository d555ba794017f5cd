//! Sector-level star placement.
//!
//! A layer owns one octree level. For each sector of that level it samples
//! the density field, then runs a bounded number of rejection-sampling
//! attempts. Every accepted attempt becomes an [`InitialElement`]: a position,
//! a cheap summary and the seed that regenerates the full system later.

use glam::DVec3;
use rand::{Rng, SeedableRng};

use super::density::{estimate_density, DensityEstimate, DensityField};
use super::seed::{info_rng, sector_seed, GalaxyRng};
use super::stellar::StarSystemInfo;
use crate::config::{LayerConfig, SystemConfig};
use crate::sector::SectorPos;

/// One placed star system, before orbital synthesis.
#[derive(Clone, Debug, PartialEq)]
pub struct InitialElement {
  pub position: DVec3,
  pub info: StarSystemInfo,
  /// Seed for [`StarSystemGenerator::generate`](super::StarSystemGenerator::generate).
  pub seed: u64,
  /// Id of the layer that placed this element.
  pub layer_id: u32,
}

/// Read-only inputs shared by every layer.
#[derive(Clone, Copy)]
pub struct GenerationContext<'a> {
  pub universe_seed: u64,
  pub density: &'a dyn DensityField,
  pub systems: &'a SystemConfig,
}

/// Produces initial elements for sectors of one level.
pub trait GalaxyGenerationLayer: Send + Sync {
  fn id(&self) -> u32;

  fn level(&self) -> u8;

  /// Append this layer's elements for `pos` to `out`.
  fn generate(&self, ctx: &GenerationContext<'_>, pos: &SectorPos, out: &mut Vec<InitialElement>);
}

/// Density-driven rejection sampling of star systems.
#[derive(Clone, Debug)]
pub struct StarLayer {
  config: LayerConfig,
}

impl StarLayer {
  pub fn new(config: LayerConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &LayerConfig {
    &self.config
  }

  /// Mean number of systems expected in a box of `volume`.
  pub fn expected_count(&self, estimate: &DensityEstimate, volume: f64) -> f64 {
    estimate.mean * volume * self.config.density_scale
  }

  /// Placement attempts for a box of `volume`, using the maximum lattice
  /// sample as the rejection envelope.
  pub fn attempt_count(&self, estimate: &DensityEstimate, volume: f64) -> u32 {
    let envelope = (estimate.max * volume * self.config.density_scale).round();
    if !(envelope > 0.0) {
      return 0;
    }
    (envelope.min(u32::MAX as f64) as u32).min(self.config.max_attempts)
  }
}

impl GalaxyGenerationLayer for StarLayer {
  fn id(&self) -> u32 {
    self.config.id
  }

  fn level(&self) -> u8 {
    self.config.level
  }

  fn generate(&self, ctx: &GenerationContext<'_>, pos: &SectorPos, out: &mut Vec<InitialElement>) {
    let bounds = pos.bounds();
    let estimate = estimate_density(ctx.density, &bounds);
    let volume = bounds.volume();
    let attempts = self.attempt_count(&estimate, volume);
    if attempts == 0 {
      return;
    }

    let mut rng = GalaxyRng::seed_from_u64(sector_seed(ctx.universe_seed, pos, self.config.id));
    let before = out.len();

    for _ in 0..attempts {
      let t = DVec3::new(rng.random(), rng.random(), rng.random());
      let position = bounds.lerp(t);
      let acceptance = ctx.density.density(position).max(0.0) / estimate.max;
      if rng.random::<f64>() >= acceptance {
        continue;
      }

      let seed: u64 = rng.random();
      let info = StarSystemInfo::roll(
        &mut info_rng(seed),
        self.config.system_mass_min,
        self.config.system_mass_max,
        ctx.systems.age_min,
        ctx.systems.age_max,
      );
      out.push(InitialElement {
        position,
        info,
        seed,
        layer_id: self.config.id,
      });
    }

    tracing::trace!(
      ?pos,
      layer = self.config.id,
      attempts,
      expected = self.expected_count(&estimate, volume),
      placed = out.len() - before,
      "layer placed systems"
    );
  }
}
