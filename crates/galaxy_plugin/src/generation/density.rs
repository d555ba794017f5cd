//! Star density fields.
//!
//! A density field maps a point in galaxy space to an expected number of
//! systems per cubic unit. Layers only ever sample it; they never see how it
//! is computed.

use std::f64::consts::TAU;
use std::sync::Arc;

use glam::DVec3;

use crate::config::DensityConfig;
use crate::sector::DAabb3;

/// Samples per axis when estimating density over a sector.
const LATTICE_SAMPLES: usize = 3;

/// Expected systems per cubic unit at a point.
pub trait DensityField: Send + Sync {
  fn density(&self, point: DVec3) -> f64;
}

impl<F> DensityField for F
where
  F: Fn(DVec3) -> f64 + Send + Sync,
{
  fn density(&self, point: DVec3) -> f64 {
    self(point)
  }
}

/// Same density everywhere.
#[derive(Clone, Copy, Debug)]
pub struct UniformDensity(pub f64);

impl DensityField for UniformDensity {
  fn density(&self, _point: DVec3) -> f64 {
    self.0
  }
}

/// Spiral galaxy in the XZ plane, Y up.
///
/// ```text
/// disc  = exp(-r / scale_length) * exp(-|y| / scale_height) * arms(r, theta)
/// bulge = bulge_weight * exp(-|p|^2 / (2 * bulge_radius^2))
/// density = core_density * (disc + bulge)
/// ```
#[derive(Clone, Debug)]
pub struct DiscGalaxyDensity {
  pub core_density: f64,
  pub scale_length: f64,
  pub scale_height: f64,
  pub bulge_radius: f64,
  pub bulge_weight: f64,
  pub arm_count: u32,
  pub arm_pitch: f64,
  pub arm_contrast: f64,
}

impl DiscGalaxyDensity {
  /// Arm modulation in `[1 - contrast, 1]`.
  fn arms(&self, radius: f64, theta: f64) -> f64 {
    if self.arm_count == 0 || self.arm_contrast <= 0.0 {
      return 1.0;
    }
    // Logarithmic spiral: theta = ln(r) / tan(pitch) + offset.
    let winding = radius.max(1.0).ln() / self.arm_pitch.tan();
    let wave = 0.5 + 0.5 * (self.arm_count as f64 * (theta - winding)).cos();
    let contrast = self.arm_contrast.clamp(0.0, 1.0);
    1.0 - contrast + contrast * wave * wave
  }
}

impl DensityField for DiscGalaxyDensity {
  fn density(&self, point: DVec3) -> f64 {
    let radius = (point.x * point.x + point.z * point.z).sqrt();
    let theta = point.z.atan2(point.x).rem_euclid(TAU);

    let disc = (-radius / self.scale_length).exp()
      * (-point.y.abs() / self.scale_height).exp()
      * self.arms(radius, theta);
    let bulge_radius_sq = 2.0 * self.bulge_radius * self.bulge_radius;
    let bulge = self.bulge_weight * (-point.length_squared() / bulge_radius_sq).exp();

    self.core_density * (disc + bulge)
  }
}

/// Build the field described by `config`.
pub fn density_from_config(config: &DensityConfig) -> Arc<dyn DensityField> {
  match *config {
    DensityConfig::Uniform { density } => Arc::new(UniformDensity(density)),
    DensityConfig::Disc {
      core_density,
      scale_length,
      scale_height,
      bulge_radius,
      bulge_weight,
      arm_count,
      arm_pitch,
      arm_contrast,
    } => Arc::new(DiscGalaxyDensity {
      core_density,
      scale_length,
      scale_height,
      bulge_radius,
      bulge_weight,
      arm_count,
      arm_pitch,
      arm_contrast,
    }),
  }
}

/// Density statistics over a box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DensityEstimate {
  pub mean: f64,
  pub max: f64,
}

/// Sample a `3x3x3` lattice spanning `bounds`, corners included.
pub fn estimate_density(field: &dyn DensityField, bounds: &DAabb3) -> DensityEstimate {
  let step = 1.0 / (LATTICE_SAMPLES - 1) as f64;
  let mut sum = 0.0;
  let mut max = 0.0f64;

  for z in 0..LATTICE_SAMPLES {
    for y in 0..LATTICE_SAMPLES {
      for x in 0..LATTICE_SAMPLES {
        let t = DVec3::new(x as f64, y as f64, z as f64) * step;
        let value = field.density(bounds.lerp(t)).max(0.0);
        sum += value;
        max = max.max(value);
      }
    }
  }

  DensityEstimate {
    mean: sum / LATTICE_SAMPLES.pow(3) as f64,
    max,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn disc() -> DiscGalaxyDensity {
    DiscGalaxyDensity {
      core_density: 2.0e-3,
      scale_length: 6000.0,
      scale_height: 300.0,
      bulge_radius: 1500.0,
      bulge_weight: 2.0,
      arm_count: 2,
      arm_pitch: 0.22,
      arm_contrast: 0.6,
    }
  }

  #[test]
  fn test_uniform_estimate() {
    let bounds = DAabb3::new(DVec3::ZERO, DVec3::splat(10.0));
    let estimate = estimate_density(&UniformDensity(0.5), &bounds);
    assert_eq!(estimate, DensityEstimate { mean: 0.5, max: 0.5 });
  }

  #[test]
  fn test_closure_field() {
    let field = |p: DVec3| p.x;
    let bounds = DAabb3::new(DVec3::ZERO, DVec3::splat(2.0));
    let estimate = estimate_density(&field, &bounds);
    assert_eq!(estimate.max, 2.0);
    assert!((estimate.mean - 1.0).abs() < 1e-12);
  }

  #[test]
  fn test_negative_density_is_clamped() {
    let bounds = DAabb3::new(DVec3::ZERO, DVec3::ONE);
    let estimate = estimate_density(&|_: DVec3| -1.0, &bounds);
    assert_eq!(estimate, DensityEstimate { mean: 0.0, max: 0.0 });
  }

  #[test]
  fn test_disc_falls_off() {
    let field = disc();
    let center = field.density(DVec3::ZERO);
    assert!(center > 0.0);
    assert!(field.density(DVec3::new(20_000.0, 0.0, 0.0)) < center * 0.05);
    let in_plane = field.density(DVec3::new(3000.0, 0.0, 0.0));
    assert!(field.density(DVec3::new(3000.0, 2000.0, 0.0)) < in_plane);
  }

  #[test]
  fn test_config_builds_matching_field() {
    let field = density_from_config(&DensityConfig::default());
    for point in [DVec3::ZERO, DVec3::new(3000.0, 40.0, -1200.0)] {
      assert_eq!(field.density(point), disc().density(point));
    }

    let uniform = density_from_config(&DensityConfig::Uniform { density: 0.25 });
    assert_eq!(uniform.density(DVec3::new(1.0, 2.0, 3.0)), 0.25);
  }

  #[test]
  fn test_arms_modulate_between_bounds() {
    let field = disc();
    let contrast = field.arm_contrast;
    for i in 0..64 {
      let theta = i as f64 / 64.0 * TAU;
      let arms = field.arms(5000.0, theta);
      assert!((1.0 - contrast - 1e-12..=1.0 + 1e-12).contains(&arms));
    }
  }
}
