//! GalaxyConfig - everything needed to reproduce a galaxy from its seed.
//!
//! All sections implement `Default`, and every field is `#[serde(default)]`,
//! so a TOML file only needs the values it overrides:
//!
//! ```toml
//! seed = 1234
//! worker_threads = 4
//!
//! [systems]
//! binary_spacing_factor = 4.0
//!
//! [[layers]]
//! id = 0
//! level = 0
//! density_scale = 1.0
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::constants::{BINARY_SYSTEM_SPACING_FACTOR, ROOT_LEVEL};
use crate::error::ConfigError;

/// Root configuration.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct GalaxyConfig {
  /// Universe seed. Every sector and system derives from it.
  pub seed: u64,
  /// Dedicated generation threads. 0 = use rayon's global pool.
  pub worker_threads: usize,
  /// Star density field.
  pub density: DensityConfig,
  /// Star placement layers, one or more per octree level.
  pub layers: Vec<LayerConfig>,
  /// Full system synthesis parameters.
  pub systems: SystemConfig,
}

impl Default for GalaxyConfig {
  fn default() -> Self {
    Self {
      seed: 0x6A1A_C71C,
      worker_threads: 0,
      density: DensityConfig::default(),
      layers: LayerConfig::default_layers(),
      systems: SystemConfig::default(),
    }
  }
}

impl GalaxyConfig {
  /// Load and validate configuration from a TOML file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_toml_str(&content)
  }

  /// Parse and validate configuration from TOML text.
  pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
    let config: GalaxyConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  /// Same galaxy shape with a different seed.
  #[must_use]
  pub fn with_seed(mut self, seed: u64) -> Self {
    self.seed = seed;
    self
  }

  /// Reject configurations that cannot generate a sensible galaxy.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.layers.is_empty() {
      return Err(ConfigError::Invalid("at least one layer is required".into()));
    }
    for layer in &self.layers {
      layer.validate()?;
    }
    for (i, a) in self.layers.iter().enumerate() {
      if self.layers[i + 1..].iter().any(|b| b.id == a.id) {
        return Err(ConfigError::Invalid(format!("duplicate layer id {}", a.id)));
      }
    }
    self.density.validate()?;
    self.systems.validate()
  }
}

/// Shape of the star density field.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DensityConfig {
  /// Same density everywhere.
  Uniform {
    /// Systems per cubic unit.
    density: f64,
  },
  /// Barred-free spiral: exponential disc, gaussian bulge, spiral arms.
  Disc {
    /// Systems per cubic unit at the galactic center.
    core_density: f64,
    /// Radial e-folding length of the disc.
    scale_length: f64,
    /// Vertical e-folding height of the disc.
    scale_height: f64,
    /// Gaussian radius of the central bulge.
    bulge_radius: f64,
    /// Bulge density relative to `core_density`.
    bulge_weight: f64,
    /// Number of spiral arms.
    arm_count: u32,
    /// Logarithmic spiral pitch angle in radians.
    arm_pitch: f64,
    /// 0 = no arms, 1 = no stars between arms.
    arm_contrast: f64,
  },
}

impl Default for DensityConfig {
  fn default() -> Self {
    Self::Disc {
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
}

impl DensityConfig {
  fn validate(&self) -> Result<(), ConfigError> {
    let invalid = |msg: &str| Err(ConfigError::Invalid(format!("density: {msg}")));

    match *self {
      DensityConfig::Uniform { density } => {
        if !is_non_negative(density) {
          return invalid("density must be finite and non-negative");
        }
      }
      DensityConfig::Disc {
        core_density,
        scale_length,
        scale_height,
        bulge_radius,
        bulge_weight,
        arm_pitch,
        arm_contrast,
        ..
      } => {
        if ![core_density, scale_length, scale_height, bulge_radius]
          .into_iter()
          .all(is_positive)
        {
          return invalid("core_density and disc scale lengths must be finite and positive");
        }
        if !is_non_negative(bulge_weight) {
          return invalid("bulge_weight must be finite and non-negative");
        }
        if !(arm_pitch > 0.0 && arm_pitch < std::f64::consts::FRAC_PI_2) {
          return invalid("arm_pitch must lie in (0, pi/2)");
        }
        if !(0.0..=1.0).contains(&arm_contrast) {
          return invalid("arm_contrast must be within [0, 1]");
        }
      }
    }
    Ok(())
  }
}

/// One star placement layer.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayerConfig {
  /// Stored on every element this layer places.
  pub id: u32,
  /// Octree level whose sectors this layer populates.
  pub level: u8,
  /// Multiplier on the density field.
  pub density_scale: f64,
  /// Smallest system mass budget in solar masses.
  pub system_mass_min: f64,
  /// Largest system mass budget in solar masses.
  pub system_mass_max: f64,
  /// Upper bound on rejection sampling attempts per sector.
  pub max_attempts: u32,
}

impl Default for LayerConfig {
  fn default() -> Self {
    Self {
      id: 0,
      level: 0,
      density_scale: 1.0,
      system_mass_min: 0.08,
      system_mass_max: 1.5,
      max_attempts: 256,
    }
  }
}

impl LayerConfig {
  /// Dim stars on fine sectors, bright ones on coarse sectors so they are
  /// visible from further away.
  pub fn default_layers() -> Vec<Self> {
    vec![
      Self::default(),
      Self {
        id: 1,
        level: 2,
        density_scale: 0.02,
        system_mass_min: 1.5,
        system_mass_max: 8.0,
        max_attempts: 128,
      },
      Self {
        id: 2,
        level: 4,
        density_scale: 5.0e-4,
        system_mass_min: 8.0,
        system_mass_max: 60.0,
        max_attempts: 64,
      },
    ]
  }

  fn validate(&self) -> Result<(), ConfigError> {
    if self.level > ROOT_LEVEL {
      return Err(ConfigError::Invalid(format!(
        "layer {} level {} above root level {}",
        self.id, self.level, ROOT_LEVEL
      )));
    }
    if !is_positive(self.density_scale) {
      return Err(ConfigError::Invalid(format!(
        "layer {} density_scale must be positive",
        self.id
      )));
    }
    if !(is_positive(self.system_mass_min)
      && self.system_mass_min <= self.system_mass_max
      && self.system_mass_max.is_finite())
    {
      return Err(ConfigError::Invalid(format!(
        "layer {} system mass range [{}, {}] is empty",
        self.id, self.system_mass_min, self.system_mass_max
      )));
    }
    Ok(())
  }
}

/// Parameters for full system synthesis. Distances in AU, planet masses in
/// Earth masses, angles in radians.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SystemConfig {
  /// Ratio between an orbit and the widest stable orbit inside it.
  pub binary_spacing_factor: f64,
  /// Star exclusion radius per sqrt(solar mass).
  pub exclusion_radius_scale: f64,
  /// Stability limit of the outermost level of a system.
  pub max_system_radius: f64,
  /// System age range in billions of years.
  pub age_min: f64,
  pub age_max: f64,
  pub planet_mass_min: f64,
  pub planet_mass_max: f64,
  /// Chance that an orbital slot holds a planet.
  pub planet_slot_chance: f64,
  /// Geometric spacing between consecutive slots.
  pub slot_spacing_min: f64,
  pub slot_spacing_max: f64,
  /// Upper bound on planets around one node.
  pub max_planets_per_node: usize,
  /// Orbits inside `coplanar_threshold * stability_limit` share the parent
  /// plane; wider orbits get an independent plane.
  pub coplanar_threshold: f64,
  /// Largest tilt applied to a coplanar orbit.
  pub max_plane_perturbation: f64,
}

impl Default for SystemConfig {
  fn default() -> Self {
    Self {
      binary_spacing_factor: BINARY_SYSTEM_SPACING_FACTOR,
      exclusion_radius_scale: 0.1,
      max_system_radius: 5000.0,
      age_min: 0.1,
      age_max: 13.0,
      planet_mass_min: 0.05,
      planet_mass_max: 4000.0,
      planet_slot_chance: 0.7,
      slot_spacing_min: 1.4,
      slot_spacing_max: 2.1,
      max_planets_per_node: 12,
      coplanar_threshold: 0.5,
      max_plane_perturbation: 0.05,
    }
  }
}

impl SystemConfig {
  fn validate(&self) -> Result<(), ConfigError> {
    let invalid = |msg: &str| Err(ConfigError::Invalid(format!("systems: {msg}")));

    if !(self.binary_spacing_factor.is_finite() && self.binary_spacing_factor > 1.0) {
      return invalid("binary_spacing_factor must be finite and greater than 1");
    }
    if !is_positive(self.exclusion_radius_scale) || !is_positive(self.max_system_radius) {
      return invalid("exclusion_radius_scale and max_system_radius must be positive");
    }
    if !(self.age_min >= 0.0 && self.age_min <= self.age_max && self.age_max.is_finite()) {
      return invalid("age range is empty");
    }
    if !(is_positive(self.planet_mass_min)
      && self.planet_mass_min <= self.planet_mass_max
      && self.planet_mass_max.is_finite())
    {
      return invalid("planet mass range is empty");
    }
    if !(self.slot_spacing_min > 1.0
      && self.slot_spacing_min <= self.slot_spacing_max
      && self.slot_spacing_max.is_finite())
    {
      return invalid("slot spacing must be a finite increasing range above 1");
    }
    if !(0.0..=1.0).contains(&self.planet_slot_chance) {
      return invalid("planet_slot_chance must be within [0, 1]");
    }
    if !is_non_negative(self.coplanar_threshold) || !is_non_negative(self.max_plane_perturbation) {
      return invalid("coplanar_threshold and max_plane_perturbation must be finite and non-negative");
    }
    Ok(())
  }
}

/// Finite and strictly positive. Rejects NaN.
fn is_positive(value: f64) -> bool {
  value.is_finite() && value > 0.0
}

fn is_non_negative(value: f64) -> bool {
  value.is_finite() && value >= 0.0
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
