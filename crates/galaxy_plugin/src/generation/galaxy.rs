//! Galaxy - the seeded generator the sector manager drives.

use std::sync::Arc;

use super::density::{density_from_config, DensityField};
use super::generator::StarSystemGenerator;
use super::layer::{GalaxyGenerationLayer, GenerationContext, InitialElement, StarLayer};
use super::system::StarSystem;
use crate::config::GalaxyConfig;
use crate::sector::SectorPos;

/// Universe seed, density field, layers and system generator.
///
/// Stateless after construction; shared between worker threads through an
/// `Arc`.
pub struct Galaxy {
  seed: u64,
  density: Arc<dyn DensityField>,
  layers: Vec<Box<dyn GalaxyGenerationLayer>>,
  system_generator: StarSystemGenerator,
}

impl Galaxy {
  pub fn new(
    seed: u64,
    density: Arc<dyn DensityField>,
    layers: Vec<Box<dyn GalaxyGenerationLayer>>,
    system_generator: StarSystemGenerator,
  ) -> Self {
    Self {
      seed,
      density,
      layers,
      system_generator,
    }
  }

  /// Galaxy with one [`StarLayer`] per configured layer.
  pub fn from_config(config: &GalaxyConfig) -> Self {
    let layers = config
      .layers
      .iter()
      .cloned()
      .map(|layer| Box::new(StarLayer::new(layer)) as Box<dyn GalaxyGenerationLayer>)
      .collect();
    Self::new(
      config.seed,
      density_from_config(&config.density),
      layers,
      StarSystemGenerator::new(config.systems.clone()),
    )
  }

  #[inline]
  pub fn seed(&self) -> u64 {
    self.seed
  }

  pub fn density(&self) -> &dyn DensityField {
    self.density.as_ref()
  }

  pub fn layers(&self) -> &[Box<dyn GalaxyGenerationLayer>] {
    &self.layers
  }

  pub fn system_generator(&self) -> &StarSystemGenerator {
    &self.system_generator
  }

  /// Initial elements of `pos`: every layer of that level, in layer order.
  pub fn generate_sector(&self, pos: &SectorPos) -> Vec<InitialElement> {
    let _span = tracing::trace_span!("generate_sector", level = pos.level).entered();
    let ctx = GenerationContext {
      universe_seed: self.seed,
      density: self.density.as_ref(),
      systems: self.system_generator.config(),
    };

    let mut elements = Vec::new();
    for layer in self.layers.iter().filter(|layer| layer.level() == pos.level) {
      layer.generate(&ctx, pos, &mut elements);
    }
    elements
  }

  /// Full orbit tree of `element`.
  pub fn generate_system(&self, element: &InitialElement) -> StarSystem {
    self.system_generator.generate(&element.info, element.seed)
  }
}

impl std::fmt::Debug for Galaxy {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Galaxy")
      .field("seed", &self.seed)
      .field("layers", &self.layers.len())
      .field("system_generator", &self.system_generator)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use glam::IVec3;

  use super::*;
  use crate::config::{DensityConfig, LayerConfig};

  fn uniform_config(seed: u64) -> GalaxyConfig {
    GalaxyConfig {
      seed,
      density: DensityConfig::Uniform { density: 1.0e-3 },
      layers: vec![
        LayerConfig {
          id: 0,
          level: 0,
          density_scale: 1.0,
          ..LayerConfig::default()
        },
        LayerConfig {
          id: 1,
          level: 0,
          density_scale: 0.5,
          ..LayerConfig::default()
        },
        LayerConfig {
          id: 2,
          level: 3,
          density_scale: 0.01,
          ..LayerConfig::default()
        },
      ],
      ..GalaxyConfig::default()
    }
  }

  #[test]
  fn test_sector_uses_layers_of_its_level() {
    let galaxy = Galaxy::from_config(&uniform_config(1));
    let level0 = galaxy.generate_sector(&SectorPos::new(0, IVec3::ZERO));
    assert!(level0.iter().all(|e| e.layer_id == 0 || e.layer_id == 1));
    assert!(level0.iter().any(|e| e.layer_id == 0));

    let level3 = galaxy.generate_sector(&SectorPos::new(3, IVec3::ZERO));
    assert!(level3.iter().all(|e| e.layer_id == 2));

    // No layer on level 5.
    assert!(galaxy.generate_sector(&SectorPos::new(5, IVec3::ZERO)).is_empty());
  }

  #[test]
  fn test_independent_instances_agree() {
    let a = Galaxy::from_config(&uniform_config(42));
    let b = Galaxy::from_config(&uniform_config(42));
    let pos = SectorPos::new(0, IVec3::new(-3, 7, 1));

    let elements = a.generate_sector(&pos);
    assert_eq!(elements, b.generate_sector(&pos));
    for element in &elements {
      assert_eq!(a.generate_system(element), b.generate_system(element));
    }
  }
}
