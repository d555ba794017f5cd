//! Procedural content.
//!
//! Two phases, both pure functions of the universe seed:
//!
//! 1. **Placement** - [`GalaxyGenerationLayer`]s fill a sector with
//!    [`InitialElement`]s (position, summary, seed).
//! 2. **Synthesis** - on demand, [`StarSystemGenerator`] expands one element
//!    into a [`StarSystem`] orbit tree.
//!
//! # Module Structure
//!
//! - [`seed`]: seed mixing and sampling helpers
//! - [`density`]: `DensityField` and the built-in fields
//! - [`stellar`]: `Star`, `StellarClass`, `StarSystemInfo`
//! - [`layer`]: `GalaxyGenerationLayer`, `StarLayer`, `InitialElement`
//! - [`system`]: orbit tree types
//! - [`generator`]: `StarSystemGenerator`
//! - [`galaxy`]: `Galaxy`, tying the above together

pub mod density;
pub mod galaxy;
pub mod generator;
pub mod layer;
pub mod seed;
pub mod stellar;
pub mod system;

// Re-exports
pub use density::{
  density_from_config, estimate_density, DensityEstimate, DensityField, DiscGalaxyDensity,
  UniformDensity,
};
pub use galaxy::Galaxy;
pub use generator::StarSystemGenerator;
pub use layer::{GalaxyGenerationLayer, GenerationContext, InitialElement, StarLayer};
pub use seed::{mix64, sector_seed, GalaxyRng, SeedBuilder};
pub use stellar::{Star, StarSystemInfo, StellarClass};
pub use system::{
  BinaryPair, NodeKind, Orbit, Planet, Satellite, StarSystem, SystemNode,
  EARTH_MASSES_PER_SOLAR_MASS,
};
