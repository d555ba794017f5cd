//! StarSystemGenerator - builds the full orbit tree of one system.
//!
//! # Pipeline
//!
//! ```text
//! StarSystemInfo + seed
//!   → merge stars one by one        (P-type outer orbit or S-type recursion)
//!   → place planets per node        (geometric slots up to the stability limit)
//!   → assign orbital planes         (coplanar inside the threshold, random outside)
//!   → StarSystem
//! ```
//!
//! # Stability limits
//!
//! Every node has a limit on the radius of anything orbiting it. The root
//! gets `max_system_radius`; the members of a binary with separation `d` get
//! `d / binary_spacing_factor`. Circumbinary orbits start at
//! `binary_spacing_factor * d`.

use std::f64::consts::TAU;

use glam::{DQuat, DVec3};
use rand::seq::SliceRandom;
use rand::Rng;
use smallvec::SmallVec;

use super::seed::{sample_log_range, sample_range, system_rng, GalaxyRng};
use super::stellar::{Star, StarSystemInfo};
use super::system::{
  BinaryPair, NodeKind, Orbit, Planet, Satellite, StarSystem, SystemNode,
  EARTH_MASSES_PER_SOLAR_MASS,
};
use crate::config::SystemConfig;
use crate::error::GenerationError;

/// Eccentricity ranges.
const BINARY_ECCENTRICITY_MAX: f64 = 0.4;
const PLANET_ECCENTRICITY_MAX: f64 = 0.1;

/// Ways to add a star to an existing tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MergeStrategy {
  /// New outer binary around the whole node.
  Outer,
  /// Recurse into member `a` of a binary node.
  InnerA,
  /// Recurse into member `b` of a binary node.
  InnerB,
}

/// Full system synthesis.
#[derive(Clone, Debug, Default)]
pub struct StarSystemGenerator {
  config: SystemConfig,
}

impl StarSystemGenerator {
  pub fn new(config: SystemConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &SystemConfig {
    &self.config
  }

  /// Radius inside which nothing else may orbit a star.
  #[inline]
  pub fn exclusion_radius(&self, star: &Star) -> f64 {
    self.config.exclusion_radius_scale * star.mass.sqrt()
  }

  /// Radius a node occupies before any satellites are added.
  pub fn outer_radius(&self, node: &SystemNode) -> f64 {
    match &node.kind {
      NodeKind::Star(star) => self.exclusion_radius(star),
      NodeKind::Binary(pair) => pair.orbit.apoapsis(),
      NodeKind::Planet(_) => 0.0,
    }
  }

  /// Deterministically synthesise the system described by `info`.
  pub fn generate(&self, info: &StarSystemInfo, seed: u64) -> StarSystem {
    let _span =
      tracing::debug_span!("generate_system", seed, stars = info.stars.len()).entered();
    let mut rng = system_rng(seed);

    let mut stars = info.stars.iter();
    let Some(first) = stars.next() else {
      return StarSystem {
        info: info.clone(),
        seed,
        root: None,
        star_count: 0,
        planet_count: 0,
        skipped_stars: 0,
      };
    };

    let mut root = SystemNode::star(first.clone());
    let mut skipped_stars = 0;
    for star in stars {
      match self.merge_star(&root, star, &mut rng) {
        Ok(merged) => root = merged,
        Err(err) => {
          tracing::warn!(system = %info.name, %err, "skipping star");
          skipped_stars += 1;
        }
      }
    }

    let mut budget = info.remaining_mass * EARTH_MASSES_PER_SOLAR_MASS;
    let limit = self.config.max_system_radius;
    self.place_planets(&mut root, limit, &mut budget, &mut rng);
    self.assign_planes(&mut root, DVec3::Y, limit, &mut rng);

    let star_count = root
      .iter()
      .filter(|node| matches!(node.kind, NodeKind::Star(_)))
      .count();
    let planet_count = root
      .iter()
      .filter(|node| matches!(node.kind, NodeKind::Planet(_)))
      .count();

    StarSystem {
      info: info.clone(),
      seed,
      root: Some(root),
      star_count,
      planet_count,
      skipped_stars,
    }
  }

  /// Add `star` to the tree under `root`.
  ///
  /// The tree is rebuilt rather than edited, so on `Err` the caller's
  /// `root` is exactly as it was.
  pub fn merge_star(
    &self,
    root: &SystemNode,
    star: &Star,
    rng: &mut GalaxyRng,
  ) -> Result<SystemNode, GenerationError> {
    self
      .merge_into(root, star, self.config.max_system_radius, rng)
      .ok_or(GenerationError::NoValidOrbit { mass: star.mass })
  }

  fn merge_into(
    &self,
    node: &SystemNode,
    star: &Star,
    limit: f64,
    rng: &mut GalaxyRng,
  ) -> Option<SystemNode> {
    let mut strategies: SmallVec<[MergeStrategy; 3]> = SmallVec::new();
    strategies.push(MergeStrategy::Outer);
    if node.as_binary().is_some() {
      strategies.push(MergeStrategy::InnerA);
      strategies.push(MergeStrategy::InnerB);
    }
    strategies.shuffle(rng);

    let spacing = self.config.binary_spacing_factor;
    for strategy in strategies {
      match strategy {
        MergeStrategy::Outer => {
          let min = spacing * self.outer_radius(node).max(self.exclusion_radius(star));
          let Some(separation) = sample_log_range(rng, min, limit) else {
            continue;
          };
          let orbit = self.random_orbit(separation, BINARY_ECCENTRICITY_MAX, rng);
          return Some(SystemNode::binary(
            node.clone(),
            SystemNode::star(star.clone()),
            orbit,
          ));
        }
        MergeStrategy::InnerA | MergeStrategy::InnerB => {
          let Some(pair) = node.as_binary() else {
            continue;
          };
          let inner_limit = pair.orbit.semi_major_axis / spacing;
          let (target, other) = if strategy == MergeStrategy::InnerA {
            (&pair.a, &pair.b)
          } else {
            (&pair.b, &pair.a)
          };
          let Some(merged) = self.merge_into(target, star, inner_limit, rng) else {
            continue;
          };
          let (a, b) = if strategy == MergeStrategy::InnerA {
            (merged, other.clone())
          } else {
            (other.clone(), merged)
          };
          return Some(SystemNode {
            kind: NodeKind::Binary(Box::new(BinaryPair {
              a,
              b,
              orbit: pair.orbit.clone(),
            })),
            satellites: node.satellites.clone(),
          });
        }
      }
    }
    None
  }

  /// Fill orbital slots around every node with planets, drawing from
  /// `budget` (Earth masses).
  pub fn place_planets(
    &self,
    node: &mut SystemNode,
    limit: f64,
    budget: &mut f64,
    rng: &mut GalaxyRng,
  ) {
    let spacing = self.config.binary_spacing_factor;
    let inner_edge = match &mut node.kind {
      NodeKind::Star(star) => self.exclusion_radius(star),
      NodeKind::Binary(pair) => {
        let inner_limit = pair.orbit.semi_major_axis / spacing;
        self.place_planets(&mut pair.a, inner_limit, budget, rng);
        self.place_planets(&mut pair.b, inner_limit, budget, rng);
        spacing * pair.orbit.apoapsis()
      }
      NodeKind::Planet(_) => return,
    };

    let config = &self.config;
    let mut radius = inner_edge * self.slot_step(rng);
    while radius.is_finite() && radius <= limit && node.satellites.len() < config.max_planets_per_node {
      if *budget < config.planet_mass_min {
        break;
      }
      if rng.random_bool(config.planet_slot_chance) {
        let max_mass = config.planet_mass_max.min(*budget);
        if let Some(mass) = sample_log_range(rng, config.planet_mass_min, max_mass) {
          *budget -= mass;
          let orbit = self.random_orbit(radius, PLANET_ECCENTRICITY_MAX, rng);
          node.satellites.push(Satellite {
            node: SystemNode::planet(Planet::from_mass(mass)),
            orbit,
          });
        }
      }
      radius *= self.slot_step(rng);
    }
  }

  /// Choose an orbital plane for every orbit below `node`.
  pub fn assign_planes(
    &self,
    node: &mut SystemNode,
    parent_normal: DVec3,
    limit: f64,
    rng: &mut GalaxyRng,
  ) {
    let spacing = self.config.binary_spacing_factor;
    let node_normal = match &mut node.kind {
      NodeKind::Binary(pair) => {
        let normal = self.orbit_plane(pair.orbit.semi_major_axis, parent_normal, limit, rng);
        pair.orbit.normal = normal;
        let inner_limit = pair.orbit.semi_major_axis / spacing;
        self.assign_planes(&mut pair.a, normal, inner_limit, rng);
        self.assign_planes(&mut pair.b, normal, inner_limit, rng);
        normal
      }
      NodeKind::Star(_) | NodeKind::Planet(_) => parent_normal,
    };

    for satellite in &mut node.satellites {
      satellite.orbit.normal =
        self.orbit_plane(satellite.orbit.semi_major_axis, node_normal, limit, rng);
      let child_limit = satellite.orbit.semi_major_axis / spacing;
      self.assign_planes(&mut satellite.node, satellite.orbit.normal, child_limit, rng);
    }
  }

  /// Tight orbits inherit the parent plane with a small tilt; wide ones get
  /// an independent plane.
  fn orbit_plane(&self, radius: f64, parent: DVec3, limit: f64, rng: &mut GalaxyRng) -> DVec3 {
    if radius < self.config.coplanar_threshold * limit {
      let tilt = sample_range(rng, 0.0, self.config.max_plane_perturbation).unwrap_or(0.0);
      let spin = DQuat::from_axis_angle(parent, rng.random_range(0.0..TAU));
      let axis = spin * parent.any_orthonormal_vector();
      (DQuat::from_axis_angle(axis, tilt) * parent).normalize()
    } else {
      random_unit_vector(rng)
    }
  }

  fn slot_step(&self, rng: &mut GalaxyRng) -> f64 {
    sample_range(rng, self.config.slot_spacing_min, self.config.slot_spacing_max)
      .unwrap_or(self.config.slot_spacing_min)
  }

  fn random_orbit(
    &self,
    semi_major_axis: f64,
    eccentricity_max: f64,
    rng: &mut GalaxyRng,
  ) -> Orbit {
    Orbit::new(
      semi_major_axis,
      rng.random_range(0.0..=eccentricity_max),
      rng.random_range(0.0..TAU),
      rng.random_range(0.0..TAU),
    )
  }
}

/// Uniformly distributed direction.
fn random_unit_vector(rng: &mut impl Rng) -> DVec3 {
  let y: f64 = rng.random_range(-1.0..=1.0);
  let phi: f64 = rng.random_range(0.0..TAU);
  let r = (1.0 - y * y).max(0.0).sqrt();
  DVec3::new(r * phi.cos(), y, r * phi.sin())
}

#[cfg(test)]
#[path = "generator_test.rs"]
mod generator_test;
