//! Hierarchical star system model.
//!
//! ```text
//! SystemNode
//! ├─ kind: Star | Binary(BinaryPair) | Planet
//! └─ satellites: [Satellite { node, orbit }]
//!
//! BinaryPair { a, b, orbit }   a and b orbit their common barycenter
//! ```
//!
//! Satellites of a binary node are circumbinary (P-type); satellites of a
//! member of a binary are S-type.

use glam::DVec3;

use super::stellar::{Star, StarSystemInfo};

/// Earth masses per solar mass.
pub const EARTH_MASSES_PER_SOLAR_MASS: f64 = 332_946.0;

/// Keplerian orbit elements. Distances in AU, angles in radians.
#[derive(Clone, Debug, PartialEq)]
pub struct Orbit {
  pub semi_major_axis: f64,
  pub eccentricity: f64,
  /// Unit normal of the orbital plane.
  pub normal: DVec3,
  pub periapsis_angle: f64,
  /// Mean anomaly at epoch.
  pub phase: f64,
}

impl Orbit {
  /// Orbit in the reference plane. Planes are assigned after the whole tree
  /// is built.
  pub fn new(semi_major_axis: f64, eccentricity: f64, periapsis_angle: f64, phase: f64) -> Self {
    Self {
      semi_major_axis,
      eccentricity,
      normal: DVec3::Y,
      periapsis_angle,
      phase,
    }
  }

  #[inline]
  pub fn periapsis(&self) -> f64 {
    self.semi_major_axis * (1.0 - self.eccentricity)
  }

  #[inline]
  pub fn apoapsis(&self) -> f64 {
    self.semi_major_axis * (1.0 + self.eccentricity)
  }
}

/// A planet. Mass in Earth masses, radius in Earth radii.
#[derive(Clone, Debug, PartialEq)]
pub struct Planet {
  pub mass: f64,
  pub radius: f64,
}

impl Planet {
  /// Rough mass-radius relation: rocky, then gaseous, then degenerate.
  pub fn from_mass(mass: f64) -> Self {
    let radius = if mass < 2.0 {
      mass.powf(0.28)
    } else {
      (0.8 * mass.powf(0.59)).min(11.0)
    };
    Self { mass, radius }
  }
}

/// Two nodes orbiting each other.
#[derive(Clone, Debug, PartialEq)]
pub struct BinaryPair {
  pub a: SystemNode,
  pub b: SystemNode,
  /// Mutual orbit. `semi_major_axis` is the separation of the pair.
  pub orbit: Orbit,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
  Star(Star),
  Binary(Box<BinaryPair>),
  Planet(Planet),
}

/// A node orbiting its parent node.
#[derive(Clone, Debug, PartialEq)]
pub struct Satellite {
  pub node: SystemNode,
  pub orbit: Orbit,
}

/// One node of the orbit tree.
#[derive(Clone, Debug, PartialEq)]
pub struct SystemNode {
  pub kind: NodeKind,
  pub satellites: Vec<Satellite>,
}

impl SystemNode {
  pub fn star(star: Star) -> Self {
    Self {
      kind: NodeKind::Star(star),
      satellites: Vec::new(),
    }
  }

  pub fn binary(a: SystemNode, b: SystemNode, orbit: Orbit) -> Self {
    Self {
      kind: NodeKind::Binary(Box::new(BinaryPair { a, b, orbit })),
      satellites: Vec::new(),
    }
  }

  pub fn planet(planet: Planet) -> Self {
    Self {
      kind: NodeKind::Planet(planet),
      satellites: Vec::new(),
    }
  }

  pub fn as_binary(&self) -> Option<&BinaryPair> {
    match &self.kind {
      NodeKind::Binary(pair) => Some(pair),
      _ => None,
    }
  }

  /// Mass of this node and everything orbiting it, in solar masses.
  pub fn mass(&self) -> f64 {
    let own = match &self.kind {
      NodeKind::Star(star) => star.mass,
      NodeKind::Binary(pair) => pair.a.mass() + pair.b.mass(),
      NodeKind::Planet(planet) => planet.mass / EARTH_MASSES_PER_SOLAR_MASS,
    };
    own + self.satellites.iter().map(|s| s.node.mass()).sum::<f64>()
  }

  /// Depth-first walk over this node and all descendants.
  pub fn iter(&self) -> NodeIter<'_> {
    NodeIter { stack: vec![self] }
  }
}

/// Iterator returned by [`SystemNode::iter`].
pub struct NodeIter<'a> {
  stack: Vec<&'a SystemNode>,
}

impl<'a> Iterator for NodeIter<'a> {
  type Item = &'a SystemNode;

  fn next(&mut self) -> Option<Self::Item> {
    let node = self.stack.pop()?;
    self.stack.extend(node.satellites.iter().rev().map(|s| &s.node));
    if let NodeKind::Binary(pair) = &node.kind {
      self.stack.push(&pair.b);
      self.stack.push(&pair.a);
    }
    Some(node)
  }
}

/// A fully synthesised star system.
#[derive(Clone, Debug, PartialEq)]
pub struct StarSystem {
  pub info: StarSystemInfo,
  pub seed: u64,
  /// `None` only for an info without stars.
  pub root: Option<SystemNode>,
  pub star_count: usize,
  pub planet_count: usize,
  /// Stars from `info` that found no stable orbit.
  pub skipped_stars: usize,
}

impl StarSystem {
  pub fn nodes(&self) -> impl Iterator<Item = &SystemNode> {
    self.root.iter().flat_map(SystemNode::iter)
  }

  pub fn iter_stars(&self) -> impl Iterator<Item = &Star> {
    self.nodes().filter_map(|node| match &node.kind {
      NodeKind::Star(star) => Some(star),
      _ => None,
    })
  }

  pub fn iter_planets(&self) -> impl Iterator<Item = &Planet> {
    self.nodes().filter_map(|node| match &node.kind {
      NodeKind::Planet(planet) => Some(planet),
      _ => None,
    })
  }

  /// Total mass in solar masses.
  pub fn total_mass(&self) -> f64 {
    self.root.as_ref().map_or(0.0, SystemNode::mass)
  }
}
