use super::*;

fn star(mass: f64) -> Star {
  Star::evolve(mass, 1.0)
}

fn info(stars: &[f64], remaining_mass: f64) -> StarSystemInfo {
  StarSystemInfo {
    name: "Test".into(),
    age: 1.0,
    stars: stars.iter().map(|&m| star(m)).collect(),
    remaining_mass,
  }
}

/// Every orbit in the tree, binaries included.
fn orbits(node: &SystemNode) -> Vec<&Orbit> {
  let mut out = Vec::new();
  collect_orbits(node, &mut out);
  out
}

fn collect_orbits<'a>(node: &'a SystemNode, out: &mut Vec<&'a Orbit>) {
  if let NodeKind::Binary(pair) = &node.kind {
    out.push(&pair.orbit);
    collect_orbits(&pair.a, out);
    collect_orbits(&pair.b, out);
  }
  for satellite in &node.satellites {
    out.push(&satellite.orbit);
    collect_orbits(&satellite.node, out);
  }
}

// =========================================================================
// Star merging
// =========================================================================

#[test]
fn test_merge_without_valid_range_leaves_tree_unchanged() {
  // spacing * exclusion = 3 * 10 = 30 AU, but the system may only reach 20.
  let generator = StarSystemGenerator::new(SystemConfig {
    binary_spacing_factor: 3.0,
    exclusion_radius_scale: 10.0,
    max_system_radius: 20.0,
    ..SystemConfig::default()
  });
  let root = SystemNode::star(star(1.0));
  let original = root.clone();
  let mut rng = system_rng(1);

  let result = generator.merge_star(&root, &star(1.0), &mut rng);

  assert_eq!(result, Err(GenerationError::NoValidOrbit { mass: 1.0 }));
  assert_eq!(root, original);
}

#[test]
fn test_unbounded_radius_skips_instead_of_panicking() {
  let generator = StarSystemGenerator::new(SystemConfig {
    max_system_radius: f64::INFINITY,
    slot_spacing_max: f64::INFINITY,
    planet_slot_chance: 0.0,
    ..SystemConfig::default()
  });

  let system = generator.generate(&info(&[1.0, 0.5], 0.01), 1);
  assert_eq!(system.star_count, 1);
  assert_eq!(system.skipped_stars, 1);
  assert_eq!(system.planet_count, 0);
}

#[test]
fn test_merge_second_star_forms_binary() {
  let generator = StarSystemGenerator::default();
  let config = generator.config().clone();
  let root = SystemNode::star(star(1.0));

  for seed in 0..32 {
    let mut rng = system_rng(seed);
    let merged = generator
      .merge_star(&root, &star(0.5), &mut rng)
      .expect("plenty of room");
    let pair = merged.as_binary().expect("binary root");

    let min = config.binary_spacing_factor * config.exclusion_radius_scale;
    let separation = pair.orbit.semi_major_axis;
    assert!(separation >= min - 1e-9 && separation <= config.max_system_radius + 1e-9);
    assert_eq!(pair.a, root);
    assert!(matches!(&pair.b.kind, NodeKind::Star(s) if s.mass == star(0.5).mass));
  }
}

#[test]
fn test_merge_falls_back_to_inner_orbit() {
  // The outer orbit would need 3 * 1000 AU but the system ends at 1500 AU.
  let generator = StarSystemGenerator::new(SystemConfig {
    max_system_radius: 1500.0,
    ..SystemConfig::default()
  });
  let root = SystemNode::binary(
    SystemNode::star(star(1.0)),
    SystemNode::star(star(0.8)),
    Orbit::new(1000.0, 0.0, 0.0, 0.0),
  );

  for seed in 0..32 {
    let mut rng = system_rng(seed);
    let merged = generator
      .merge_star(&root, &star(0.3), &mut rng)
      .expect("inner orbits have room");
    let pair = merged.as_binary().expect("still a binary");

    assert_eq!(pair.orbit.semi_major_axis, 1000.0);
    let inner = [&pair.a, &pair.b]
      .into_iter()
      .filter_map(|node| node.as_binary())
      .collect::<Vec<_>>();
    assert_eq!(inner.len(), 1, "exactly one member became a binary");
    assert!(inner[0].orbit.semi_major_axis <= 1000.0 / 3.0 + 1e-9);
  }
}

#[test]
fn test_merge_failure_in_every_branch_is_an_error() {
  // Neither the outer orbit nor either member has room for a new star.
  let generator = StarSystemGenerator::new(SystemConfig {
    exclusion_radius_scale: 1.0,
    max_system_radius: 4.0,
    ..SystemConfig::default()
  });
  let root = SystemNode::binary(
    SystemNode::star(star(1.0)),
    SystemNode::star(star(1.0)),
    Orbit::new(3.5, 0.0, 0.0, 0.0),
  );
  let original = root.clone();

  let mut rng = system_rng(9);
  assert!(generator.merge_star(&root, &star(1.0), &mut rng).is_err());
  assert_eq!(root, original);
}

// =========================================================================
// Full synthesis
// =========================================================================

#[test]
fn test_generate_is_deterministic() {
  let generator = StarSystemGenerator::default();
  let info = info(&[1.2, 0.6, 0.3], 0.005);

  let a = generator.generate(&info, 1234);
  let b = generator.generate(&info, 1234);
  assert_eq!(a, b);
}

#[test]
fn test_star_counts_add_up() {
  let generator = StarSystemGenerator::default();
  for seed in 0..64 {
    let info = StarSystemInfo::roll(&mut system_rng(seed), 0.1, 10.0, 0.1, 13.0);
    let system = generator.generate(&info, seed);

    assert_eq!(system.star_count + system.skipped_stars, info.stars.len());
    assert_eq!(system.iter_stars().count(), system.star_count);
    assert_eq!(system.iter_planets().count(), system.planet_count);
  }
}

#[test]
fn test_empty_info_has_no_root() {
  let system = StarSystemGenerator::default().generate(&info(&[], 0.01), 5);
  assert!(system.root.is_none());
  assert_eq!(system.total_mass(), 0.0);
}

#[test]
fn test_planets_respect_budget_and_limits() {
  let generator = StarSystemGenerator::default();
  let config = generator.config().clone();

  for seed in 0..64 {
    let info = info(&[1.0], 0.003);
    let system = generator.generate(&info, seed);
    let root = system.root.as_ref().expect("one star");

    let planet_mass: f64 = system.iter_planets().map(|p| p.mass).sum();
    assert!(planet_mass <= info.remaining_mass * EARTH_MASSES_PER_SOLAR_MASS + 1e-6);
    assert!(root.satellites.len() <= config.max_planets_per_node);

    let inner_edge = generator.exclusion_radius(&info.stars[0]);
    for satellite in &root.satellites {
      let radius = satellite.orbit.semi_major_axis;
      assert!(radius > inner_edge && radius <= config.max_system_radius);
      if let NodeKind::Planet(planet) = &satellite.node.kind {
        assert!(planet.mass >= config.planet_mass_min - 1e-9);
        assert!(planet.mass <= config.planet_mass_max + 1e-9);
      }
    }

    let radii: Vec<f64> = root.satellites.iter().map(|s| s.orbit.semi_major_axis).collect();
    assert!(radii.windows(2).all(|w| w[0] < w[1]), "slots move outwards");
  }
}

#[test]
fn test_no_planets_without_budget() {
  let system = StarSystemGenerator::default().generate(&info(&[1.0, 0.5], 0.0), 8);
  assert_eq!(system.planet_count, 0);
}

// =========================================================================
// Orbital planes
// =========================================================================

#[test]
fn test_coplanar_orbits_share_the_reference_plane() {
  let generator = StarSystemGenerator::new(SystemConfig {
    coplanar_threshold: 10.0,
    max_plane_perturbation: 0.0,
    ..SystemConfig::default()
  });

  for seed in 0..16 {
    let system = generator.generate(&info(&[1.0, 0.7, 0.4], 0.01), seed);
    let root = system.root.as_ref().expect("stars");
    for orbit in orbits(root) {
      assert!((orbit.normal - DVec3::Y).length() < 1e-9, "{:?}", orbit.normal);
    }
  }
}

#[test]
fn test_perturbed_orbits_stay_within_tilt() {
  let max_tilt = 0.05;
  let generator = StarSystemGenerator::new(SystemConfig {
    coplanar_threshold: 10.0,
    max_plane_perturbation: max_tilt,
    ..SystemConfig::default()
  });

  let system = generator.generate(&info(&[1.0], 0.01), 21);
  let root = system.root.as_ref().expect("star");
  // A single star's satellites tilt directly off the reference plane.
  for satellite in &root.satellites {
    let angle = satellite.orbit.normal.angle_between(DVec3::Y);
    assert!(angle <= max_tilt + 1e-9, "tilt {angle}");
  }
}

#[test]
fn test_wide_orbits_get_independent_planes() {
  let generator = StarSystemGenerator::new(SystemConfig {
    coplanar_threshold: 0.0,
    ..SystemConfig::default()
  });

  let mut tilted = 0;
  for seed in 0..16 {
    let system = generator.generate(&info(&[1.0, 0.5], 0.01), seed);
    let root = system.root.as_ref().expect("stars");
    for orbit in orbits(root) {
      assert!((orbit.normal.length() - 1.0).abs() < 1e-9);
      if orbit.normal.angle_between(DVec3::Y) > 0.1 {
        tilted += 1;
      }
    }
  }
  assert!(tilted > 0);
}
