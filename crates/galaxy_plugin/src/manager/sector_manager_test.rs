use std::time::Duration;

use crossbeam_channel::Receiver;
use glam::{DVec3, IVec3};

use super::*;
use crate::config::{DensityConfig, LayerConfig};
use crate::generation::{GalaxyGenerationLayer, GenerationContext, StarSystemGenerator, UniformDensity};

// =============================================================================
// Helpers
// =============================================================================

/// Uniform field with one saturated level-0 layer: four systems per sector.
fn test_config() -> GalaxyConfig {
  GalaxyConfig {
    seed: 7,
    worker_threads: 2,
    density: DensityConfig::Uniform { density: 1.0e-3 },
    layers: vec![LayerConfig {
      id: 0,
      level: 0,
      ..LayerConfig::default()
    }],
    ..GalaxyConfig::default()
  }
}

fn manager() -> SectorManager {
  SectorManager::new(&test_config())
}

fn pos(level: u8, x: i32, y: i32, z: i32) -> SectorPos {
  SectorPos::new(level, IVec3::new(x, y, z))
}

/// Layer that blocks every generation until the test releases it.
struct GatedLayer {
  gate: Receiver<()>,
}

impl GalaxyGenerationLayer for GatedLayer {
  fn id(&self) -> u32 {
    9
  }

  fn level(&self) -> u8 {
    0
  }

  fn generate(&self, _ctx: &GenerationContext<'_>, _pos: &SectorPos, _out: &mut Vec<InitialElement>) {
    let _ = self.gate.recv();
  }
}

fn gated_manager() -> (SectorManager, crossbeam_channel::Sender<()>) {
  let (gate_tx, gate_rx) = crossbeam_channel::unbounded();
  let galaxy = Galaxy::new(
    1,
    Arc::new(UniformDensity(1.0e-3)),
    vec![Box::new(GatedLayer { gate: gate_rx })],
    StarSystemGenerator::default(),
  );
  (
    SectorManager::with_galaxy(Arc::new(galaxy), TaskExecutor::new(1)),
    gate_tx,
  )
}

/// Tick until `pos` is complete or the deadline passes.
fn tick_until_complete(manager: &mut SectorManager, pos: &SectorPos) -> bool {
  for _ in 0..5000 {
    manager.tick();
    if manager.is_complete(pos) {
      return true;
    }
    std::thread::sleep(Duration::from_millis(1));
  }
  false
}

// =============================================================================
// Sector tickets
// =============================================================================

#[test]
fn test_single_ticket_loads_on_tick() {
  let mut manager = manager();
  let target = pos(0, 1, 2, 3);
  let ticket = manager.create_sector_ticket(SectorTicketInfo::Single(target));
  assert!(!manager.is_loaded(&target), "nothing happens before a tick");

  let stats = manager.tick();
  assert_eq!(stats.sector_loads, 1);
  assert_eq!(stats.dispatched, 1);
  assert!(manager.is_loaded(&target));
  assert!(manager.get_sector(&target).is_none(), "not published yet");

  assert!(manager.force_load_sector(&target));
  let sector = manager.get_sector(&target).expect("complete after force-load");
  assert_eq!(sector.pos(), target);
  assert_eq!(sector.initial_elements().map(|e| e.len()), Some(4));
  assert_eq!(manager.ticket_info(&ticket), Some(&SectorTicketInfo::Single(target)));
}

#[test]
fn test_force_load_matches_direct_generation() {
  let mut manager = manager();
  let target = pos(0, -4, 0, 9);
  let _ticket = manager.create_sector_ticket(SectorTicketInfo::Single(target));
  manager.tick();
  assert!(manager.force_load_sector(&target));

  let expected = manager.galaxy().generate_sector(&target);
  let loaded = manager.get_sector(&target).and_then(|s| s.initial_elements()).expect("loaded");
  assert_eq!(loaded.as_ref(), expected.as_slice());
}

#[test]
fn test_tick_publishes_finished_generation() {
  let mut manager = manager();
  let target = pos(0, 0, 0, 0);
  let _ticket = manager.create_sector_ticket(SectorTicketInfo::Single(target));
  assert!(tick_until_complete(&mut manager, &target));
  assert_eq!(manager.pending_count(), 0);
}

#[test]
fn test_force_load_unrequested_sector() {
  let (mut manager, gate) = gated_manager();
  let requested = pos(0, 0, 0, 0);
  let _ticket = manager.create_sector_ticket(SectorTicketInfo::Single(requested));
  manager.tick();
  assert_eq!(manager.root_count(), 1);
  assert_eq!(manager.pending_count(), 1);

  // Same root as the requested sector, and a root nobody holds.
  for other in [pos(0, 1, 0, 0), pos(0, 4096, 0, 0)] {
    assert!(!manager.force_load_sector(&other));
    assert!(!manager.is_loaded(&other));
    assert!(manager.get_sector(&other).is_none());
  }
  assert_eq!(manager.root_count(), 1);
  assert_eq!(manager.pending_count(), 1, "requested sector still generating");
  assert!(!manager.is_complete(&requested));

  gate.send(()).expect("worker is waiting");
}

#[test]
fn test_level_above_root_creates_no_slot() {
  let mut manager = manager();
  let target = SectorPos {
    level: ROOT_LEVEL + 2,
    coords: IVec3::new(3, 0, 0),
  };
  let ticket = manager.create_sector_ticket(SectorTicketInfo::Single(target));
  let stats = manager.tick();
  assert_eq!(stats.sector_loads, 0);
  assert_eq!(stats.dispatched, 0);
  assert_eq!(manager.root_count(), 0);
  assert!(!manager.is_loaded(&target));

  drop(ticket);
  let stats = manager.tick();
  assert_eq!(stats.sector_unloads, 0);
  assert_eq!(manager.root_count(), 0);
  assert_eq!(manager.sector_ticket_count(), 0);
}

#[test]
fn test_dropping_ticket_unloads_on_next_tick() {
  let mut manager = manager();
  let target = pos(0, 5, 5, 5);
  let ticket = manager.create_sector_ticket(SectorTicketInfo::Single(target));
  manager.tick();
  manager.force_load_sector(&target);
  assert_eq!(manager.root_count(), 1);

  drop(ticket);
  assert!(manager.is_loaded(&target), "disposal waits for the tick");

  let stats = manager.tick();
  assert_eq!(stats.sector_unloads, 1);
  assert!(!manager.is_loaded(&target));
  assert_eq!(manager.root_count(), 0, "empty tree is dropped");
  assert_eq!(manager.sector_ticket_count(), 0);
}

#[test]
fn test_release_is_same_as_drop() {
  let mut manager = manager();
  let target = pos(2, 0, 1, 0);
  let ticket = manager.create_sector_ticket(SectorTicketInfo::Single(target));
  manager.tick();
  manager.release_sector_ticket(ticket);
  manager.tick();
  assert!(!manager.is_loaded(&target));
}

#[test]
fn test_overlapping_single_tickets_share_a_sector() {
  let mut manager = manager();
  let target = pos(0, 1, 1, 1);
  let a = manager.create_sector_ticket(SectorTicketInfo::Single(target));
  let b = manager.create_sector_ticket(SectorTicketInfo::Single(target));

  let stats = manager.tick();
  assert_eq!(stats.sector_loads, 1, "second reference is not a transition");
  assert_eq!(stats.dispatched, 1);

  drop(a);
  let stats = manager.tick();
  assert_eq!(stats.sector_unloads, 0);
  assert!(manager.is_loaded(&target));

  drop(b);
  manager.tick();
  assert!(!manager.is_loaded(&target));
}

#[test]
fn test_overlapping_multi_tickets() {
  let mut manager = manager();
  let a_info = SectorTicketInfo::multi(DVec3::new(8.0, 8.0, 8.0), 20.0, 0.0, 1.0);
  let b_info = SectorTicketInfo::multi(DVec3::new(40.0, 8.0, 8.0), 20.0, 0.0, 1.0);
  let shared: Vec<SectorPos> = a_info
    .affected_sectors()
    .intersection(&b_info.affected_sectors())
    .copied()
    .collect();
  assert!(!shared.is_empty());

  let a = manager.create_sector_ticket(a_info);
  let b = manager.create_sector_ticket(b_info);
  manager.tick();

  drop(a);
  manager.tick();
  for pos in &shared {
    assert!(manager.is_loaded(pos), "{:?} still held by the other ticket", pos);
  }
  for pos in a_info.affected_sectors().difference(&b_info.affected_sectors()) {
    assert!(!manager.is_loaded(pos), "{:?} only held by the dropped ticket", pos);
  }

  drop(b);
  manager.tick();
  assert_eq!(manager.root_count(), 0);
}

#[test]
fn test_moving_ticket_unloads_old_region() {
  let mut manager = manager();
  let ticket = manager.create_sector_ticket(SectorTicketInfo::multi(DVec3::ZERO, 10.0, 0.0, 1.0));
  manager.tick();
  let origin = SectorPos::from_point(0, DVec3::ZERO);
  assert!(manager.is_loaded(&origin));

  let far = DVec3::new(100_000.0, 0.0, 0.0);
  assert!(manager.move_ticket(&ticket, far));
  let stats = manager.tick();
  assert!(stats.sector_loads > 0);
  assert!(stats.sector_unloads > 0);
  assert!(!manager.is_loaded(&origin));
  assert!(manager.is_loaded(&SectorPos::from_point(0, far)));
}

#[test]
fn test_unchanged_ticket_is_idle() {
  let mut manager = manager();
  let ticket = manager.create_sector_ticket(SectorTicketInfo::multi(DVec3::ZERO, 10.0, 0.0, 1.0));
  manager.tick();

  // Small moves inside the same cells change nothing.
  manager.move_ticket(&ticket, DVec3::new(0.5, 0.5, 0.5));
  let stats = manager.tick();
  assert_eq!(stats.sector_loads, 0);
  assert_eq!(stats.sector_unloads, 0);
}

#[test]
fn test_switching_variant_replaces_footprint() {
  let mut manager = manager();
  let single = pos(0, 50, 50, 50);
  let ticket = manager.create_sector_ticket(SectorTicketInfo::multi(DVec3::ZERO, 10.0, 0.0, 1.0));
  manager.tick();

  assert!(manager.set_ticket_info(&ticket, SectorTicketInfo::Single(single)));
  manager.tick();
  assert!(manager.is_loaded(&single));
  assert!(!manager.is_loaded(&SectorPos::from_point(0, DVec3::ZERO)));
}

#[test]
fn test_loads_apply_before_unloads() {
  let mut manager = manager();
  let target = pos(0, 3, 0, 0);
  let first = manager.create_sector_ticket(SectorTicketInfo::Single(target));
  manager.tick();
  assert!(manager.force_load_sector(&target));

  // Handover within one tick keeps the generated sector.
  drop(first);
  let _second = manager.create_sector_ticket(SectorTicketInfo::Single(target));
  let stats = manager.tick();
  assert_eq!(stats.sector_loads, 0);
  assert_eq!(stats.sector_unloads, 0);
  assert_eq!(stats.dispatched, 0);
  assert!(manager.is_complete(&target));
}

#[test]
fn test_unload_cancels_pending_generation() {
  let (mut manager, gate) = gated_manager();
  let target = pos(0, 0, 0, 0);
  let ticket = manager.create_sector_ticket(SectorTicketInfo::Single(target));
  manager.tick();
  assert_eq!(manager.pending_count(), 1);

  drop(ticket);
  let stats = manager.tick();
  assert_eq!(stats.cancelled, 1);
  assert_eq!(stats.completed, 0);
  assert_eq!(manager.pending_count(), 0);

  gate.send(()).expect("worker is waiting");
}

#[test]
fn test_enumerate_visits_complete_sectors() {
  let mut manager = manager();
  let a = pos(0, 0, 0, 0);
  let ticket = manager.create_sector_ticket(SectorTicketInfo::Single(a));

  let mut seen = Vec::new();
  manager.enumerate(&ticket, |pos, _| seen.push(pos));
  assert!(seen.is_empty(), "not applied yet");

  manager.tick();
  manager.enumerate(&ticket, |pos, _| seen.push(pos));
  assert!(seen.is_empty(), "not generated yet");

  manager.force_load_sector(&a);
  manager.enumerate(&ticket, |pos, sector| {
    assert!(sector.is_complete());
    seen.push(pos);
  });
  assert_eq!(seen, vec![a]);
}

// =============================================================================
// System tickets
// =============================================================================

#[test]
fn test_system_ticket_synthesises_system() {
  let mut manager = manager();
  let sector = pos(0, 2, 2, 2);
  let id = SystemId::new(sector, 1);
  let _sector_ticket = manager.create_sector_ticket(SectorTicketInfo::Single(sector));
  let system_ticket = manager.create_system_ticket(Some(id));

  let stats = manager.tick();
  assert_eq!(stats.system_loads, 1);
  assert!(manager.get_system(id).is_none());

  let system = manager.force_load_system(id).expect("system synthesised");
  let element = manager.get_initial(id).expect("element exists").clone();
  assert_eq!(*system, manager.galaxy().generate_system(&element));
  assert_eq!(manager.get_system(id), Some(system));

  drop(system_ticket);
  let stats = manager.tick();
  assert_eq!(stats.system_unloads, 1);
  assert!(manager.get_system(id).is_none());
  assert!(manager.is_complete(&sector), "sector ticket still holds it");
}

#[test]
fn test_system_ticket_holds_its_sector() {
  let mut manager = manager();
  let sector = pos(0, -1, 0, 0);
  let id = SystemId::new(sector, 0);
  let ticket = manager.create_system_ticket(Some(id));
  manager.tick();
  assert!(manager.is_loaded(&sector));
  assert!(manager.force_load_system(id).is_some());

  drop(ticket);
  manager.tick();
  assert!(!manager.is_loaded(&sector));
}

#[test]
fn test_system_starts_after_sector_publishes() {
  let mut manager = manager();
  let sector = pos(0, 6, 0, 0);
  let id = SystemId::new(sector, 2);
  let _ticket = manager.create_system_ticket(Some(id));

  for _ in 0..5000 {
    manager.tick();
    if manager.get_system(id).is_some() {
      break;
    }
    std::thread::sleep(Duration::from_millis(1));
  }
  assert!(manager.get_system(id).is_some());
}

#[test]
fn test_retargeting_system_ticket() {
  let mut manager = manager();
  let first = SystemId::new(pos(0, 0, 0, 0), 0);
  let second = SystemId::new(pos(0, 0, 0, 0), 3);
  let ticket = manager.create_system_ticket(Some(first));
  manager.tick();
  assert!(manager.force_load_system(first).is_some());

  assert!(manager.set_system_target(&ticket, Some(second)));
  let stats = manager.tick();
  assert_eq!(stats.system_loads, 1);
  assert_eq!(stats.system_unloads, 1);
  assert!(manager.get_system(first).is_none());
  assert!(manager.force_load_system(second).is_some());
  assert!(manager.is_loaded(&first.sector), "shared sector stays loaded");

  manager.set_system_target(&ticket, None);
  manager.tick();
  assert!(!manager.is_loaded(&first.sector));
}

#[test]
fn test_force_load_missing_system() {
  let mut manager = manager();
  let sector = pos(0, 0, 0, 0);

  // Not requested by any ticket.
  assert!(manager.force_load_system(SystemId::new(sector, 0)).is_none());

  // Past the end of the sector's elements.
  let past_end = SystemId::new(sector, 99);
  let _ticket = manager.create_system_ticket(Some(past_end));
  manager.tick();
  assert!(manager.force_load_system(past_end).is_none());
  assert!(manager.is_complete(&sector));
}

#[test]
fn test_empty_system_ticket_holds_nothing() {
  let mut manager = manager();
  let _ticket = manager.create_system_ticket(None);
  let stats = manager.tick();
  assert!(stats.is_idle());
  assert_eq!(manager.system_ticket_count(), 1);
  assert_eq!(manager.root_count(), 0);
}
