//! SectorManager - ticket bookkeeping, octree updates and generation dispatch.
//!
//! # Tick
//!
//! ```text
//! tick()
//! ├─ apply_finished()   drain finished tasks, publish, start waiting systems
//! └─ apply_tickets()
//!    ├─ drain disposals            (footprint → unloads)
//!    ├─ diff every tracker         (→ loads / unloads, nothing applied yet)
//!    ├─ system targets             (→ system loads / unloads + their sectors)
//!    ├─ apply all loads            (0→1 spawns generation)
//!    └─ apply all unloads          (1→0 cancels pending generation)
//! ```
//!
//! Loads and unloads are collected as multisets: two tickets that both cover
//! a sector each hold their own reference to it.
//!
//! # Threading
//!
//! The manager itself is single-threaded. Generation runs on the
//! [`TaskExecutor`]; results only enter the octree through
//! [`apply_finished`](SectorManager::apply_finished) or a force-load.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use glam::{DVec3, IVec3};
use web_time::Instant;

use super::slot::{SectorSlot, SectorTracker, SystemSlot, SystemTracker};
use super::stats::TickStats;
use super::ticket::{SectorTicket, SystemId, SystemTicket, TicketArena, TicketId};
use crate::config::GalaxyConfig;
use crate::constants::ROOT_LEVEL;
use crate::generation::{Galaxy, InitialElement, StarSystem};
use crate::sector::{GalaxySector, LoadOutcome, SectorPos, SectorTicketInfo, UnloadOutcome};
use crate::threading::{TaskExecutor, TaskPoll};

/// Owns the galaxy octrees and everything loaded into them.
pub struct SectorManager {
  galaxy: Arc<Galaxy>,
  executor: TaskExecutor,

  /// Root cell → octree and in-flight sector tasks.
  sectors: HashMap<IVec3, SectorSlot>,
  systems: HashMap<SystemId, SystemSlot>,

  sector_tickets: TicketArena<SectorTracker>,
  system_tickets: TicketArena<SystemTracker>,
  sector_disposal_tx: Sender<TicketId>,
  sector_disposal_rx: Receiver<TicketId>,
  system_disposal_tx: Sender<TicketId>,
  system_disposal_rx: Receiver<TicketId>,

  /// Accumulated since the last tick.
  stats: TickStats,
  last_stats: TickStats,
}

impl SectorManager {
  /// Manager for the galaxy described by `config`.
  pub fn new(config: &GalaxyConfig) -> Self {
    Self::with_galaxy(
      Arc::new(Galaxy::from_config(config)),
      TaskExecutor::new(config.worker_threads),
    )
  }

  pub fn with_galaxy(galaxy: Arc<Galaxy>, executor: TaskExecutor) -> Self {
    let (sector_disposal_tx, sector_disposal_rx) = crossbeam_channel::unbounded();
    let (system_disposal_tx, system_disposal_rx) = crossbeam_channel::unbounded();
    Self {
      galaxy,
      executor,
      sectors: HashMap::new(),
      systems: HashMap::new(),
      sector_tickets: TicketArena::new(),
      system_tickets: TicketArena::new(),
      sector_disposal_tx,
      sector_disposal_rx,
      system_disposal_tx,
      system_disposal_rx,
      stats: TickStats::default(),
      last_stats: TickStats::default(),
    }
  }

  pub fn galaxy(&self) -> &Arc<Galaxy> {
    &self.galaxy
  }

  pub fn executor(&self) -> &TaskExecutor {
    &self.executor
  }

  // ===========================================================================
  // Tickets
  // ===========================================================================

  /// Register a region lease. Takes effect on the next `apply_tickets`.
  pub fn create_sector_ticket(&mut self, info: SectorTicketInfo) -> SectorTicket {
    let id = self.sector_tickets.insert(SectorTracker {
      info,
      applied: None,
    });
    SectorTicket::new(id, self.sector_disposal_tx.clone())
  }

  /// Register a system lease. `None` holds nothing until a target is set.
  pub fn create_system_ticket(&mut self, target: Option<SystemId>) -> SystemTicket {
    let id = self.system_tickets.insert(SystemTracker {
      target,
      applied: None,
    });
    SystemTicket::new(id, self.system_disposal_tx.clone())
  }

  /// Replace the region of `ticket`. Returns `false` for a stale ticket.
  pub fn set_ticket_info(&mut self, ticket: &SectorTicket, info: SectorTicketInfo) -> bool {
    match self.sector_tickets.get_mut(ticket.id()) {
      Some(tracker) => {
        tracker.info = info;
        true
      }
      None => false,
    }
  }

  /// Move the focus point of a `Multi` ticket.
  pub fn move_ticket(&mut self, ticket: &SectorTicket, center: DVec3) -> bool {
    match self.sector_tickets.get_mut(ticket.id()) {
      Some(tracker) => {
        tracker.info.set_center(center);
        true
      }
      None => false,
    }
  }

  pub fn set_system_target(&mut self, ticket: &SystemTicket, target: Option<SystemId>) -> bool {
    match self.system_tickets.get_mut(ticket.id()) {
      Some(tracker) => {
        tracker.target = target;
        true
      }
      None => false,
    }
  }

  /// Region currently requested by `ticket`.
  pub fn ticket_info(&self, ticket: &SectorTicket) -> Option<&SectorTicketInfo> {
    self.sector_tickets.get(ticket.id()).map(|tracker| &tracker.info)
  }

  /// Give up a region lease. Same as dropping the handle: the footprint is
  /// unloaded by the next `apply_tickets`.
  pub fn release_sector_ticket(&mut self, ticket: SectorTicket) {
    drop(ticket);
  }

  /// Give up a system lease. Same as dropping the handle.
  pub fn release_system_ticket(&mut self, ticket: SystemTicket) {
    drop(ticket);
  }

  pub fn sector_ticket_count(&self) -> usize {
    self.sector_tickets.len()
  }

  pub fn system_ticket_count(&self) -> usize {
    self.system_tickets.len()
  }

  // ===========================================================================
  // Tick
  // ===========================================================================

  /// `apply_finished` followed by `apply_tickets`.
  ///
  /// Returns everything that happened since the previous tick, including
  /// direct calls to either step.
  pub fn tick(&mut self) -> TickStats {
    let _span = tracing::debug_span!("sector_tick").entered();
    let start = Instant::now();

    self.apply_finished();
    self.apply_tickets();

    let mut stats = std::mem::take(&mut self.stats);
    stats.tick_us = start.elapsed().as_micros() as u64;
    if !stats.is_idle() {
      tracing::debug!(
        loads = stats.sector_loads,
        unloads = stats.sector_unloads,
        dispatched = stats.dispatched,
        completed = stats.completed,
        cancelled = stats.cancelled,
        tick_us = stats.tick_us,
        "tick"
      );
    }
    self.last_stats = stats;
    stats
  }

  /// Stats returned by the most recent tick.
  pub fn last_stats(&self) -> &TickStats {
    &self.last_stats
  }

  /// Diff every ticket against its applied state and apply the result.
  ///
  /// All diffs are computed before anything is loaded or unloaded, then all
  /// loads are applied, then all unloads.
  pub fn apply_tickets(&mut self) {
    let mut loads: Vec<SectorPos> = Vec::new();
    let mut unloads: Vec<SectorPos> = Vec::new();
    let mut system_loads: Vec<SystemId> = Vec::new();
    let mut system_unloads: Vec<SystemId> = Vec::new();

    // Disposed tickets give back their whole applied footprint.
    while let Ok(id) = self.sector_disposal_rx.try_recv() {
      match self.sector_tickets.remove(id) {
        Some(SectorTracker {
          applied: Some(applied),
          ..
        }) => applied.for_each_sector(|pos| unloads.push(pos)),
        Some(_) => {}
        None => tracing::error!(?id, "disposing unknown sector ticket"),
      }
    }
    while let Ok(id) = self.system_disposal_rx.try_recv() {
      match self.system_tickets.remove(id) {
        Some(tracker) => system_unloads.extend(tracker.applied),
        None => tracing::error!(?id, "disposing unknown system ticket"),
      }
    }

    for (_, tracker) in self.sector_tickets.iter_mut() {
      match &tracker.applied {
        None => tracker.info.for_each_sector(|pos| loads.push(pos)),
        Some(previous) if *previous == tracker.info => {}
        Some(previous) => {
          let diff = tracker.info.diff(previous);
          loads.extend(diff.added);
          unloads.extend(diff.removed);
        }
      }
      tracker.applied = Some(tracker.info);
    }

    for (_, tracker) in self.system_tickets.iter_mut() {
      if tracker.applied != tracker.target {
        system_unloads.extend(tracker.applied);
        system_loads.extend(tracker.target);
        tracker.applied = tracker.target;
      }
    }

    // A system keeps the sector that placed it loaded.
    loads.extend(system_loads.iter().map(|id| id.sector));
    unloads.extend(system_unloads.iter().map(|id| id.sector));

    for pos in loads {
      self.load_sector(pos);
    }
    for id in system_loads {
      self.load_system(id);
    }
    for id in system_unloads {
      self.unload_system(id);
    }
    for pos in unloads {
      self.unload_sector(pos);
    }
  }

  /// Publish every finished generation task (non-blocking).
  pub fn apply_finished(&mut self) {
    let mut completed_sectors = Vec::new();

    for slot in self.sectors.values_mut() {
      let mut finished = Vec::new();
      for (pos, task) in &slot.pending {
        match task.try_take() {
          TaskPoll::Pending => {}
          TaskPoll::Ready(output) => finished.push((*pos, Some(output))),
          TaskPoll::Lost => finished.push((*pos, None)),
        }
      }

      for (pos, output) in finished {
        slot.pending.remove(&pos);
        match output {
          Some(output) => {
            if slot.tree.publish(&pos, Arc::from(output.value)) {
              self.stats.completed += 1;
              self.stats.generation_us += output.elapsed_us;
              completed_sectors.push(pos);
            }
          }
          None => {
            tracing::error!(?pos, "sector generation ended without a result");
            self.stats.lost += 1;
          }
        }
      }
    }

    for slot in self.systems.values_mut() {
      let Some(task) = &slot.pending else {
        continue;
      };
      match task.try_take() {
        TaskPoll::Pending => {}
        TaskPoll::Ready(output) => {
          slot.system = Some(Arc::new(output.value));
          slot.pending = None;
          self.stats.completed += 1;
          self.stats.generation_us += output.elapsed_us;
        }
        TaskPoll::Lost => {
          tracing::error!("system synthesis ended without a result");
          slot.pending = None;
          self.stats.lost += 1;
        }
      }
    }

    for pos in completed_sectors {
      self.start_waiting_systems(pos);
    }
  }

  // ===========================================================================
  // Force-load
  // ===========================================================================

  /// Block until `pos` is generated. Returns `false` when `pos` is not
  /// loaded or its generation was lost.
  pub fn force_load_sector(&mut self, pos: &SectorPos) -> bool {
    let Some(slot) = self.sectors.get_mut(&pos.root_coords()) else {
      return false;
    };

    if let Some(task) = slot.pending.remove(pos) {
      match task.wait() {
        Some(output) => {
          if slot.tree.publish(pos, Arc::from(output.value)) {
            self.stats.completed += 1;
            self.stats.generation_us += output.elapsed_us;
          }
        }
        None => {
          tracing::error!(?pos, "sector generation ended without a result");
          self.stats.lost += 1;
        }
      }
      self.start_waiting_systems(*pos);
    }

    self.is_complete(pos)
  }

  /// Block until the system `id` is synthesised, generating its sector
  /// first if needed. `None` when no ticket holds `id` or it does not exist.
  pub fn force_load_system(&mut self, id: SystemId) -> Option<Arc<StarSystem>> {
    if !self.systems.contains_key(&id) {
      return None;
    }
    self.force_load_sector(&id.sector);
    if self.systems.get(&id).is_some_and(SystemSlot::is_waiting) {
      self.start_system(id);
    }

    let slot = self.systems.get_mut(&id)?;
    if let Some(task) = slot.pending.take() {
      match task.wait() {
        Some(output) => {
          slot.system = Some(Arc::new(output.value));
          self.stats.completed += 1;
          self.stats.generation_us += output.elapsed_us;
        }
        None => {
          tracing::error!(?id, "system synthesis ended without a result");
          self.stats.lost += 1;
        }
      }
    }
    slot.system.clone()
  }

  // ===========================================================================
  // Queries
  // ===========================================================================

  /// True while at least one ticket holds `pos`.
  pub fn is_loaded(&self, pos: &SectorPos) -> bool {
    self.lookup(pos).is_some_and(GalaxySector::is_loaded)
  }

  /// True once `pos` is loaded and generated.
  pub fn is_complete(&self, pos: &SectorPos) -> bool {
    self.get_sector(pos).is_some()
  }

  /// The sector at `pos`, only once it is loaded and generated.
  pub fn get_sector(&self, pos: &SectorPos) -> Option<&GalaxySector> {
    self
      .lookup(pos)
      .filter(|sector| sector.is_loaded() && sector.is_complete())
  }

  /// Placement record of system `id`, once its sector is generated.
  pub fn get_initial(&self, id: SystemId) -> Option<&InitialElement> {
    self
      .get_sector(&id.sector)?
      .initial_elements()?
      .get(id.index as usize)
  }

  /// Full system `id`, once a system ticket has had it synthesised.
  pub fn get_system(&self, id: SystemId) -> Option<Arc<StarSystem>> {
    self.systems.get(&id)?.system.clone()
  }

  /// Visit every generated sector in the applied footprint of `ticket`.
  pub fn enumerate(&self, ticket: &SectorTicket, mut f: impl FnMut(SectorPos, &GalaxySector)) {
    let Some(applied) = self
      .sector_tickets
      .get(ticket.id())
      .and_then(|tracker| tracker.applied.as_ref())
    else {
      return;
    };
    applied.for_each_sector(|pos| {
      if let Some(sector) = self.get_sector(&pos) {
        f(pos, sector);
      }
    });
  }

  /// Root cells with at least one materialised tree.
  pub fn root_count(&self) -> usize {
    self.sectors.len()
  }

  /// Generation tasks in flight.
  pub fn pending_count(&self) -> usize {
    let sectors: usize = self.sectors.values().map(|slot| slot.pending.len()).sum();
    let systems = self.systems.values().filter(|slot| slot.pending.is_some()).count();
    sectors + systems
  }

  fn lookup(&self, pos: &SectorPos) -> Option<&GalaxySector> {
    self.sectors.get(&pos.root_coords())?.tree.lookup(pos)
  }

  // ===========================================================================
  // Load / unload
  // ===========================================================================

  fn load_sector(&mut self, pos: SectorPos) {
    if pos.level > ROOT_LEVEL {
      tracing::error!(?pos, "sector level above root level");
      return;
    }
    let root = pos.root_coords();
    let slot = self
      .sectors
      .entry(root)
      .or_insert_with(|| SectorSlot::new(root));

    match slot.tree.load(pos) {
      LoadOutcome::Acquired => {
        self.stats.sector_loads += 1;
        if !slot.tree.mark_started(&pos) {
          return;
        }
        let galaxy = Arc::clone(&self.galaxy);
        let task = self.executor.spawn(move || galaxy.generate_sector(&pos));
        if slot.pending.insert(pos, task).is_some() {
          tracing::error!(?pos, "replaced a pending generation task");
        }
        self.stats.dispatched += 1;
      }
      LoadOutcome::Shared => {}
      LoadOutcome::Outside => tracing::error!(?pos, ?root, "sector outside its root tree"),
    }
  }

  fn unload_sector(&mut self, pos: SectorPos) {
    if pos.level > ROOT_LEVEL {
      return;
    }
    let root = pos.root_coords();
    let Some(slot) = self.sectors.get_mut(&root) else {
      tracing::error!(?pos, "unloading sector of an unknown root");
      return;
    };

    match slot.tree.unload(pos) {
      UnloadOutcome::Released { tree_empty } => {
        self.stats.sector_unloads += 1;
        if let Some(task) = slot.pending.remove(&pos) {
          task.cancel();
          self.stats.cancelled += 1;
        }
        if tree_empty {
          self.sectors.remove(&root);
        }
      }
      UnloadOutcome::Retained | UnloadOutcome::NotLoaded => {}
      UnloadOutcome::Outside => tracing::error!(?pos, ?root, "sector outside its root tree"),
    }
  }

  fn load_system(&mut self, id: SystemId) {
    let slot = self.systems.entry(id).or_default();
    slot.reference_count += 1;
    if slot.reference_count == 1 {
      self.stats.system_loads += 1;
      self.start_system(id);
    }
  }

  fn unload_system(&mut self, id: SystemId) {
    let Some(slot) = self.systems.get_mut(&id) else {
      tracing::error!(?id, "unloading system with zero reference count");
      return;
    };
    slot.reference_count -= 1;
    if slot.reference_count > 0 {
      return;
    }

    if let Some(slot) = self.systems.remove(&id) {
      self.stats.system_unloads += 1;
      if let Some(task) = slot.pending {
        task.cancel();
        self.stats.cancelled += 1;
      }
    }
  }

  /// Spawn synthesis for `id` if it is waiting and its sector is generated.
  fn start_system(&mut self, id: SystemId) {
    if !self.systems.get(&id).is_some_and(SystemSlot::is_waiting) {
      return;
    }
    let Some(element) = self.get_initial(id).cloned() else {
      if self.is_complete(&id.sector) {
        tracing::warn!(?id, "system index past the end of its sector");
      }
      return;
    };

    let galaxy = Arc::clone(&self.galaxy);
    let task = self.executor.spawn(move || galaxy.generate_system(&element));
    if let Some(slot) = self.systems.get_mut(&id) {
      slot.pending = Some(task);
      self.stats.dispatched += 1;
    }
  }

  fn start_waiting_systems(&mut self, sector: SectorPos) {
    let waiting: Vec<SystemId> = self
      .systems
      .iter()
      .filter(|(id, slot)| id.sector == sector && slot.is_waiting())
      .map(|(id, _)| *id)
      .collect();
    for id in waiting {
      self.start_system(id);
    }
  }
}

impl std::fmt::Debug for SectorManager {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SectorManager")
      .field("galaxy", &self.galaxy)
      .field("roots", &self.sectors.len())
      .field("systems", &self.systems.len())
      .field("sector_tickets", &self.sector_tickets.len())
      .field("system_tickets", &self.system_tickets.len())
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
#[path = "sector_manager_test.rs"]
mod sector_manager_test;
