//! Manager-side state for one root cell and for one star system.

use std::collections::HashMap;
use std::sync::Arc;

use glam::IVec3;

use super::ticket::SystemId;
use crate::generation::{InitialElement, StarSystem};
use crate::sector::{SectorPos, SectorTicketInfo, SectorTree};
use crate::threading::PendingTask;

/// One root cell: its octree and the sector generation tasks in flight.
#[derive(Debug)]
pub(super) struct SectorSlot {
  pub tree: SectorTree,
  pub pending: HashMap<SectorPos, PendingTask<Vec<InitialElement>>>,
}

impl SectorSlot {
  pub fn new(root_coords: IVec3) -> Self {
    Self {
      tree: SectorTree::new(root_coords),
      pending: HashMap::new(),
    }
  }
}

/// One star system requested by at least one system ticket.
#[derive(Debug, Default)]
pub(super) struct SystemSlot {
  pub reference_count: u32,
  pub system: Option<Arc<StarSystem>>,
  pub pending: Option<PendingTask<StarSystem>>,
}

impl SystemSlot {
  /// Neither generated nor generating. Waits on its sector.
  pub fn is_waiting(&self) -> bool {
    self.system.is_none() && self.pending.is_none()
  }
}

/// Tracker record behind a [`SectorTicket`](super::SectorTicket).
#[derive(Debug)]
pub(super) struct SectorTracker {
  pub info: SectorTicketInfo,
  /// Info whose footprint is currently loaded. `None` until the first apply.
  pub applied: Option<SectorTicketInfo>,
}

/// Tracker record behind a [`SystemTicket`](super::SystemTicket).
#[derive(Debug)]
pub(super) struct SystemTracker {
  pub target: Option<SystemId>,
  /// Target currently loaded.
  pub applied: Option<SystemId>,
}
