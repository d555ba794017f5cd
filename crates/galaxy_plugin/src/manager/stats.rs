//! Per-tick counters.

/// What one [`SectorManager::tick`](super::SectorManager::tick) did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
  /// Sectors that went from zero to one reference.
  pub sector_loads: usize,
  /// Sectors that went from one to zero references.
  pub sector_unloads: usize,
  /// Systems that went from zero to one reference.
  pub system_loads: usize,
  /// Systems that went from one to zero references.
  pub system_unloads: usize,
  /// Generation tasks spawned (sectors and systems).
  pub dispatched: usize,
  /// Generation results published.
  pub completed: usize,
  /// Pending tasks cancelled by an unload.
  pub cancelled: usize,
  /// Tasks that ended without a result.
  pub lost: usize,
  /// Worker time of the published results in microseconds.
  pub generation_us: u64,
  /// Wall time of the tick itself in microseconds.
  pub tick_us: u64,
}

impl TickStats {
  /// Total load and unload transitions.
  #[inline]
  pub fn total_transitions(&self) -> usize {
    self.sector_loads + self.sector_unloads + self.system_loads + self.system_unloads
  }

  /// True when the tick changed nothing.
  #[inline]
  pub fn is_idle(&self) -> bool {
    self.total_transitions() == 0 && self.dispatched == 0 && self.completed == 0
  }

  /// Fold `other` into `self`.
  pub fn merge(&mut self, other: &TickStats) {
    self.sector_loads += other.sector_loads;
    self.sector_unloads += other.sector_unloads;
    self.system_loads += other.system_loads;
    self.system_unloads += other.system_unloads;
    self.dispatched += other.dispatched;
    self.completed += other.completed;
    self.cancelled += other.cancelled;
    self.lost += other.lost;
    self.generation_us += other.generation_us;
    self.tick_us += other.tick_us;
  }
}
