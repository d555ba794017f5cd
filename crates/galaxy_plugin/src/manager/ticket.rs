//! Ticket handles and the tracker arena behind them.
//!
//! A ticket is a lightweight handle: an index plus a generation into the
//! manager's arena of tracker records. Consumers never touch tracker state
//! directly; they go through [`SectorManager`](super::SectorManager) methods.
//!
//! Dropping a handle sends its id over the manager's disposal channel. The
//! manager drains that channel at the start of the next
//! [`apply_tickets`](super::SectorManager::apply_tickets) and unloads the
//! ticket's footprint.

use crossbeam_channel::Sender;

use crate::sector::SectorPos;

/// Stable handle into the tracker arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TicketId {
  index: u32,
  generation: u32,
}

impl TicketId {
  #[inline]
  pub fn index(&self) -> u32 {
    self.index
  }

  #[inline]
  pub fn generation(&self) -> u32 {
    self.generation
  }
}

/// One star system: the sector that placed it and its position in that
/// sector's initial elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SystemId {
  pub sector: SectorPos,
  pub index: u32,
}

impl SystemId {
  pub fn new(sector: SectorPos, index: u32) -> Self {
    Self { sector, index }
  }
}

/// Lease keeping a region of sectors loaded.
#[derive(Debug)]
pub struct SectorTicket {
  id: TicketId,
  disposer: Sender<TicketId>,
}

/// Lease keeping one star system fully generated.
#[derive(Debug)]
pub struct SystemTicket {
  id: TicketId,
  disposer: Sender<TicketId>,
}

macro_rules! impl_ticket_handle {
  ($ty:ident) => {
    impl $ty {
      pub(super) fn new(id: TicketId, disposer: Sender<TicketId>) -> Self {
        Self { id, disposer }
      }

      #[inline]
      pub fn id(&self) -> TicketId {
        self.id
      }
    }

    impl Drop for $ty {
      fn drop(&mut self) {
        // The manager may already be gone, in which case nothing is loaded.
        let _ = self.disposer.send(self.id);
      }
    }
  };
}

impl_ticket_handle!(SectorTicket);
impl_ticket_handle!(SystemTicket);

struct ArenaEntry<T> {
  generation: u32,
  value: Option<T>,
}

/// Generational arena. Removing an entry bumps its generation so stale ids
/// never alias a newer entry in the same slot.
pub(super) struct TicketArena<T> {
  entries: Vec<ArenaEntry<T>>,
  free: Vec<u32>,
  len: usize,
}

impl<T> TicketArena<T> {
  pub fn new() -> Self {
    Self {
      entries: Vec::new(),
      free: Vec::new(),
      len: 0,
    }
  }

  pub fn insert(&mut self, value: T) -> TicketId {
    self.len += 1;
    if let Some(index) = self.free.pop() {
      let entry = &mut self.entries[index as usize];
      entry.value = Some(value);
      return TicketId {
        index,
        generation: entry.generation,
      };
    }

    let index = self.entries.len() as u32;
    self.entries.push(ArenaEntry {
      generation: 0,
      value: Some(value),
    });
    TicketId {
      index,
      generation: 0,
    }
  }

  pub fn get(&self, id: TicketId) -> Option<&T> {
    self
      .entries
      .get(id.index as usize)
      .filter(|entry| entry.generation == id.generation)
      .and_then(|entry| entry.value.as_ref())
  }

  pub fn get_mut(&mut self, id: TicketId) -> Option<&mut T> {
    self
      .entries
      .get_mut(id.index as usize)
      .filter(|entry| entry.generation == id.generation)
      .and_then(|entry| entry.value.as_mut())
  }

  pub fn remove(&mut self, id: TicketId) -> Option<T> {
    let entry = self.entries.get_mut(id.index as usize)?;
    if entry.generation != id.generation {
      return None;
    }
    let value = entry.value.take()?;
    entry.generation = entry.generation.wrapping_add(1);
    self.free.push(id.index);
    self.len -= 1;
    Some(value)
  }

  pub fn iter_mut(&mut self) -> impl Iterator<Item = (TicketId, &mut T)> {
    self.entries.iter_mut().enumerate().filter_map(|(index, entry)| {
      let generation = entry.generation;
      entry.value.as_mut().map(|value| {
        (
          TicketId {
            index: index as u32,
            generation,
          },
          value,
        )
      })
    })
  }

  pub fn len(&self) -> usize {
    self.len
  }
}
