//! SectorTree - reference-counted octree for one root cell.
//!
//! Nodes live in an arena keyed by [`SectorPos`]; parent/child links are
//! implied by coordinate math. A node's *branch* is its eight children. It is
//! materialised the first time a load passes through the node and dropped
//! again once no descendant is loaded.
//!
//! # Counting
//!
//! ```text
//! reference_count       loads targeting exactly this node
//! weak_reference_count  loads targeting this node or any descendant
//!
//! weak(n) = reference(n) + sum(weak(child))
//! ```
//!
//! Neither count ever goes below zero: unloading a sector that is not loaded
//! is logged and ignored.

use std::collections::HashMap;
use std::sync::Arc;

use bitflags::bitflags;
use glam::IVec3;
use smallvec::SmallVec;

use super::SectorPos;
use crate::constants::{LEVEL_COUNT, ROOT_LEVEL};
use crate::generation::InitialElement;

bitflags! {
  /// Generation progress of a sector.
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
  pub struct GenerationFlags: u8 {
    /// A generation task was dispatched for the current load.
    const GENERATION_STARTED = 1 << 0;
    /// `initial_elements` holds the generated content.
    const GENERATION_FINISHED = 1 << 1;
  }
}

/// One octree node.
#[derive(Debug, Clone)]
pub struct GalaxySector {
  pos: SectorPos,
  weak_reference_count: u32,
  reference_count: u32,
  flags: GenerationFlags,
  initial_elements: Option<Arc<[InitialElement]>>,
  has_branch: bool,
}

impl GalaxySector {
  fn new(pos: SectorPos) -> Self {
    Self {
      pos,
      weak_reference_count: 0,
      reference_count: 0,
      flags: GenerationFlags::empty(),
      initial_elements: None,
      has_branch: false,
    }
  }

  #[inline]
  pub fn pos(&self) -> SectorPos {
    self.pos
  }

  #[inline]
  pub fn weak_reference_count(&self) -> u32 {
    self.weak_reference_count
  }

  #[inline]
  pub fn reference_count(&self) -> u32 {
    self.reference_count
  }

  #[inline]
  pub fn flags(&self) -> GenerationFlags {
    self.flags
  }

  #[inline]
  pub fn has_branch(&self) -> bool {
    self.has_branch
  }

  /// True while at least one load targets this exact node.
  #[inline]
  pub fn is_loaded(&self) -> bool {
    self.reference_count > 0
  }

  /// True once generated content has been published.
  #[inline]
  pub fn is_complete(&self) -> bool {
    self.initial_elements.is_some()
  }

  /// Generated star systems, `None` until generation finishes.
  #[inline]
  pub fn initial_elements(&self) -> Option<&Arc<[InitialElement]>> {
    self.initial_elements.as_ref()
  }

  fn release(&mut self) {
    self.initial_elements = None;
    self.flags = GenerationFlags::empty();
  }
}

/// Result of [`SectorTree::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
  /// The target went from zero to one reference.
  Acquired,
  /// The target was already loaded.
  Shared,
  /// The position is not inside this tree.
  Outside,
}

/// Result of [`SectorTree::unload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnloadOutcome {
  /// The target went from one to zero references.
  /// `tree_empty` reports that nothing in the tree is loaded any more.
  Released { tree_empty: bool },
  /// Other loads still hold the target.
  Retained,
  /// The target had no references; nothing changed.
  NotLoaded,
  /// The position is not inside this tree.
  Outside,
}

/// Octree of one root cell.
#[derive(Debug, Clone)]
pub struct SectorTree {
  root: SectorPos,
  nodes: HashMap<SectorPos, GalaxySector>,
}

impl SectorTree {
  /// Create an empty tree for the root cell at `root_coords`.
  pub fn new(root_coords: IVec3) -> Self {
    let root = SectorPos::new(ROOT_LEVEL, root_coords);
    let mut nodes = HashMap::new();
    nodes.insert(root, GalaxySector::new(root));
    Self { root, nodes }
  }

  #[inline]
  pub fn root_pos(&self) -> SectorPos {
    self.root
  }

  /// The root node. Always materialised.
  pub fn root(&self) -> &GalaxySector {
    &self.nodes[&self.root]
  }

  /// True when no load is outstanding anywhere in the tree.
  pub fn is_empty(&self) -> bool {
    self.root().weak_reference_count == 0
  }

  /// Number of materialised nodes, including the root.
  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }

  /// Materialised node at `pos`, if any.
  pub fn lookup(&self, pos: &SectorPos) -> Option<&GalaxySector> {
    self.nodes.get(pos)
  }

  /// Loaded nodes in arbitrary order.
  pub fn iter_loaded(&self) -> impl Iterator<Item = &GalaxySector> {
    self.nodes.values().filter(|node| node.is_loaded())
  }

  /// Ancestor chain from the root down to `pos` (inclusive).
  fn path(pos: &SectorPos) -> SmallVec<[SectorPos; LEVEL_COUNT]> {
    (pos.level..=ROOT_LEVEL)
      .rev()
      .map(|level| pos.ancestor(level))
      .collect()
  }

  /// Add one reference to `pos`, materialising branches along the way.
  pub fn load(&mut self, pos: SectorPos) -> LoadOutcome {
    if !self.root.contains(&pos) {
      return LoadOutcome::Outside;
    }

    for step in Self::path(&pos) {
      let node = self
        .nodes
        .entry(step)
        .or_insert_with(|| GalaxySector::new(step));
      node.weak_reference_count += 1;

      if step.level == pos.level {
        node.reference_count += 1;
        return if node.reference_count == 1 {
          LoadOutcome::Acquired
        } else {
          LoadOutcome::Shared
        };
      }

      if !node.has_branch {
        node.has_branch = true;
        for child in step.children() {
          self
            .nodes
            .entry(child)
            .or_insert_with(|| GalaxySector::new(child));
        }
      }
    }

    unreachable!("path always ends at the target level")
  }

  /// Remove one reference from `pos`, pruning branches nothing needs.
  pub fn unload(&mut self, pos: SectorPos) -> UnloadOutcome {
    if !self.root.contains(&pos) {
      return UnloadOutcome::Outside;
    }

    let loaded = self.nodes.get(&pos).is_some_and(GalaxySector::is_loaded);
    if !loaded {
      tracing::error!(?pos, "unloading sector with zero reference count");
      return UnloadOutcome::NotLoaded;
    }

    let path = Self::path(&pos);
    let mut released = false;

    for step in &path {
      let Some(node) = self.nodes.get_mut(step) else {
        continue;
      };
      debug_assert!(node.weak_reference_count > 0, "weak count underflow at {:?}", step);
      node.weak_reference_count -= 1;

      if step.level == pos.level {
        node.reference_count -= 1;
        if node.reference_count == 0 {
          node.release();
          released = true;
        }
      }
    }

    // Bottom-up so a pruned child can let its parent prune too.
    for step in path.iter().rev() {
      self.prune_branch(step);
    }

    if released {
      UnloadOutcome::Released {
        tree_empty: self.is_empty(),
      }
    } else {
      UnloadOutcome::Retained
    }
  }

  /// Drop the branch below `pos` once no descendant is loaded.
  fn prune_branch(&mut self, pos: &SectorPos) {
    let Some(node) = self.nodes.get(pos) else {
      return;
    };
    if !node.has_branch || node.weak_reference_count > node.reference_count {
      return;
    }
    for child in pos.children() {
      self.remove_subtree(child);
    }
    if let Some(node) = self.nodes.get_mut(pos) {
      node.has_branch = false;
    }
  }

  fn remove_subtree(&mut self, pos: SectorPos) {
    if let Some(node) = self.nodes.remove(&pos) {
      debug_assert_eq!(node.weak_reference_count, 0, "pruning live node {:?}", pos);
      if node.has_branch {
        for child in pos.children() {
          self.remove_subtree(child);
        }
      }
    }
  }

  /// Record that generation was dispatched for `pos`.
  ///
  /// Returns `false` (and logs) when the sector is not loaded or generation
  /// already started for the current load.
  pub fn mark_started(&mut self, pos: &SectorPos) -> bool {
    match self.nodes.get_mut(pos) {
      Some(node) if node.is_loaded() => {
        if node.flags.contains(GenerationFlags::GENERATION_STARTED) {
          tracing::error!(?pos, "generation already started for sector");
          return false;
        }
        node.flags.insert(GenerationFlags::GENERATION_STARTED);
        true
      }
      _ => false,
    }
  }

  /// Store generated content for `pos`.
  ///
  /// Results for sectors that were unloaded (or re-loaded) since dispatch
  /// are dropped and `false` is returned.
  pub fn publish(&mut self, pos: &SectorPos, elements: Arc<[InitialElement]>) -> bool {
    match self.nodes.get_mut(pos) {
      Some(node)
        if node.is_loaded()
          && node.flags.contains(GenerationFlags::GENERATION_STARTED)
          && !node.flags.contains(GenerationFlags::GENERATION_FINISHED) =>
      {
        node.initial_elements = Some(elements);
        node.flags.insert(GenerationFlags::GENERATION_FINISHED);
        true
      }
      _ => false,
    }
  }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;
