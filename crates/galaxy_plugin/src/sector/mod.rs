//! Sector addressing, tickets and the reference-counted octree.
//!
//! # Level Convention
//!
//! Level 0 = finest sectors, `ROOT_LEVEL` = coarsest. Each root cell owns one
//! [`SectorTree`]; the manager keys trees by [`SectorPos::root_coords`].
//!
//! # Module Structure
//!
//! - [`pos`]: `SectorPos` - immutable cell address
//! - [`bounds`]: `DAabb3` - continuous bounding boxes
//! - [`ticket`]: `SectorTicketInfo` - load regions and their diffs
//! - [`tree`]: `SectorTree` / `GalaxySector` - counted octree nodes

pub mod bounds;
pub mod pos;
pub mod ticket;
pub mod tree;

// Re-exports
pub use bounds::DAabb3;
pub use pos::SectorPos;
pub use ticket::{LevelRange, MultiTicket, SectorDiff, SectorTicketInfo};
pub use tree::{GalaxySector, GenerationFlags, LoadOutcome, SectorTree, UnloadOutcome};
