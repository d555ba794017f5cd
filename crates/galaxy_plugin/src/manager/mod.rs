//! Ticket-driven sector streaming.
//!
//! Consumers describe what they need through tickets; the [`SectorManager`]
//! turns ticket changes into octree loads and unloads once per tick and keeps
//! generation running on the worker pool.
//!
//! # Module Structure
//!
//! - [`ticket`]: `SectorTicket` / `SystemTicket` handles and their arena
//! - [`stats`]: `TickStats` - per-tick counters
//! - [`sector_manager`]: `SectorManager`

mod slot;
pub mod sector_manager;
pub mod stats;
pub mod ticket;

// Re-exports
pub use sector_manager::SectorManager;
pub use stats::TickStats;
pub use ticket::{SectorTicket, SystemId, SystemTicket, TicketId};
