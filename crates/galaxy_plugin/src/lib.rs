//! galaxy_plugin - Framework/engine independent galaxy streaming
//!
//! This crate streams a procedurally generated galaxy around moving points of
//! interest. Space is cut into cubic sectors arranged in an octree per root
//! cell; consumers hold tickets describing the regions and star systems they
//! need, and the manager keeps exactly those loaded.
//!
//! # Features
//!
//! - **Reference-counted octree**: every load is counted, ancestors carry
//!   weak counts so a tree disappears as soon as nothing in it is needed
//! - **Tickets**: single-sector or multi-level regions around a focus point,
//!   diffed between ticks so only changed sectors are touched
//! - **Deterministic generation**: sector contents and star systems are pure
//!   functions of the universe seed, independent of load order
//! - **Background workers**: generation runs on rayon and is cancelled when
//!   its sector is released first
//!
//! # Example
//!
//! ```ignore
//! use galaxy_plugin::{GalaxyConfig, SectorManager, SectorTicketInfo};
//! use glam::DVec3;
//!
//! let mut manager = SectorManager::new(&GalaxyConfig::default());
//! let ticket = manager.create_sector_ticket(SectorTicketInfo::multi(DVec3::ZERO, 64.0, 0.0, 1.5));
//!
//! loop {
//!   manager.move_ticket(&ticket, camera_position());
//!   manager.tick();
//!   manager.enumerate(&ticket, |pos, sector| draw(pos, sector));
//! }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod generation;
pub mod manager;
pub mod sector;
pub mod threading;

// Re-export commonly used items
pub use config::{DensityConfig, GalaxyConfig, LayerConfig, SystemConfig};
pub use constants::{sector_width, BASE_SIZE, BINARY_SYSTEM_SPACING_FACTOR, LEVEL_COUNT, ROOT_LEVEL};
pub use error::{ConfigError, GenerationError};
pub use generation::{Galaxy, InitialElement, StarSystem, StarSystemGenerator, StarSystemInfo};
pub use manager::{SectorManager, SectorTicket, SystemId, SystemTicket, TickStats};
pub use sector::{GalaxySector, SectorPos, SectorTicketInfo};
pub use threading::TaskExecutor;
