//! Headless fly-through of a streamed galaxy.
//!
//! Moves a multi-level ticket along a straight line through the galaxy,
//! ticking the sector manager every step, then synthesises the first system
//! found around the end point and prints it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use glam::DVec3;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

use galaxy_plugin::{
  GalaxyConfig, SectorManager, SectorPos, SectorTicketInfo, StarSystem, SystemId, TickStats,
};

/// Streams sectors around a moving point and reports what was generated.
#[derive(Parser, Debug)]
#[command(name = "galaxy_demo")]
#[command(about = "Headless fly-through of a streamed galaxy")]
struct Args {
  /// Path to a galaxy TOML file (default: built-in galaxy).
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Override the universe seed.
  #[arg(short, long)]
  seed: Option<u64>,

  /// Number of ticks to run.
  #[arg(short, long, default_value_t = 120)]
  ticks: u32,

  /// Level-0 radius of the streamed region.
  #[arg(short, long, default_value_t = 48.0)]
  radius: f64,

  /// Distance travelled per tick.
  #[arg(long, default_value_t = 12.0)]
  speed: f64,
}

fn main() -> Result<()> {
  let args = Args::parse();

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let subscriber = Registry::default()
    .with(filter)
    .with(fmt::layer().compact().with_target(false));
  tracing::subscriber::set_global_default(subscriber).context("unable to install log subscriber")?;

  let mut config = match &args.config {
    Some(path) => GalaxyConfig::load(path)
      .with_context(|| format!("failed to load galaxy config {}", path.display()))?,
    None => GalaxyConfig::default(),
  };
  if let Some(seed) = args.seed {
    config = config.with_seed(seed);
  }
  tracing::info!(seed = config.seed, layers = config.layers.len(), "galaxy configured");

  let mut manager = SectorManager::new(&config);
  let start = DVec3::new(2_000.0, 0.0, 0.0);
  let direction = DVec3::new(1.0, 0.0, 0.5).normalize();
  let ticket = manager.create_sector_ticket(SectorTicketInfo::multi(start, args.radius, 0.0, 1.5));

  let mut total = TickStats::default();
  let mut center = start;
  for step in 0..args.ticks {
    center = start + direction * (args.speed * step as f64);
    manager.move_ticket(&ticket, center);
    let stats = manager.tick();
    total.merge(&stats);
  }

  // Finish whatever is still generating around the end point.
  let mut footprint = Vec::new();
  if let Some(info) = manager.ticket_info(&ticket) {
    info.for_each_sector(|pos| footprint.push(pos));
  }
  for pos in &footprint {
    manager.force_load_sector(pos);
  }

  let mut sectors = 0usize;
  let mut elements = 0usize;
  manager.enumerate(&ticket, |_, sector| {
    sectors += 1;
    elements += sector.initial_elements().map_or(0, |e| e.len());
  });

  println!("Galaxy seed {:#x}", config.seed);
  println!(
    "{} ticks: {} sector loads, {} unloads, {} tasks ({} cancelled), {:.1} ms generating",
    args.ticks,
    total.sector_loads,
    total.sector_unloads,
    total.dispatched,
    total.cancelled,
    total.generation_us as f64 / 1000.0
  );
  println!(
    "Around ({:.0}, {:.0}, {:.0}): {} sectors, {} star systems",
    center.x, center.y, center.z, sectors, elements
  );

  let Some(id) = first_system(&manager, &footprint) else {
    println!("No star systems in range.");
    return Ok(());
  };
  let _system_ticket = manager.create_system_ticket(Some(id));
  manager.tick();
  match manager.force_load_system(id) {
    Some(system) => print_system(&system),
    None => tracing::warn!(?id, "system synthesis produced nothing"),
  }
  Ok(())
}

fn first_system(manager: &SectorManager, footprint: &[SectorPos]) -> Option<SystemId> {
  footprint.iter().find_map(|pos| {
    let sector = manager.get_sector(pos)?;
    let count = sector.initial_elements()?.len();
    (count > 0).then(|| SystemId::new(*pos, 0))
  })
}

fn print_system(system: &StarSystem) {
  println!(
    "\n{} - age {:.2} Gyr, {:.2} Msun",
    system.info.name,
    system.info.age,
    system.total_mass()
  );
  for star in system.iter_stars() {
    println!(
      "  {:<2} {:>7.3} Msun {:>10.3} Lsun {:>7.0} K",
      star.class.letter(),
      star.mass,
      star.luminosity,
      star.temperature
    );
  }
  println!(
    "  {} stars, {} planets, {} stars without a stable orbit",
    system.star_count, system.planet_count, system.skipped_stars
  );
}
