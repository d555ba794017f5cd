//! Error types.
//!
//! Only recoverable conditions are represented here. Ticket bookkeeping
//! mistakes inside the manager are logged through `tracing` instead.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while reading or validating a [`GalaxyConfig`](crate::GalaxyConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
  /// The config file could not be read.
  #[error("failed to read config file {path}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The TOML did not match the config schema.
  #[error("failed to parse config TOML")]
  Parse(#[from] toml::de::Error),

  /// The config parsed but describes an unusable galaxy.
  #[error("invalid config: {0}")]
  Invalid(String),
}

/// Recoverable failure during procedural generation.
///
/// These never abort a whole sector or system; callers log them and carry on
/// with whatever was generated so far.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
  /// No orbit strategy produced a non-empty radius range for a star.
  #[error("no stable orbit for star of {mass:.3} solar masses")]
  NoValidOrbit { mass: f64 },

  /// A sampling range was inverted.
  #[error("empty range [{min}, {max}]")]
  EmptyRange { min: f64, max: f64 },
}
