//! Association Configuration Module
//!
//! Every radius, window, weight and kernel constant the engine uses, loaded
//! from TOML and validated before any work starts.
//!
//! ## Loading Order
//!
//! 1. `EQ_ASSOC_CONFIG` environment variable (path to TOML file)
//! 2. `assoc_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! The loaded config is immutable and passed by reference into each run.
//! Exploratory runs derive a new value instead of mutating shared state:
//!
//! ```ignore
//! let base = AssocConfig::load();
//! let wide = base.with_overrides(&ConfigOverrides {
//!     radius_km: Some(RadiusTable::uniform(20.0)),
//!     ..Default::default()
//! })?;
//! ```

mod assoc_config;
mod tables;
pub mod defaults;
pub mod validation;

pub use assoc_config::*;
pub use tables::*;
