//! # Basalt config
//!
//! Configuration of the Basalt node: total `Config` struct with
//! per-section defaults, and loaders to populate it from a TOML file.

/// The total configuration object
pub mod config;
/// Default values for every configuration param
pub mod defaults;
/// Loaders of configuration from external sources
pub mod loaders;
