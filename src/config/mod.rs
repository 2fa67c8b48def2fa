// src/config/mod.rs

//! Build session configuration.
//!
//! - [`model`] is the TOML-backed data model.
//! - [`loader`] reads a session file from disk.
//! - [`validate`] turns a [`RawConfigFile`] into a checked [`ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{DEFAULT_CONFIG_FILE, load_and_validate, load_from_path};
pub use model::{ConfigFile, RawConfigFile, SessionSection, TargetConfig};
