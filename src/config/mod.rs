// src/config/mod.rs

//! Pipeline file loading and validation.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a pipeline file from disk.
//! - `validate.rs`: dependency, dynamic-declaration and DAG checks.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ArrayConfig, ConfigFile, ConfigSection, DynamicConfig, RawConfigFile, TargetConfig,
};
pub use validate::validate_config;
