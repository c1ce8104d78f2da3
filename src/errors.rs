// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BranchdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Fan-out variables that must pair up element-wise have different sizes.
    #[error("dynamic target '{target}' has variables of unequal length: {details}")]
    ArityMismatch { target: String, details: String },

    /// A value or its metadata is not in the cache.
    #[error("missing cache entry for '{0}'")]
    MissingCacheEntry(String),

    #[error("invalid dynamic declaration: {0}")]
    InvalidDynamic(String),

    /// The build loop ran out of ready targets with work still queued.
    #[error("run stalled with targets still queued: {}", .0.join(", "))]
    Stalled(Vec<String>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BranchdagError>;
