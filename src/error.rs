//! Typed errors raised by the matching and resolution core.
//!
//! Loader and probe failures stay `anyhow` errors with file context; only the
//! conditions an installer must branch on get a dedicated type here.

use crate::BusType;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single dependency resolution call.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// A dependency chain leads back to a config already on the current path.
    ///
    /// `path` lists the chain from the resolved config to the repeated name,
    /// both ends included.
    #[error("dependency cycle detected: {}", path.join(" -> "))]
    CycleDetected { path: Vec<String> },
}

/// Rejection of a config while building a [`ConfigSet`](crate::ConfigSet).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error(
        "{bus} config '{name}' from {} collides with the one from {}",
        duplicate.display(),
        existing.display()
    )]
    NameCollision {
        bus: BusType,
        name: String,
        existing: PathBuf,
        duplicate: PathBuf,
    },

    #[error("config '{name}' is a {actual} config, expected {expected}")]
    BusMismatch {
        name: String,
        expected: BusType,
        actual: BusType,
    },
}
