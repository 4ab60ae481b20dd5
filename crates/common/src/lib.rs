//! Shared types for the gridspace index.
//!
//! # Invariants
//! - Cell assignment is a pure function of `(x, z)` and the tile size, using floor division.
//! - A validated [`IndexConfig`] always has a finite, positive tile size.

mod config;
mod types;

pub use config::{ConfigError, IndexConfig};
pub use types::CellId;

pub fn crate_info() -> &'static str {
    "gridspace-common v0.1.0"
}
