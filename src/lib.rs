//! Retained-mode widget tree with incremental re-render, and a mesh buffer
//! pipeline for 3D scenes that follows the same make/update discipline.

pub mod config;
pub mod error;
pub mod scene;
pub mod style;
pub mod ui;
pub mod view;

#[cfg(test)]
mod test_log;

pub use config::{TraceConfig, TreeConfig};
pub use error::{GpuError, MeshError, ShapeInvalid, StyleParseError};
