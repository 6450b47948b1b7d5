//! Mesh loading and GPU geometry.
//!
//! - [`ModelBuilder`] holds CPU-side vertex and index data, optionally
//!   loaded from a Wavefront OBJ file.
//! - [`Model`] owns the device-local vertex and index buffers built from it.

pub mod error;
pub mod model;

pub use error::{ResourceError, ResourceResult};
pub use model::{Model, ModelBuilder};
pub use ember_rhi::vertex::Vertex;
