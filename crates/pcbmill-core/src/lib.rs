//! # PCBMill Core
//!
//! Core types and the geometry kernel for PCBMill.
//! Provides the 2D data model (points, rings, paths, shapes), the
//! [`GeometryBackend`] capability used by toolpath generation, and the
//! board layer model produced by design-file loaders.

pub mod data;
pub mod error;
pub mod geometry;

pub use data::{BoardDescription, DrillHit, JsonBoardLoader, Layer, LayerClass, LayerSource};

pub use error::{Error, GeometryError, GeometryResult, LoadError, Result};

pub use geometry::{
    backend::GeometryBackend,
    kernel::{JoinStyle, KernelBackend},
    Path, Point, Ring, Shape,
};
