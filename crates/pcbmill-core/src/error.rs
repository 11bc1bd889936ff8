//! Error handling for PCBMill core
//!
//! Provides the error types shared by every layer of the pipeline:
//! - Geometry errors (offset, union and polyline operations)
//! - Load errors (design-file loaders)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Geometry error type
///
/// Raised by the geometry kernel and by toolpath strategies when the
/// kernel output cannot be turned into cutter paths.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// The kernel returned geometry the caller cannot interpret
    #[error("Unsupported geometry result: {0}")]
    UnsupportedGeometry(String),

    /// The offset operation failed inside the kernel
    #[error("Offset by {radius} failed: {reason}")]
    OffsetFailed {
        /// The requested offset radius.
        radius: f64,
        /// Why the kernel gave up.
        reason: String,
    },

    /// A bridge between two paths has no usable contact segment
    #[error("Degenerate segment between paths {from} and {to}")]
    DegenerateSegment {
        /// Index of the path being extended.
        from: usize,
        /// Index of the path being attached.
        to: usize,
    },

    /// Input geometry is malformed (too few points, NaN coordinates)
    #[error("Invalid geometry input: {0}")]
    InvalidInput(String),
}

/// Design-file loader error type
#[derive(Error, Debug)]
pub enum LoadError {
    /// I/O error while reading the design file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The board description is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A layer failed validation
    #[error("Invalid layer '{layer}': {reason}")]
    InvalidLayer {
        /// The layer name.
        layer: String,
        /// Why the layer was rejected.
        reason: String,
    },
}

/// Main error type for PCBMill core
#[derive(Error, Debug)]
pub enum Error {
    /// Geometry error
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Loader error
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Result type for geometry operations
pub type GeometryResult<T> = std::result::Result<T, GeometryError>;

/// Result type for PCBMill core operations
pub type Result<T> = std::result::Result<T, Error>;
