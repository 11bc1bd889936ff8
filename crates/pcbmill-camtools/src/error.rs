//! Error types for the CAM tools crate.
//!
//! This module provides structured error types for toolpath generation,
//! parameter validation and motion emission.

use pcbmill_core::GeometryError;
use std::io;
use thiserror::Error;

/// Errors that can occur during CAM tool operations.
#[derive(Error, Debug)]
pub enum CamToolError {
    /// Invalid parameters were provided to a CAM tool.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// A depth ladder that cannot be executed.
    #[error("Invalid cut profile: start {start}, end {end}, step {step}")]
    InvalidCutProfile { start: f64, end: f64, step: f64 },

    /// `generate` was called before any tool was added.
    #[error("No tool selected")]
    NoToolSelected,

    /// A geometry operation failed during toolpath creation.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Motion emission failed.
    #[error("Motion error: {0}")]
    Motion(#[from] MotionError),

    /// A parameter validation error occurred.
    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),
}

/// Errors related to CAM tool parameter validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// A parameter value is out of the valid range.
    #[error("Parameter '{name}' out of range: {value} (valid: {min}..{max})")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A parameter value is invalid.
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: String, reason: String },

    /// Parameters are mutually incompatible.
    #[error("Incompatible parameters: {0}")]
    Incompatible(String),
}

/// Errors raised by the machine state while emitting commands.
#[derive(Error, Debug)]
pub enum MotionError {
    /// A relative move needs the current position of this axis.
    #[error("Position of axis {axis} is unknown")]
    UnknownPosition { axis: char },

    /// The command sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for CAM tool operations.
pub type CamToolResult<T> = Result<T, CamToolError>;

/// Result type alias for parameter validation.
pub type ParameterResult<T> = Result<T, ParameterError>;

/// Result type alias for motion emission.
pub type MotionResult<T> = Result<T, MotionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cam_tool_error_display() {
        let err = CamToolError::InvalidParameters("depth must be positive".to_string());
        assert_eq!(err.to_string(), "Invalid parameters: depth must be positive");

        let err = CamToolError::InvalidCutProfile {
            start: 0.0,
            end: 1.65,
            step: 0.0,
        };
        assert_eq!(
            err.to_string(),
            "Invalid cut profile: start 0, end 1.65, step 0"
        );

        assert_eq!(CamToolError::NoToolSelected.to_string(), "No tool selected");
    }

    #[test]
    fn test_parameter_error_display() {
        let err = ParameterError::OutOfRange {
            name: "decimals".to_string(),
            value: 12.0,
            min: 0.0,
            max: 9.0,
        };
        assert_eq!(
            err.to_string(),
            "Parameter 'decimals' out of range: 12 (valid: 0..9)"
        );
    }

    #[test]
    fn test_error_conversion() {
        let cam_err: CamToolError = ParameterError::Incompatible("x".to_string()).into();
        assert!(matches!(cam_err, CamToolError::Parameter(_)));

        let cam_err: CamToolError = GeometryError::InvalidInput("ring".to_string()).into();
        assert!(matches!(cam_err, CamToolError::Geometry(_)));

        let cam_err: CamToolError = MotionError::UnknownPosition { axis: 'X' }.into();
        assert_eq!(cam_err.to_string(), "Motion error: Position of axis X is unknown");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "closed");
        let motion: MotionError = io_err.into();
        assert!(matches!(motion, MotionError::Io(_)));
    }
}
