//! # PCBMill CAM Tools
//!
//! This crate turns board geometry into G-code for PCB isolation milling,
//! drilling and outline cutting.
//!
//! ## Toolpaths
//!
//! - **Isolation**: cutter-centre rings around copper features
//! - **Holders**: outline paths with gaps that leave holding tabs
//! - **Path Connector**: bridges neighbouring closed paths into fewer passes
//! - **Ordering**: nearest-neighbour tours over paths and drill hits
//!
//! ## Motion
//!
//! - **Machine State**: position, mode and feed bookkeeping over a command sink
//! - **Cut Profile**: multi-pass depth ladders
//! - **Cut Orchestrator**: spindle, probe and per-operation sequencing

pub mod error;
pub mod gcode;
pub mod orchestrator;
pub mod toolpath;

pub use error::{
    CamToolError, CamToolResult, MotionError, MotionResult, ParameterError, ParameterResult,
};
pub use gcode::{
    Axes, CommandSink, CoordinateMode, CutProfile, FileSink, MachineConfig, MachineState,
    MotionCommand, SpindleDirection, WriterSink,
};
pub use orchestrator::{CutOrchestrator, Operation, OperationOutcome};
pub use toolpath::{
    DistanceMap, GeneratorSettings, HoldersToolpath, IsolationToolpath, PathConnector,
    PathObserver, ToolpathGenerator, ToolpathStrategy,
};
