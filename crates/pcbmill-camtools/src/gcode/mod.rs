//! G-code emission: command vocabulary, sinks, depth ladders and the
//! motion state machine.

pub mod command;
pub mod machine;
pub mod profile;
pub mod sink;

pub use command::{Axes, MotionCommand, SpindleDirection};
pub use machine::{CoordinateMode, MachineConfig, MachineState};
pub use profile::CutProfile;
pub use sink::{CommandSink, FileSink, WriterSink};
