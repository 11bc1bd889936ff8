//! Destinations for emitted motion commands.

use super::command::MotionCommand;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Line terminator written by stream sinks.
pub const LINE_ENDING: &str = "\r\n";

/// Append-only destination for motion commands.
pub trait CommandSink {
    fn emit(&mut self, command: &MotionCommand) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// In-memory sink, one string per line without terminator.
impl CommandSink for Vec<String> {
    fn emit(&mut self, command: &MotionCommand) -> io::Result<()> {
        self.push(command.to_string());
        Ok(())
    }
}

impl<S: CommandSink + ?Sized> CommandSink for &mut S {
    fn emit(&mut self, command: &MotionCommand) -> io::Result<()> {
        (**self).emit(command)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Writes each command followed by CR/LF.
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
    lines: usize,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, lines: 0 }
    }

    pub fn lines_written(&self) -> usize {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> CommandSink for WriterSink<W> {
    fn emit(&mut self, command: &MotionCommand) -> io::Result<()> {
        write!(self.writer, "{}{}", command, LINE_ENDING)?;
        self.lines += 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Buffered G-code file.
pub type FileSink = WriterSink<BufWriter<File>>;

impl WriterSink<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}
