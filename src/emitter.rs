//! Emitter sinks for the dump stream.
//!
//! Two fixed wire formats: `line` (one JSON object per line) and `json`
//! (a single bracketed array, one tab of indentation per element). The
//! in-memory sink backs the test suite's dump inspection.

use crate::error::{IndexError, IndexResult};
use crate::graph::Element;
use std::io::Write;

pub trait Emitter {
    fn emit(&mut self, element: &Element) -> IndexResult<()>;

    /// Finish the stream. Must be called exactly once, after all elements.
    fn end(&mut self) -> IndexResult<()>;
}

/// One JSON object per line, no surrounding brackets.
pub struct LineEmitter<W: Write> {
    writer: W,
}

impl<W: Write> LineEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> Emitter for LineEmitter<W> {
    fn emit(&mut self, element: &Element) -> IndexResult<()> {
        serde_json::to_writer(&mut self.writer, element)?;
        self.writer
            .write_all(b"\n")
            .map_err(|source| IndexError::General(format!("dump write failed: {source}")))?;
        Ok(())
    }

    fn end(&mut self) -> IndexResult<()> {
        self.writer
            .flush()
            .map_err(|source| IndexError::General(format!("dump flush failed: {source}")))
    }
}

/// A single JSON array: elements separated by a comma and newline, each
/// preceded by one tab, closed by a `]` line.
pub struct JsonEmitter<W: Write> {
    writer: W,
    first: bool,
}

impl<W: Write> JsonEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            first: true,
        }
    }
}

impl<W: Write> Emitter for JsonEmitter<W> {
    fn emit(&mut self, element: &Element) -> IndexResult<()> {
        let io_err =
            |source: std::io::Error| IndexError::General(format!("dump write failed: {source}"));
        if self.first {
            self.writer.write_all(b"[\n").map_err(io_err)?;
            self.first = false;
        } else {
            self.writer.write_all(b",\n").map_err(io_err)?;
        }
        self.writer.write_all(b"\t").map_err(io_err)?;
        serde_json::to_writer(&mut self.writer, element)?;
        Ok(())
    }

    fn end(&mut self) -> IndexResult<()> {
        let io_err =
            |source: std::io::Error| IndexError::General(format!("dump write failed: {source}"));
        if self.first {
            // Empty dump still produces a valid array.
            self.writer.write_all(b"[\n").map_err(io_err)?;
        }
        self.writer.write_all(b"\n]\n").map_err(io_err)?;
        self.writer.flush().map_err(io_err)
    }
}

/// Collects elements in memory; used by tests and the validation pass.
#[derive(Default)]
pub struct MemoryEmitter {
    pub elements: Vec<Element>,
    ended: bool,
}

impl MemoryEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ended(&self) -> bool {
        self.ended
    }
}

impl Emitter for MemoryEmitter {
    fn emit(&mut self, element: &Element) -> IndexResult<()> {
        self.elements.push(element.clone());
        Ok(())
    }

    fn end(&mut self) -> IndexResult<()> {
        self.ended = true;
        Ok(())
    }
}
