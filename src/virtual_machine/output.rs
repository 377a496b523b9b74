//! Host output sink used by `PRN` and `PRNCHAR`.
//!
//! The [`Output`] trait is the only channel through which a running program
//! talks to the outside world. Writes are delivered in program order with no
//! buffering contract beyond that.

use std::io::{self, Write};

/// Capability supplied by the host to receive program output.
pub trait Output {
    /// Writes a value's decimal text form.
    fn write_text(&mut self, text: &str) -> io::Result<()>;
    /// Writes a single character.
    fn write_char(&mut self, ch: char) -> io::Result<()>;
}

/// Adapts any [`io::Write`] (stdout, files, byte buffers) into an [`Output`].
///
/// Each write is flushed so output interleaves correctly with diagnostics on
/// other streams.
pub struct WriteOutput<W: Write> {
    inner: W,
}

impl<W: Write> WriteOutput<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Consumes the adapter and returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl WriteOutput<io::Stdout> {
    /// Sink writing to the process's standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Output for WriteOutput<W> {
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.inner.write_all(text.as_bytes())?;
        self.inner.flush()
    }

    fn write_char(&mut self, ch: char) -> io::Result<()> {
        let mut buf = [0u8; 4];
        self.inner.write_all(ch.encode_utf8(&mut buf).as_bytes())?;
        self.inner.flush()
    }
}

/// In-memory sink that records everything written to it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BufferOutput {
    text: String,
    writes: usize,
}

impl BufferOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// All output produced so far.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of individual writes received.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Output for BufferOutput {
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.text.push_str(text);
        self.writes += 1;
        Ok(())
    }

    fn write_char(&mut self, ch: char) -> io::Result<()> {
        self.text.push(ch);
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Sink whose every write fails, for exercising output error paths.
    pub struct FailingOutput;

    impl Output for FailingOutput {
        fn write_text(&mut self, _text: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
        }

        fn write_char(&mut self, _ch: char) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
        }
    }

    #[test]
    fn buffer_records_in_order() {
        let mut out = BufferOutput::new();
        out.write_char('H').unwrap();
        out.write_text("42").unwrap();
        out.write_char('é').unwrap();
        assert_eq!(out.as_str(), "H42é");
        assert_eq!(out.writes(), 3);
    }

    #[test]
    fn write_output_encodes_utf8() {
        let mut out = WriteOutput::new(Vec::new());
        out.write_text("9").unwrap();
        out.write_char('λ').unwrap();
        assert_eq!(out.into_inner(), "9λ".as_bytes());
    }
}
