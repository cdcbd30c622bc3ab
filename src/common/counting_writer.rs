use std::io::{self, Write};

/// Wraps a `Write` and tracks the number of bytes written through it.
///
/// Used by the run writer and block store to record object offsets without
/// needing a separate `seek`/`tell` on the underlying writer.
pub struct CountingWriter<W> {
    underlying_writer: W,
    bytes_written: usize,
}

impl<W: Write> CountingWriter<W> {
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    pub fn into_inner(self) -> W {
        self.underlying_writer
    }
}

impl<W: Write> From<W> for CountingWriter<W> {
    fn from(writer: W) -> CountingWriter<W> {
        CountingWriter {
            underlying_writer: writer,
            bytes_written: 0,
        }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let extra_bytes_written = self.underlying_writer.write(buf)?;
        self.bytes_written += extra_bytes_written;
        Ok(extra_bytes_written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.underlying_writer.flush()
    }
}
