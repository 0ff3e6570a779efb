// Copyright 2018-2025 the Deno authors. MIT license.

use std::io::Read;
use std::io::Write;

/// Reader side of a pipe.
pub enum WorkerPipeReader {
  OsPipe(std::io::PipeReader),
  /// Any other byte stream, for backends that do not hand out OS pipes.
  Boxed(Box<dyn Read + Send>),
}

impl std::fmt::Debug for WorkerPipeReader {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::OsPipe(pipe) => f.debug_tuple("OsPipe").field(pipe).finish(),
      Self::Boxed(_) => f.write_str("Boxed"),
    }
  }
}

impl WorkerPipeReader {
  pub fn from_raw(reader: std::io::PipeReader) -> Self {
    Self::OsPipe(reader)
  }

  pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
    Self::Boxed(Box::new(reader))
  }

  #[cfg(test)]
  #[allow(clippy::should_implement_trait)]
  pub fn from_str(data: &str) -> Self {
    Self::from_reader(std::io::Cursor::new(data.as_bytes().to_vec()))
  }

  /// Pipe everything to the specified writer
  pub fn pipe_to(mut self, writer: &mut dyn Write) -> std::io::Result<u64> {
    std::io::copy(&mut self, writer)
  }

  /// Reads until the writer side is closed, replacing invalid UTF-8.
  pub fn read_to_string_lossy(self) -> std::io::Result<String> {
    let mut buf = Vec::new();
    self.pipe_to(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
  }
}

impl Read for WorkerPipeReader {
  fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
    match self {
      Self::OsPipe(pipe) => pipe.read(buf),
      Self::Boxed(reader) => reader.read(buf),
    }
  }
}

/// Writer side of a pipe.
///
/// Ensure that all of these are dropped when complete in order to
/// prevent deadlocks where the reader hangs waiting for a read.
pub enum WorkerPipeWriter {
  OsPipe(std::io::PipeWriter),
  Boxed(Box<dyn Write + Send>),
}

impl std::fmt::Debug for WorkerPipeWriter {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::OsPipe(pipe) => f.debug_tuple("OsPipe").field(pipe).finish(),
      Self::Boxed(_) => f.write_str("Boxed"),
    }
  }
}

impl WorkerPipeWriter {
  pub fn from_raw(writer: std::io::PipeWriter) -> Self {
    Self::OsPipe(writer)
  }

  pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
    Self::Boxed(Box::new(writer))
  }

  pub fn write_line(&mut self, line: &str) -> std::io::Result<()> {
    let bytes = format!("{line}\n");
    self.write_all(bytes.as_bytes())
  }
}

impl Write for WorkerPipeWriter {
  fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
    match self {
      Self::OsPipe(pipe) => pipe.write(buf),
      Self::Boxed(writer) => writer.write(buf),
    }
  }

  fn flush(&mut self) -> std::io::Result<()> {
    match self {
      Self::OsPipe(pipe) => pipe.flush(),
      Self::Boxed(writer) => writer.flush(),
    }
  }
}

/// Creates a connected OS pipe.
pub fn pipe() -> std::io::Result<(WorkerPipeReader, WorkerPipeWriter)> {
  let (reader, writer) = std::io::pipe()?;
  Ok((
    WorkerPipeReader::OsPipe(reader),
    WorkerPipeWriter::OsPipe(writer),
  ))
}
