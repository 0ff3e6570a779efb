// Copyright 2018-2024 the Deno authors. MIT license.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::Error;
use crate::RunError;
use crate::Worker;

/// Which streams [`run_with_capture`] collects.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialization", serde(rename_all = "camelCase"))]
pub enum CaptureMode {
  #[default]
  Stdout,
  /// Stdout and stderr interleaved in the order chunks arrive.
  Combined,
}

/// Sink shared by the copy tasks of a worker and the caller.
#[derive(Debug, Default, Clone)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
  fn take(&self) -> Vec<u8> {
    std::mem::take(&mut *self.0.lock())
  }
}

impl Write for SharedBuffer {
  fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
    self.0.lock().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> std::io::Result<()> {
    Ok(())
  }
}

/// Starts `worker`, waits for it and returns the captured output as lines.
///
/// Works with any backend. On failure the returned [`RunError`] still holds
/// the lines captured before the process exited. When the process cannot be
/// started the start error is returned and no wait is attempted.
pub async fn run_with_capture<W: Worker + ?Sized>(
  worker: &mut W,
  mode: CaptureMode,
) -> Result<Vec<String>, RunError> {
  let buffer = SharedBuffer::default();
  let result = capture_into(worker, mode, &buffer).await;
  let lines = split_lines(&buffer.take());
  match result {
    Ok(()) => Ok(lines),
    Err(error) => Err(RunError::new(lines, error)),
  }
}

async fn capture_into<W: Worker + ?Sized>(
  worker: &mut W,
  mode: CaptureMode,
  buffer: &SharedBuffer,
) -> Result<(), Error> {
  worker.set_stdout(Box::new(buffer.clone()))?;
  if mode == CaptureMode::Combined {
    worker.set_stderr(Box::new(buffer.clone()))?;
  }
  worker.start()?;
  worker.wait().await
}

/// Splits process output on `\n`.
///
/// A trailing newline does not produce an empty last line. Nothing else is
/// trimmed, so a `\r` before the newline stays part of the line. Invalid
/// UTF-8 is replaced.
pub fn split_lines(output: &[u8]) -> Vec<String> {
  if output.is_empty() {
    return Vec::new();
  }
  let output = output.strip_suffix(b"\n").unwrap_or(output);
  output
    .split(|b| *b == b'\n')
    .map(|line| String::from_utf8_lossy(line).to_string())
    .collect()
}
