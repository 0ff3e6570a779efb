// Copyright 2018-2024 the Deno authors. MIT license.

use std::fmt;
use std::io::Write;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::Error;
use crate::RunError;
use crate::WorkerPipeReader;
use crate::WorkerPipeWriter;
use crate::capture::CaptureMode;
use crate::capture::run_with_capture;

/// Lifecycle of a [`Worker`].
///
/// `Created -> Started -> Exited`, or `Created -> Failed` when the process
/// could not be launched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialization", serde(rename_all = "camelCase"))]
pub enum WorkerState {
  #[default]
  Created,
  Started,
  Exited,
  Failed,
}

impl fmt::Display for WorkerState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      WorkerState::Created => "not started",
      WorkerState::Started => "already started",
      WorkerState::Exited => "already exited",
      WorkerState::Failed => "failed to launch",
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialization", serde(rename_all = "camelCase"))]
pub enum StreamKind {
  Stdin,
  Stdout,
  Stderr,
}

impl fmt::Display for StreamKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      StreamKind::Stdin => "stdin",
      StreamKind::Stdout => "stdout",
      StreamKind::Stderr => "stderr",
    })
  }
}

/// Creates workers for command lines on a particular backend.
pub trait Runner: Send + Sync {
  /// Validates and tokenizes `cmdline` and binds it to a worker that has
  /// not been started yet.
  fn command(&self, cmdline: &str) -> Result<Box<dyn Worker>, Error>;
}

/// A single external command, either not yet started or started.
///
/// Pipes and output sinks have to be bound before [`Worker::start`].
pub trait Worker: Send {
  /// Launches the process without waiting for it.
  fn start(&mut self) -> Result<(), Error>;

  /// Waits for the process to exit and for all bound sinks to receive
  /// its output.
  fn wait(&mut self) -> BoxFuture<'_, Result<(), Error>>;

  /// Starts the process, waits for it and returns its stdout as lines.
  fn run(&mut self) -> BoxFuture<'_, Result<Vec<String>, RunError>> {
    run_with_capture(self, CaptureMode::Stdout).boxed()
  }

  /// Write end connected to the process's stdin. Drop it to close stdin.
  fn stdin_pipe(&mut self) -> Result<WorkerPipeWriter, Error>;

  fn stdout_pipe(&mut self) -> Result<WorkerPipeReader, Error>;

  fn stderr_pipe(&mut self) -> Result<WorkerPipeReader, Error>;

  /// Copies the process's stdout into `writer` as it is produced.
  fn set_stdout(&mut self, writer: Box<dyn Write + Send>) -> Result<(), Error>;

  /// Copies the process's stderr into `writer` as it is produced.
  fn set_stderr(&mut self, writer: Box<dyn Write + Send>) -> Result<(), Error>;

  /// The command line exactly as it was given to the runner.
  fn command_line(&self) -> &str;

  fn state(&self) -> WorkerState;
}
