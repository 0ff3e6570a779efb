// Copyright 2018-2024 the Deno authors. MIT license.

use std::fmt;
use std::io;
use std::process::ExitStatus;

use thiserror::Error;

use crate::tokenizer::TokenizeError;
use crate::worker::StreamKind;
use crate::worker::WorkerState;

/// Broad category of an [`Error`].
///
/// `Validation` and `Parse` mean the caller's command line was bad, while
/// `Launch` and `Execution` point at the system or the target program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialization", serde(rename_all = "camelCase"))]
pub enum ErrorKind {
  Validation,
  Parse,
  Launch,
  Execution,
  State,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("command cannot be empty")]
  EmptyCommand,
  #[error("cannot parse cmdline: {0}")]
  Parse(#[from] TokenizeError),
  #[error("cannot launch '{program}': {source}")]
  Launch {
    program: String,
    #[source]
    source: io::Error,
  },
  #[error(transparent)]
  Exit(#[from] ExitError),
  #[error("failed waiting for process: {0}")]
  Wait(#[source] io::Error),
  #[error("process i/o failed: {0}")]
  Io(#[from] io::Error),
  #[error("cannot {operation} a worker that is {state}")]
  InvalidState {
    operation: &'static str,
    state: WorkerState,
  },
  #[error("{0} already set")]
  StreamAlreadySet(StreamKind),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::EmptyCommand => ErrorKind::Validation,
      Error::Parse(_) => ErrorKind::Parse,
      Error::Launch { .. } => ErrorKind::Launch,
      Error::Exit(_) | Error::Wait(_) | Error::Io(_) => ErrorKind::Execution,
      Error::InvalidState { .. } | Error::StreamAlreadySet(_) => {
        ErrorKind::State
      }
    }
  }

  /// The exit details when the process ran but did not exit cleanly.
  pub fn exit_error(&self) -> Option<&ExitError> {
    match self {
      Error::Exit(err) => Some(err),
      _ => None,
    }
  }
}

/// A process that exited with a non-zero status or was killed by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitError {
  code: Option<i32>,
  signal: Option<i32>,
}

impl ExitError {
  pub fn new(code: Option<i32>, signal: Option<i32>) -> Self {
    Self { code, signal }
  }

  /// Exit code, if the process exited normally.
  pub fn code(&self) -> Option<i32> {
    self.code
  }

  /// Signal number that terminated the process (unix only).
  pub fn signal(&self) -> Option<i32> {
    self.signal
  }
}

impl From<ExitStatus> for ExitError {
  fn from(status: ExitStatus) -> Self {
    #[cfg(unix)]
    let signal = {
      use std::os::unix::process::ExitStatusExt;
      status.signal()
    };
    #[cfg(not(unix))]
    let signal = None;

    Self {
      code: status.code(),
      signal,
    }
  }
}

impl fmt::Display for ExitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match (self.code, self.signal) {
      (Some(code), _) => write!(f, "exit status: {code}"),
      (None, Some(signal)) => match signal_name(signal) {
        Some(name) => write!(f, "terminated by signal {signal} ({name})"),
        None => write!(f, "terminated by signal {signal}"),
      },
      (None, None) => write!(f, "terminated abnormally"),
    }
  }
}

impl std::error::Error for ExitError {}

#[cfg(all(unix, feature = "local"))]
fn signal_name(signal: i32) -> Option<&'static str> {
  nix::sys::signal::Signal::try_from(signal)
    .ok()
    .map(|signal| signal.as_str())
}

#[cfg(not(all(unix, feature = "local")))]
fn signal_name(_signal: i32) -> Option<&'static str> {
  None
}

/// Failure of [`Worker::run`](crate::Worker::run) along with whatever
/// output was captured before it happened.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunError {
  pub lines: Vec<String>,
  #[source]
  pub error: Error,
}

impl RunError {
  pub fn new(lines: Vec<String>, error: Error) -> Self {
    Self { lines, error }
  }

  pub fn kind(&self) -> ErrorKind {
    self.error.kind()
  }

  pub fn into_parts(self) -> (Vec<String>, Error) {
    (self.lines, self.error)
  }
}
