// Copyright 2018-2024 the Deno authors. MIT license.

use std::io::Write;
use std::process::Stdio;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::process::Child;
use tokio::task::JoinHandle;

use crate::Error;
use crate::ExitError;
use crate::StreamKind;
use crate::Worker;
use crate::WorkerPipeReader;
use crate::WorkerPipeWriter;
use crate::WorkerState;
use crate::tokenizer::tokenize;

enum InputBinding {
  Null,
  Pipe(std::io::PipeReader),
}

enum OutputBinding {
  Null,
  Pipe(std::io::PipeWriter),
  Sink(Box<dyn Write + Send>),
}

type OutputCopy = (WorkerPipeReader, Box<dyn Write + Send>);

impl OutputBinding {
  fn into_stdio(self, copies: &mut Vec<OutputCopy>) -> std::io::Result<Stdio> {
    Ok(match self {
      OutputBinding::Null => Stdio::null(),
      OutputBinding::Pipe(writer) => writer.into(),
      OutputBinding::Sink(sink) => {
        let (reader, writer) = std::io::pipe()?;
        copies.push((WorkerPipeReader::from_raw(reader), sink));
        writer.into()
      }
    })
  }
}

/// Command that executes as a child process of the current process.
///
/// `start` has to be called from within a tokio runtime. Dropping a started
/// worker does not kill the child; tokio reaps it in the background.
pub struct LocalWorker {
  cmdline: String,
  argv: Vec<String>,
  state: WorkerState,
  stdin: InputBinding,
  stdout: OutputBinding,
  stderr: OutputBinding,
  child: Option<Child>,
  copy_tasks: Vec<JoinHandle<std::io::Result<()>>>,
}

impl LocalWorker {
  /// Tokenizes `cmdline` into the program and its arguments.
  ///
  /// Nothing is spawned until [`Worker::start`] is called.
  pub fn new(cmdline: impl Into<String>) -> Result<Self, Error> {
    let cmdline = cmdline.into();
    if cmdline.is_empty() {
      return Err(Error::EmptyCommand);
    }
    let argv = tokenize(&cmdline)?;
    if argv.is_empty() {
      return Err(Error::EmptyCommand);
    }
    Ok(Self {
      cmdline,
      argv,
      state: WorkerState::Created,
      stdin: InputBinding::Null,
      stdout: OutputBinding::Null,
      stderr: OutputBinding::Null,
      child: None,
      copy_tasks: Vec::new(),
    })
  }

  /// The program followed by its arguments.
  pub fn args(&self) -> &[String] {
    &self.argv
  }

  /// Process id of the child while it is running.
  pub fn id(&self) -> Option<u32> {
    self.child.as_ref().and_then(|child| child.id())
  }

  /// Forcefully terminates the started process. `wait` still has to be
  /// called to reap it and will report the termination.
  pub fn kill(&mut self) -> Result<(), Error> {
    match (&mut self.child, self.state) {
      (Some(child), WorkerState::Started) => {
        tracing::debug!(
          pid = ?child.id(),
          cmdline = %self.cmdline,
          "killing process"
        );
        child.start_kill().map_err(Error::Io)
      }
      _ => Err(Error::InvalidState {
        operation: "kill",
        state: self.state,
      }),
    }
  }

  fn ensure_created(&self, operation: &'static str) -> Result<(), Error> {
    if self.state == WorkerState::Created {
      Ok(())
    } else {
      Err(Error::InvalidState {
        operation,
        state: self.state,
      })
    }
  }

  fn output_binding(&mut self, kind: StreamKind) -> &mut OutputBinding {
    if kind == StreamKind::Stderr {
      &mut self.stderr
    } else {
      &mut self.stdout
    }
  }

  fn output_pipe(
    &mut self,
    kind: StreamKind,
    operation: &'static str,
  ) -> Result<WorkerPipeReader, Error> {
    self.ensure_created(operation)?;
    let binding = self.output_binding(kind);
    if !matches!(binding, OutputBinding::Null) {
      return Err(Error::StreamAlreadySet(kind));
    }
    let (reader, writer) = std::io::pipe()?;
    *binding = OutputBinding::Pipe(writer);
    Ok(WorkerPipeReader::from_raw(reader))
  }

  fn set_output(
    &mut self,
    kind: StreamKind,
    operation: &'static str,
    writer: Box<dyn Write + Send>,
  ) -> Result<(), Error> {
    self.ensure_created(operation)?;
    let binding = self.output_binding(kind);
    if matches!(binding, OutputBinding::Pipe(_)) {
      return Err(Error::StreamAlreadySet(kind));
    }
    *binding = OutputBinding::Sink(writer);
    Ok(())
  }

  fn spawn(&mut self) -> std::io::Result<()> {
    if tokio::runtime::Handle::try_current().is_err() {
      return Err(std::io::Error::other(
        "must be started from within a tokio runtime",
      ));
    }

    let mut copies = Vec::new();
    let stdin = match std::mem::replace(&mut self.stdin, InputBinding::Null) {
      InputBinding::Null => Stdio::null(),
      InputBinding::Pipe(reader) => reader.into(),
    };
    let stdout = std::mem::replace(&mut self.stdout, OutputBinding::Null)
      .into_stdio(&mut copies)?;
    let stderr = std::mem::replace(&mut self.stderr, OutputBinding::Null)
      .into_stdio(&mut copies)?;

    let mut command = tokio::process::Command::new(&self.argv[0]);
    command
      .args(&self.argv[1..])
      .stdin(stdin)
      .stdout(stdout)
      .stderr(stderr);
    let child = command.spawn()?;

    // avoid deadlock since this is holding onto the pipes
    drop(command);

    tracing::debug!(
      pid = ?child.id(),
      program = %self.argv[0],
      cmdline = %self.cmdline,
      "spawned process"
    );

    for (reader, mut sink) in copies {
      let task = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let copied = reader.pipe_to(&mut sink)?;
        sink.flush()?;
        tracing::trace!(bytes = copied, "finished copying process output");
        Ok(())
      });
      self.copy_tasks.push(task);
    }
    self.child = Some(child);
    Ok(())
  }

  async fn join_copy_tasks(&mut self) -> Result<(), Error> {
    let mut result = Ok(());
    // tasks are only removed once finished so a dropped `wait` can resume
    while let Some(task) = self.copy_tasks.first_mut() {
      let copied = match task.await {
        Ok(copied) => copied,
        Err(err) => Err(std::io::Error::other(err)),
      };
      self.copy_tasks.remove(0);
      if let Err(err) = copied
        && result.is_ok()
      {
        result = Err(Error::Io(err));
      }
    }
    result
  }
}

impl Worker for LocalWorker {
  fn start(&mut self) -> Result<(), Error> {
    self.ensure_created("start")?;
    match self.spawn() {
      Ok(()) => {
        self.state = WorkerState::Started;
        Ok(())
      }
      Err(source) => {
        self.state = WorkerState::Failed;
        Err(Error::Launch {
          program: self.argv[0].clone(),
          source,
        })
      }
    }
  }

  fn wait(&mut self) -> BoxFuture<'_, Result<(), Error>> {
    async move {
      let child = match (&mut self.child, self.state) {
        (Some(child), WorkerState::Started) => child,
        _ => {
          return Err(Error::InvalidState {
            operation: "wait",
            state: self.state,
          });
        }
      };
      let pid = child.id();
      let status = child.wait().await;
      // the sinks must have received everything before wait returns
      let copied = self.join_copy_tasks().await;
      self.child = None;
      self.state = WorkerState::Exited;

      let status = status.map_err(Error::Wait)?;
      tracing::debug!(?pid, %status, cmdline = %self.cmdline, "process exited");
      if !status.success() {
        let exit = ExitError::from(status);
        // a sink that failed closes the pipe under the child
        if let Err(err) = copied
          && is_broken_pipe(&exit)
        {
          return Err(err);
        }
        return Err(exit.into());
      }
      copied
    }
    .boxed()
  }

  fn stdin_pipe(&mut self) -> Result<WorkerPipeWriter, Error> {
    self.ensure_created("pipe stdin of")?;
    if !matches!(self.stdin, InputBinding::Null) {
      return Err(Error::StreamAlreadySet(StreamKind::Stdin));
    }
    let (reader, writer) = std::io::pipe()?;
    self.stdin = InputBinding::Pipe(reader);
    Ok(WorkerPipeWriter::from_raw(writer))
  }

  fn stdout_pipe(&mut self) -> Result<WorkerPipeReader, Error> {
    self.output_pipe(StreamKind::Stdout, "pipe stdout of")
  }

  fn stderr_pipe(&mut self) -> Result<WorkerPipeReader, Error> {
    self.output_pipe(StreamKind::Stderr, "pipe stderr of")
  }

  fn set_stdout(&mut self, writer: Box<dyn Write + Send>) -> Result<(), Error> {
    self.set_output(StreamKind::Stdout, "redirect stdout of", writer)
  }

  fn set_stderr(&mut self, writer: Box<dyn Write + Send>) -> Result<(), Error> {
    self.set_output(StreamKind::Stderr, "redirect stderr of", writer)
  }

  fn command_line(&self) -> &str {
    &self.cmdline
  }

  fn state(&self) -> WorkerState {
    self.state
  }
}

#[cfg(unix)]
fn is_broken_pipe(exit: &ExitError) -> bool {
  exit.signal() == Some(nix::sys::signal::Signal::SIGPIPE as i32)
}

#[cfg(not(unix))]
fn is_broken_pipe(_exit: &ExitError) -> bool {
  false
}

impl std::fmt::Debug for LocalWorker {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("LocalWorker")
      .field("cmdline", &self.cmdline)
      .field("argv", &self.argv)
      .field("state", &self.state)
      .field("pid", &self.id())
      .finish()
  }
}
