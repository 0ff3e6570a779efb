// Copyright 2018-2024 the Deno authors. MIT license.

use crate::Error;
use crate::LocalWorker;
use crate::Runner;
use crate::Worker;

/// Runs commands as child processes on this machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalRunner;

impl LocalRunner {
  pub fn new() -> Self {
    Self
  }
}

impl Runner for LocalRunner {
  fn command(&self, cmdline: &str) -> Result<Box<dyn Worker>, Error> {
    Ok(Box::new(LocalWorker::new(cmdline)?))
  }
}
