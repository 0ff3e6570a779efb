// Copyright 2018-2024 the Deno authors. MIT license.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use crate::Error;
use crate::LocalRunner;
use crate::Runner;

/// Collects whatever a worker writes into it.
#[derive(Debug, Default, Clone)]
pub struct OutputBuffer(Arc<Mutex<Vec<u8>>>);

impl OutputBuffer {
  pub fn text(&self) -> String {
    String::from_utf8_lossy(&self.0.lock()).to_string()
  }
}

impl Write for OutputBuffer {
  fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
    self.0.lock().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> std::io::Result<()> {
    Ok(())
  }
}

pub struct TestBuilder {
  // it is much much faster to lazily create this
  temp_dir: Option<tempfile::TempDir>,
  command: String,
  stdin: Option<Vec<u8>>,
  expected_exit_code: i32,
  expected_stderr: String,
  expected_stdout: String,
  expected_files: Vec<(String, String)>,
}

impl TestBuilder {
  pub fn new() -> Self {
    Self {
      temp_dir: None,
      command: Default::default(),
      stdin: None,
      expected_exit_code: 0,
      expected_stderr: Default::default(),
      expected_stdout: Default::default(),
      expected_files: Default::default(),
    }
  }

  fn temp_dir_path(&mut self) -> PathBuf {
    self
      .temp_dir
      .get_or_insert_with(|| tempfile::tempdir().unwrap())
      .path()
      .to_path_buf()
  }

  /// `$TEMP_DIR` in the command is replaced with the test's temp directory.
  pub fn command(&mut self, command: &str) -> &mut Self {
    self.command = command.to_string();
    self
  }

  pub fn stdin(&mut self, stdin: &str) -> &mut Self {
    self.stdin = Some(stdin.as_bytes().to_vec());
    self
  }

  pub fn file(&mut self, path: &str, text: &str) -> &mut Self {
    let temp_dir = self.temp_dir_path();
    fs::write(temp_dir.join(path), text).unwrap();
    self
  }

  pub fn assert_exit_code(&mut self, code: i32) -> &mut Self {
    self.expected_exit_code = code;
    self
  }

  pub fn assert_stderr(&mut self, output: &str) -> &mut Self {
    self.expected_stderr.push_str(output);
    self
  }

  pub fn assert_stdout(&mut self, output: &str) -> &mut Self {
    self.expected_stdout.push_str(output);
    self
  }

  pub fn assert_file_equals(
    &mut self,
    path: &str,
    file_text: &str,
  ) -> &mut Self {
    self.temp_dir_path();
    self
      .expected_files
      .push((path.to_string(), file_text.to_string()));
    self
  }

  pub async fn run(&mut self) {
    let temp_dir = match &self.temp_dir {
      Some(temp_dir) => temp_dir.path().display().to_string(),
      None => "NO_TEMP_DIR".to_string(),
    };
    let command = self.command.replace("$TEMP_DIR", &temp_dir);
    let mut worker = LocalRunner::new().command(&command).unwrap();
    assert_eq!(worker.command_line(), command);

    let stdin = match &self.stdin {
      Some(data) => Some((worker.stdin_pipe().unwrap(), data.clone())),
      None => None,
    };
    let stdout = OutputBuffer::default();
    let stderr = OutputBuffer::default();
    worker.set_stdout(Box::new(stdout.clone())).unwrap();
    worker.set_stderr(Box::new(stderr.clone())).unwrap();

    worker.start().unwrap();
    if let Some((mut writer, data)) = stdin {
      writer.write_all(&data).unwrap();
      drop(writer); // prevent a deadlock by dropping the writer
    }
    let exit_code = match worker.wait().await {
      Ok(()) => 0,
      Err(Error::Exit(err)) => err.code().unwrap_or(-1),
      Err(err) => panic!("\n\nFailed for: {}\n{:#}", self.command, err),
    };

    assert_eq!(
      stderr.text(),
      self.expected_stderr,
      "\n\nFailed for: {}",
      self.command
    );
    assert_eq!(
      stdout.text(),
      self.expected_stdout,
      "\n\nFailed for: {}",
      self.command
    );
    assert_eq!(
      exit_code, self.expected_exit_code,
      "\n\nFailed for: {}",
      self.command
    );

    for (path, text) in &self.expected_files {
      let file_path = self.temp_dir.as_ref().unwrap().path().join(path);
      let actual_text = fs::read_to_string(file_path)
        .with_context(|| format!("Error reading {path}"))
        .unwrap();
      assert_eq!(
        &actual_text, text,
        "\n\nFailed for: {}\nPath: {}",
        self.command, path,
      );
    }
  }
}
