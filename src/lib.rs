// Copyright 2018-2024 the Deno authors. MIT license.

#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]
#![deny(clippy::unused_async)]

pub mod tokenizer;

mod capture;
mod error;
mod pipe;
mod worker;

#[cfg(feature = "local")]
mod local;

pub use capture::CaptureMode;
pub use capture::run_with_capture;
pub use capture::split_lines;
pub use error::Error;
pub use error::ErrorKind;
pub use error::ExitError;
pub use error::RunError;
pub use pipe::WorkerPipeReader;
pub use pipe::WorkerPipeWriter;
pub use pipe::pipe;
pub use worker::Runner;
pub use worker::StreamKind;
pub use worker::Worker;
pub use worker::WorkerState;

#[cfg(feature = "local")]
pub use local::*;
