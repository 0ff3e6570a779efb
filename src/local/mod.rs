// Copyright 2018-2024 the Deno authors. MIT license.

mod runner;
mod worker;

pub use runner::LocalRunner;
pub use worker::LocalWorker;

#[cfg(all(test, unix))]
mod test_builder;
