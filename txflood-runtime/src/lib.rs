pub mod compose;
mod error;
pub mod graphite;
pub mod runtime;

pub use crate::error::RuntimeError;
pub use crate::runtime::{BenchRuntime, Cli, Command, LoadArgs, RunArgs};
