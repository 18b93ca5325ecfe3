#![doc = include_str!("../README.md")]

pub mod backlog;
mod bench;
mod error;
pub mod meter;
pub mod probe;
pub mod sender;
pub mod throttle;
pub mod transaction;

pub use bench::run_load;
pub use error::BenchError;
#[doc(hidden)]
pub use txflood_core as core;

pub mod prelude {
    pub use crate::backlog::{BacklogSource, ConfiguredBacklog, HttpBacklog};
    pub use crate::probe::wait_for_up;
    pub use crate::sender::{HttpSubmitter, Submitter};
    pub use crate::transaction::{Transaction, TransactionFactory};
    pub use crate::{run_load, BenchError};
    pub use txflood_core::{BenchConfig, RunStatistics};
}
