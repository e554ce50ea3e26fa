//! Shared framework for the Icinga/Nagios check plugins in this crate.
//!
//! Every check binary follows the same shape: parse the commandline, fetch
//! records from an external probe ([`CommandProbe`]), evaluate them against
//! thresholds or a fixed state table, and hand a [`Resource`] to the
//! [`Runner`], which prints exactly one status block and exits with the
//! matching code. Failures anywhere along the way end up as `UNKNOWN` rather
//! than a crash, because the monitoring host dispatches purely on the exit
//! code.

mod error;
mod exec;
pub mod icinga;
mod perfdata;
mod resource;
mod runner;
mod state;
mod thresholds;
pub mod util;

pub use crate::error::CheckError;
pub use crate::exec::{hostname, CommandProbe};
pub use crate::perfdata::{format_value, PerfData, Unit};
pub use crate::resource::Resource;
pub use crate::runner::{Runner, RunnerResult};
pub use crate::state::ServiceState;
pub use crate::thresholds::{Direction, Thresholds};
