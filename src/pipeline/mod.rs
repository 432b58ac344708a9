//! Pipeline entry points.
//!
//! - `run_pipeline`: one relay pass against the live site and Bot API
//! - `run_relay`: the same pass over injected feed, transport and store

pub mod relay;
pub mod watchdog;

pub use relay::{RunSummary, run_pipeline, run_relay};
pub use watchdog::{Deadline, arm_hard_kill};
