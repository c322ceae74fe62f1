//! Restart loop orchestration.
//!
//! This module owns the launch lifecycle (discover, select, launch, repeat) and the
//! reporting done once the loop ends. CLI code calls into it with a finished
//! [`crate::model::RunConfig`].

mod cadence;
mod controller;
mod report;

pub(crate) use controller::{run_loop, RunFailure};
pub(crate) use report::{build_text_summary, export_json};
