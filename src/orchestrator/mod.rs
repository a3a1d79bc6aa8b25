//! Application-level orchestration utilities.
//!
//! This module owns the workflow lifecycle (select/submit/reset) and post-result
//! processing such as auto-save, exports and frame extraction. UI/CLI layers
//! call into this module to keep responsibilities separated.

mod controller;
mod post_process;

pub(crate) use controller::{run_controller, UiCommand};
pub use post_process::ProcessedRun;
