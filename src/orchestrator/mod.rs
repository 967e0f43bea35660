//! Report generator orchestration.
//!
//! This module owns the generator run lifecycle: command construction, process
//! execution with a timeout, the single retry without prompt flags, and post-run
//! discovery of the run directory. Web handlers call into `AnalysisService` and
//! only deal with the finished `AnalysisResult`.

mod capabilities;
mod command;
mod post_process;
mod process;
mod service;

pub use capabilities::{probe_prompt_flags, PromptFlagSupport};
pub use process::{Invocation, ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use service::AnalysisService;
