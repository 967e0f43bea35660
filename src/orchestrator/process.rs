//! Child-process execution for the report generator.

use crate::error::AnalysisError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

/// A fully built command line plus how to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout: Duration,
}

/// What the child left behind once it exited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `-1` when the child was terminated by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Runs to completion. Timeout and launch failures are errors; a non-zero
    /// exit is a normal `ProcessOutput`.
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, AnalysisError>;
}

/// Runs the generator with `tokio::process`, killing it when the timeout elapses.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, AnalysisError> {
        let launch_err = |source: std::io::Error| AnalysisError::Launch {
            program: invocation.program.clone(),
            source,
        };

        let child = tokio::process::Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(launch_err)?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(invocation.timeout, child.wait_with_output())
            .await
            .map_err(|_| AnalysisError::TimedOut(invocation.timeout))?
            .map_err(launch_err)?;

        Ok(ProcessOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
