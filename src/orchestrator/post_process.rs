//! Post-run processing.
//!
//! Stamps the completion time, discovers the run directory and its outputs, and
//! trims the generator's output for display.

use super::command::CommandSpec;
use super::process::ProcessOutput;
use crate::model::{AnalysisResult, RunOutputs, RunStatus};
use crate::runs::RunRepository;
use std::path::PathBuf;
use std::time::Duration;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::warn;

/// Lines of stdout/stderr kept on the result.
pub(crate) const TAIL_LINES: usize = 60;

/// Last `n` lines of `text`, newline-joined.
pub(crate) fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// `(generated_at, run_id)` for a completion time.
pub(crate) fn completion_stamps(at: OffsetDateTime) -> (String, String) {
    let generated_at = at
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .unwrap_or_else(|_| "now".into());
    let run_id = at
        .format(format_description!(
            "[year][month][day]_[hour][minute][second]"
        ))
        .unwrap_or_else(|_| "run".into());
    (generated_at, run_id)
}

/// Inputs collected while the generator ran.
pub(crate) struct CompletedRun<'a> {
    pub spec: &'a CommandSpec,
    pub output: ProcessOutput,
    pub duration: Duration,
    pub retried: bool,
}

/// Directory scan on the blocking pool; report folders can live on network shares.
async fn discover_run(run_repo: &RunRepository) -> (Option<PathBuf>, Option<RunOutputs>) {
    let repo = run_repo.clone();
    let scan = tokio::task::spawn_blocking(move || {
        let run_dir = repo.find_newest_run_dir();
        let outputs = run_dir.as_deref().map(|d| repo.pick_outputs(d));
        (run_dir, outputs)
    });
    match scan.await {
        Ok(found) => found,
        Err(e) => {
            warn!(error = %e, "run directory scan failed");
            (None, None)
        }
    }
}

/// Build the final result once the generator has exited.
pub(crate) async fn process_run_completion(
    run_repo: &RunRepository,
    completed: CompletedRun<'_>,
) -> AnalysisResult {
    let CompletedRun {
        spec,
        output,
        duration,
        retried,
    } = completed;

    let (generated_at, run_id) = completion_stamps(now());

    let (run_dir, outputs) = discover_run(run_repo).await;

    AnalysisResult {
        status: RunStatus::from_exit_code(output.exit_code),
        competitor: spec.competitor.clone(),
        baseline: spec.baseline.clone(),
        generated_at,
        duration: Duration::from_secs(duration.as_secs()),
        exit_code: output.exit_code,
        run_id,
        run_dir,
        outputs,
        stdout_tail: tail_lines(&output.stdout, TAIL_LINES),
        stderr_tail: tail_lines(&output.stderr, TAIL_LINES),
        retried_without_prompt_flags: retried,
    }
}
