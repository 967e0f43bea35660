use super::capabilities::PromptFlagSupport;
use super::command::{is_unrecognized_option, non_blank, CommandSpec};
use super::post_process::{process_run_completion, CompletedRun};
use super::process::{Invocation, ProcessOutput, ProcessRunner};
use crate::error::AnalysisError;
use crate::model::{AnalysisResult, RunRequest};
use crate::normalize::UrlNormalizer;
use crate::runs::RunRepository;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Runs the report generator for one request and assembles the result.
pub struct AnalysisService {
    exe_path: PathBuf,
    timeout: Duration,
    normalizer: Arc<dyn UrlNormalizer>,
    run_repo: RunRepository,
    runner: Arc<dyn ProcessRunner>,
    prompt_flags: PromptFlagSupport,
}

impl AnalysisService {
    pub fn new(
        exe_path: PathBuf,
        timeout: Duration,
        normalizer: Arc<dyn UrlNormalizer>,
        run_repo: RunRepository,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            exe_path,
            timeout,
            normalizer,
            run_repo,
            runner,
            prompt_flags: PromptFlagSupport::Unknown,
        }
    }

    pub fn with_prompt_flag_support(mut self, support: PromptFlagSupport) -> Self {
        self.prompt_flags = support;
        self
    }

    fn command_spec(&self, request: &RunRequest) -> Result<CommandSpec, AnalysisError> {
        let competitor = self.normalizer.normalize(&request.competitor);
        if competitor.is_empty() {
            return Err(AnalysisError::MissingCompetitor);
        }
        let baseline = if request.baseline.trim().is_empty() {
            String::new()
        } else {
            self.normalizer.normalize(&request.baseline)
        };

        let spec = CommandSpec {
            competitor,
            baseline,
            file: non_blank(&request.file),
            instruction_preset: non_blank(&request.instruction_preset),
            extra_instructions: non_blank(&request.extra_instructions),
        };
        if self.prompt_flags == PromptFlagSupport::Unsupported && spec.has_prompt_flags() {
            info!("generator does not accept prompt flags; omitting them");
            return Ok(spec.without_prompt_flags());
        }
        Ok(spec)
    }

    async fn execute(&self, spec: &CommandSpec) -> Result<ProcessOutput, AnalysisError> {
        let invocation = Invocation {
            program: self.exe_path.clone(),
            args: spec.args(),
            cwd: self
                .exe_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            timeout: self.timeout,
        };
        info!(
            program = %invocation.program.display(),
            args = invocation.args.len(),
            competitor = %spec.competitor,
            baseline = %spec.baseline,
            "starting report generator"
        );
        self.runner.run(&invocation).await
    }

    /// Normalize, execute (retrying once without prompt flags if the generator
    /// rejects them), then discover what the run produced.
    pub async fn run(&self, request: &RunRequest) -> Result<AnalysisResult, AnalysisError> {
        let spec = self.command_spec(request)?;

        let mut started = Instant::now();
        let mut output = self.execute(&spec).await?;
        let mut used = &spec;

        let fallback;
        let retry = output.exit_code != 0
            && spec.has_prompt_flags()
            && is_unrecognized_option(&output.stderr);
        if retry {
            warn!(
                exit_code = output.exit_code,
                "generator rejected prompt flags; retrying without them"
            );
            fallback = spec.without_prompt_flags();
            started = Instant::now();
            output = self.execute(&fallback).await?;
            used = &fallback;
        }
        let duration = started.elapsed();

        let result = process_run_completion(
            &self.run_repo,
            CompletedRun {
                spec: used,
                output,
                duration,
                retried: retry,
            },
        )
        .await;

        info!(
            run_id = %result.run_id,
            status = result.status.as_str(),
            exit_code = result.exit_code,
            duration = %humantime::format_duration(result.duration),
            run_dir = ?result.run_dir,
            "report generator finished"
        );
        Ok(result)
    }
}
