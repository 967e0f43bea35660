//! One-time check of which optional flags the generator accepts.

use super::process::{Invocation, ProcessRunner};
use std::path::Path;
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Whether the generator understands `--instruction-preset` / `--extra-instructions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptFlagSupport {
    /// Not probed; flags are sent and the stderr retry covers old generators.
    #[default]
    Unknown,
    Supported,
    /// Flags are never sent.
    Unsupported,
}

/// Runs `<exe> --help` and looks for the prompt flags in its output.
pub async fn probe_prompt_flags(runner: &dyn ProcessRunner, exe_path: &Path) -> PromptFlagSupport {
    let invocation = Invocation {
        program: exe_path.to_path_buf(),
        args: vec!["--help".to_string()],
        cwd: exe_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
        timeout: PROBE_TIMEOUT,
    };

    match runner.run(&invocation).await {
        Ok(out) => {
            let text = format!("{}\n{}", out.stdout, out.stderr);
            let support = if text.contains("--extra-instructions") {
                PromptFlagSupport::Supported
            } else {
                PromptFlagSupport::Unsupported
            };
            tracing::info!(?support, exit_code = out.exit_code, "probed generator flags");
            support
        }
        Err(e) => {
            tracing::warn!(error = %e, "generator capability probe failed");
            PromptFlagSupport::Unknown
        }
    }
}
