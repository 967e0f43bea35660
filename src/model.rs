use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Raw inputs for one generator run, exactly as the user typed them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub competitor: String,
    #[serde(default)]
    pub baseline: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub extra_instructions: String,
    #[serde(default)]
    pub instruction_preset: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Ok,
    Failed,
}

impl RunStatus {
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            RunStatus::Ok
        } else {
            RunStatus::Failed
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Ok => "ok",
            RunStatus::Failed => "failed",
        }
    }
}

/// Report kinds the generator writes, one file per kind per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Html,
    Docx,
    Pptx,
    Md,
}

impl OutputKind {
    pub const ALL: [OutputKind; 4] = [
        OutputKind::Html,
        OutputKind::Docx,
        OutputKind::Pptx,
        OutputKind::Md,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            OutputKind::Html => "html",
            OutputKind::Docx => "docx",
            OutputKind::Pptx => "pptx",
            OutputKind::Md => "md",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OutputKind::Html => "HTML report",
            OutputKind::Docx => "Word document",
            OutputKind::Pptx => "PowerPoint deck",
            OutputKind::Md => "Markdown",
        }
    }
}

/// Files found in a run directory; each slot is absent when the generator did not write it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutputs {
    pub html: Option<PathBuf>,
    pub docx: Option<PathBuf>,
    pub pptx: Option<PathBuf>,
    pub md: Option<PathBuf>,
}

impl RunOutputs {
    pub fn get(&self, kind: OutputKind) -> Option<&PathBuf> {
        match kind {
            OutputKind::Html => self.html.as_ref(),
            OutputKind::Docx => self.docx.as_ref(),
            OutputKind::Pptx => self.pptx.as_ref(),
            OutputKind::Md => self.md.as_ref(),
        }
    }

    pub(crate) fn set(&mut self, kind: OutputKind, path: Option<PathBuf>) {
        match kind {
            OutputKind::Html => self.html = path,
            OutputKind::Docx => self.docx = path,
            OutputKind::Pptx => self.pptx = path,
            OutputKind::Md => self.md = path,
        }
    }

    /// Present outputs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (OutputKind, &PathBuf)> {
        OutputKind::ALL
            .into_iter()
            .filter_map(move |kind| self.get(kind).map(|p| (kind, p)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Outcome of one generator invocation. Built once by the orchestrator, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub status: RunStatus,
    pub competitor: String,
    pub baseline: String,
    /// Local completion time, `YYYY-MM-DD HH:MM:SS`.
    pub generated_at: String,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub exit_code: i32,
    /// Completion time as `YYYYMMDD_HHMMSS`; keys downloads for this run.
    pub run_id: String,
    pub run_dir: Option<PathBuf>,
    pub outputs: Option<RunOutputs>,
    pub stdout_tail: String,
    pub stderr_tail: String,
    #[serde(default)]
    pub retried_without_prompt_flags: bool,
}

impl AnalysisResult {
    pub fn is_ok(&self) -> bool {
        self.status == RunStatus::Ok
    }
}

/// A saved input combination used to prefill the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub id: i64,
    pub company_name: String,
    pub display_name: String,
    pub competitor: String,
    pub baseline: String,
    pub instruction_preset: String,
    pub extra_instructions: String,
    pub source_file_path: String,
}

impl Preset {
    /// Dropdown label: `"<company> - <name>"`, whichever half exists, or `"Preset <id>"`.
    pub fn label(&self) -> String {
        let company = self.company_name.trim();
        let name = self.display_name.trim();
        match (company.is_empty(), name.is_empty()) {
            (false, false) => format!("{company} - {name}"),
            (false, true) => company.to_string(),
            (true, false) => name.to_string(),
            (true, true) => format!("Preset {}", self.id),
        }
    }
}
