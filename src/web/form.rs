//! Form fields and how they combine with a selected preset.

use crate::model::{Preset, RunRequest};
use crate::presets::instruction_text;
use serde::Deserialize;

/// Fields posted by the run form. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunForm {
    pub competitor: String,
    pub baseline: String,
    pub file: String,
    pub preset_id: String,
    pub instruction_preset: String,
    pub extra_instructions: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IndexQuery {
    pub preset_id: String,
}

/// Only plain digit strings are preset ids.
pub fn parse_preset_id(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn or_preset(value: &str, fallback: Option<&str>) -> String {
    let value = value.trim();
    if value.is_empty() {
        fallback.unwrap_or_default().trim().to_string()
    } else {
        value.to_string()
    }
}

/// Combine form input, the selected preset and the configured default into a run request.
///
/// Blank form fields take the preset's value. Extra instructions are the
/// catalog text for the instruction preset followed by the free text, or the
/// configured default when both are empty.
pub fn resolve_request(form: &RunForm, preset: Option<&Preset>, default_extra: &str) -> RunRequest {
    let competitor = or_preset(&form.competitor, preset.map(|p| p.competitor.as_str()));
    let baseline = or_preset(&form.baseline, preset.map(|p| p.baseline.as_str()));
    let file = or_preset(&form.file, preset.map(|p| p.source_file_path.as_str()));
    let instruction_preset = or_preset(
        &form.instruction_preset,
        preset.map(|p| p.instruction_preset.as_str()),
    );
    let free_text = or_preset(
        &form.extra_instructions,
        preset.map(|p| p.extra_instructions.as_str()),
    );

    let parts: Vec<&str> = [
        instruction_text(&instruction_preset).unwrap_or_default(),
        free_text.as_str(),
    ]
    .into_iter()
    .filter(|t| !t.is_empty())
    .collect();
    let mut extra_instructions = parts.join("\n\n").trim().to_string();
    if extra_instructions.is_empty() {
        extra_instructions = default_extra.trim().to_string();
    }

    RunRequest {
        competitor,
        baseline,
        file,
        extra_instructions,
        instruction_preset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preset() -> Preset {
        Preset {
            id: 2,
            company_name: "Acme".into(),
            display_name: "Q3".into(),
            competitor: "acme".into(),
            baseline: "rival.com".into(),
            instruction_preset: "risk".into(),
            extra_instructions: "Mind GDPR.".into(),
            source_file_path: "/data/acme.pdf".into(),
        }
    }

    #[test]
    fn preset_id_must_be_digits() {
        assert_eq!(parse_preset_id("42"), Some(42));
        assert_eq!(parse_preset_id(" 7 "), Some(7));
        assert_eq!(parse_preset_id("-1"), None);
        assert_eq!(parse_preset_id("4a"), None);
        assert_eq!(parse_preset_id(""), None);
    }

    #[test]
    fn blank_fields_fall_back_to_preset() {
        let req = resolve_request(&RunForm::default(), Some(&preset()), "default text");
        assert_eq!(req.competitor, "acme");
        assert_eq!(req.baseline, "rival.com");
        assert_eq!(req.file, "/data/acme.pdf");
        assert_eq!(req.instruction_preset, "risk");
        let risk = instruction_text("risk").unwrap();
        assert_eq!(req.extra_instructions, format!("{risk}\n\nMind GDPR."));
    }

    #[test]
    fn form_values_win_over_preset() {
        let form = RunForm {
            competitor: "globex".into(),
            instruction_preset: "unknown-key".into(),
            extra_instructions: "Only pricing.".into(),
            ..Default::default()
        };
        let req = resolve_request(&form, Some(&preset()), "default text");
        assert_eq!(req.competitor, "globex");
        assert_eq!(req.baseline, "rival.com");
        assert_eq!(req.instruction_preset, "unknown-key");
        assert_eq!(req.extra_instructions, "Only pricing.");
    }

    #[test]
    fn configured_default_fills_empty_instructions() {
        let form = RunForm {
            competitor: "acme".into(),
            ..Default::default()
        };
        let req = resolve_request(&form, None, "  Keep it short. ");
        assert_eq!(req.extra_instructions, "Keep it short.");
        assert_eq!(req.instruction_preset, "");
        assert_eq!(req.baseline, "");
    }
}
