//! Generator command-line construction.

/// Stderr fragments that mean the generator rejected a flag it does not know.
const UNRECOGNIZED_OPTION_MARKERS: [&str; 3] = [
    "unrecognized arguments",
    "unknown option",
    "unrecognized option",
];

/// Normalized inputs for one generator call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CommandSpec {
    pub competitor: String,
    /// Passed even when empty; an empty value disables the generator's own default baseline.
    pub baseline: String,
    pub file: Option<String>,
    pub instruction_preset: Option<String>,
    pub extra_instructions: Option<String>,
}

impl CommandSpec {
    pub fn has_prompt_flags(&self) -> bool {
        self.instruction_preset.is_some() || self.extra_instructions.is_some()
    }

    /// Same inputs without `--instruction-preset` / `--extra-instructions`.
    pub fn without_prompt_flags(&self) -> Self {
        Self {
            instruction_preset: None,
            extra_instructions: None,
            ..self.clone()
        }
    }

    /// Arguments after the program path.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--competitor".to_string(),
            self.competitor.clone(),
            "--baseline".to_string(),
            self.baseline.clone(),
        ];
        let optional = [
            ("--file", &self.file),
            ("--instruction-preset", &self.instruction_preset),
            ("--extra-instructions", &self.extra_instructions),
        ];
        for (flag, value) in optional {
            if let Some(v) = value {
                args.push(flag.to_string());
                args.push(v.clone());
            }
        }
        args
    }
}

/// `Some(trimmed)` for non-blank input.
pub(crate) fn non_blank(raw: &str) -> Option<String> {
    let t = raw.trim();
    (!t.is_empty()).then(|| t.to_string())
}

pub(crate) fn is_unrecognized_option(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    UNRECOGNIZED_OPTION_MARKERS
        .iter()
        .any(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_baseline_flag_is_still_passed() {
        let spec = CommandSpec {
            competitor: "https://acme.com".into(),
            ..Default::default()
        };
        assert_eq!(
            spec.args(),
            vec!["--competitor", "https://acme.com", "--baseline", ""]
        );
    }

    #[test]
    fn optional_flags_follow_in_order() {
        let spec = CommandSpec {
            competitor: "https://a.com".into(),
            baseline: "https://b.com".into(),
            file: Some("/data/brief.pdf".into()),
            instruction_preset: Some("executive".into()),
            extra_instructions: Some("Be brief.".into()),
        };
        assert_eq!(
            spec.args(),
            vec![
                "--competitor",
                "https://a.com",
                "--baseline",
                "https://b.com",
                "--file",
                "/data/brief.pdf",
                "--instruction-preset",
                "executive",
                "--extra-instructions",
                "Be brief.",
            ]
        );
        let stripped = spec.without_prompt_flags();
        assert!(!stripped.has_prompt_flags());
        assert_eq!(stripped.file.as_deref(), Some("/data/brief.pdf"));
    }

    #[test]
    fn detects_rejected_flags_case_insensitively() {
        assert!(is_unrecognized_option(
            "usage: gen [-h]\ngen: error: unrecognized arguments: --extra-instructions x"
        ));
        assert!(is_unrecognized_option("Error: Unknown option '--instruction-preset'"));
        assert!(is_unrecognized_option("UNRECOGNIZED OPTION --foo"));
        assert!(!is_unrecognized_option("network unreachable"));
    }

    #[test]
    fn non_blank_trims() {
        assert_eq!(non_blank("  x "), Some("x".to_string()));
        assert_eq!(non_blank(" \n"), None);
    }
}
