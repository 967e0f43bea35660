//! Saved input combinations ("presets") used to prefill the run form, plus the
//! built-in catalog of instruction presets.

use crate::error::PresetError;
use crate::model::Preset;
use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row};
use std::path::PathBuf;

/// Built-in instruction texts keyed by instruction-preset name.
const INSTRUCTION_CATALOG: &[(&str, &str)] = &[
    (
        "scoring",
        "Include a scoring table comparing baseline vs competitor on a 1–5 scale.\n\
         Add brief justification per criterion.\n\
         Summarize the top three differentiators based on the scores.",
    ),
    (
        "executive",
        "Write for an executive audience.\n\
         Start with a one-page executive summary.\n\
         Focus on business impact, cost, and risk. Avoid jargon.",
    ),
    (
        "technical",
        "Provide a detailed technical comparison.\n\
         Include architecture, integration complexity, scalability, and security.\n\
         Assume the reader is a technical architect.",
    ),
    (
        "evidence_strict",
        "Base conclusions strictly on the provided documents and websites.\n\
         If information is missing, state 'insufficient information'.\n\
         Do not infer capabilities without evidence.",
    ),
    (
        "slide",
        "Format the output to be slide-ready.\n\
         Use short bullet points; max 5 bullets per section.",
    ),
    (
        "risk",
        "Emphasize compliance, security, and regulatory considerations.\n\
         Highlight risks, gaps, and mitigations.\n\
         Include operational resilience.",
    ),
];

/// Instruction text for a built-in preset key; unknown keys have none.
pub fn instruction_text(key: &str) -> Option<&'static str> {
    INSTRUCTION_CATALOG
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, text)| *text)
}

#[async_trait]
pub trait PresetRepository: Send + Sync {
    /// Active presets, ordered by company then name.
    async fn active_presets(&self) -> Result<Vec<Preset>, PresetError>;

    /// One active preset; `None` when it does not exist or is inactive.
    async fn preset(&self, id: i64) -> Result<Option<Preset>, PresetError>;

    /// Distinct non-blank instruction-preset keys used by active presets.
    async fn instruction_presets(&self) -> Result<Vec<String>, PresetError>;
}

/// Stand-in when no preset database is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPresets;

#[async_trait]
impl PresetRepository for NoPresets {
    async fn active_presets(&self) -> Result<Vec<Preset>, PresetError> {
        Ok(Vec::new())
    }

    async fn preset(&self, _id: i64) -> Result<Option<Preset>, PresetError> {
        Ok(None)
    }

    async fn instruction_presets(&self) -> Result<Vec<String>, PresetError> {
        Ok(Vec::new())
    }
}

/// Reads presets from a SQLite table with the columns `preset_id`, `companyname`,
/// `preset_display_name`, `competitor`, `baseline`, `instruction_preset`,
/// `extra_instructions`, `source_file_path` and `is_active`.
#[derive(Debug, Clone)]
pub struct SqlitePresetRepository {
    database: PathBuf,
    table: String,
}

const PRESET_COLUMNS: &str = "preset_id, companyname, preset_display_name, competitor, baseline, \
     instruction_preset, extra_instructions, source_file_path";

fn text(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

fn preset_from_row(row: &Row<'_>) -> rusqlite::Result<Preset> {
    Ok(Preset {
        id: row.get(0)?,
        company_name: text(row, 1)?,
        display_name: text(row, 2)?,
        competitor: text(row, 3)?,
        baseline: text(row, 4)?,
        instruction_preset: text(row, 5)?,
        extra_instructions: text(row, 6)?,
        source_file_path: text(row, 7)?,
    })
}

impl SqlitePresetRepository {
    /// `table` must already be a validated identifier; it is interpolated into SQL.
    pub fn new(database: PathBuf, table: String) -> Self {
        Self { database, table }
    }

    fn connect(&self) -> rusqlite::Result<Connection> {
        Connection::open_with_flags(
            &self.database,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    }

    /// Run `f` against a fresh read-only connection on the blocking pool.
    async fn with_connection<T, F>(&self, f: F) -> Result<T, PresetError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &str) -> rusqlite::Result<T> + Send + 'static,
    {
        let repo = self.clone();
        let out = tokio::task::spawn_blocking(move || {
            let conn = repo.connect()?;
            f(&conn, &repo.table)
        })
        .await??;
        Ok(out)
    }
}

#[async_trait]
impl PresetRepository for SqlitePresetRepository {
    async fn active_presets(&self) -> Result<Vec<Preset>, PresetError> {
        self.with_connection(|conn, table| {
            let sql = format!(
                "SELECT {PRESET_COLUMNS} FROM {table} WHERE is_active = 1 \
                 ORDER BY companyname, preset_display_name"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], preset_from_row)?;
            rows.collect()
        })
        .await
    }

    async fn preset(&self, id: i64) -> Result<Option<Preset>, PresetError> {
        self.with_connection(move |conn, table| {
            let sql = format!(
                "SELECT {PRESET_COLUMNS} FROM {table} WHERE preset_id = ?1 AND is_active = 1"
            );
            conn.query_row(&sql, [id], preset_from_row).optional()
        })
        .await
    }

    async fn instruction_presets(&self) -> Result<Vec<String>, PresetError> {
        self.with_connection(|conn, table| {
            let sql = format!(
                "SELECT DISTINCT TRIM(instruction_preset) AS preset_key FROM {table} \
                 WHERE is_active = 1 AND instruction_preset IS NOT NULL \
                 AND TRIM(instruction_preset) <> '' ORDER BY preset_key"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect()
        })
        .await
    }
}
