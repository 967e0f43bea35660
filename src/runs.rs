//! Run directory discovery and the run-id → directory registry used by downloads.
//!
//! The generator writes each run into `<prefix><suffix>/` under either the
//! reports base or its own directory. Nothing here creates or deletes those
//! directories; the newest one is picked by modification time right after the
//! generator exits.

use crate::model::{OutputKind, RunOutputs};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

pub const DEFAULT_RUN_PREFIX: &str = "comparison_report_";

#[derive(Debug, Clone)]
pub struct RunRepository {
    reports_base: PathBuf,
    exe_dir: PathBuf,
    prefix: String,
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Newest matching sub-directory of `base`, with its mtime.
fn newest_run_dir_in(base: &Path, prefix: &str) -> Option<(PathBuf, SystemTime)> {
    let entries = fs::read_dir(base).ok()?;
    let mut best: Option<(PathBuf, SystemTime)> = None;
    for entry in entries.flatten() {
        if !entry.file_name().to_string_lossy().starts_with(prefix) {
            continue;
        }
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(mtime) = modified(&path) else {
            continue;
        };
        // `>=` keeps the last of equal timestamps, like max().
        if best.as_ref().map_or(true, |(_, t)| mtime >= *t) {
            best = Some((path, mtime));
        }
    }
    best
}

impl RunRepository {
    pub fn new(reports_base: impl Into<PathBuf>, exe_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_base: reports_base.into(),
            exe_dir: exe_dir.into(),
            prefix: DEFAULT_RUN_PREFIX.to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Newest run directory across the reports base and the generator's directory.
    pub fn find_newest_run_dir(&self) -> Option<PathBuf> {
        let a = newest_run_dir_in(&self.reports_base, &self.prefix);
        let b = newest_run_dir_in(&self.exe_dir, &self.prefix);
        match (a, b) {
            (Some((a, ta)), Some((b, tb))) => Some(if ta >= tb { a } else { b }),
            (Some((a, _)), None) => Some(a),
            (None, Some((b, _))) => Some(b),
            (None, None) => None,
        }
    }

    /// First file per report extension in `run_dir`.
    pub fn pick_outputs(&self, run_dir: &Path) -> RunOutputs {
        let mut files: Vec<PathBuf> = match fs::read_dir(run_dir) {
            Ok(entries) => entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect(),
            Err(_) => Vec::new(),
        };
        // read_dir order is platform dependent; sort so repeated scans agree.
        files.sort();

        let mut outputs = RunOutputs::default();
        for kind in OutputKind::ALL {
            let found = files.iter().find(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(kind.extension()))
            });
            outputs.set(kind, found.cloned());
        }
        outputs
    }
}

struct RegistryEntry {
    run_dir: PathBuf,
    created_at: Instant,
}

/// Bounded, time-evicting map from run id to run directory.
pub struct RunRegistry {
    ttl: Duration,
    max_entries: usize,
    entries: HashMap<String, RegistryEntry>,
}

impl RunRegistry {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: HashMap::new(),
        }
    }

    fn evict_expired(&mut self) {
        let ttl = self.ttl;
        self.entries.retain(|_, e| e.created_at.elapsed() <= ttl);
    }

    pub fn get(&mut self, run_id: &str) -> Option<PathBuf> {
        self.evict_expired();
        self.entries.get(run_id).map(|e| e.run_dir.clone())
    }

    pub fn insert(&mut self, run_id: String, run_dir: PathBuf) {
        self.evict_expired();
        if !self.entries.contains_key(&run_id) && self.entries.len() >= self.max_entries {
            if let Some(victim) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(k, _)| k.clone())
            {
                self.entries.remove(&victim);
            }
        }
        self.entries.insert(
            run_id,
            RegistryEntry {
                run_dir,
                created_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
