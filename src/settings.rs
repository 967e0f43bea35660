//! Application settings, loaded once from an INI file at startup.
//!
//! ```ini
//! [paths]
//! exe_path = ~/tools/comparison/generator
//! reports_base = $DATA_DIR/reports
//!
//! [execution]
//! timeout_seconds = 1800
//!
//! [url_normalization]
//! default_scheme = https
//! guess_com_if_no_dot = true
//! no_guess_hosts = localhost, intranet
//!
//! [server]
//! host = 127.0.0.1
//! port = 5000
//! ```

use crate::error::ConfigError;
use crate::normalize::GuessComNormalizer;
use crate::runs::DEFAULT_RUN_PREFIX;
use config::{Config, FileFormat};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "comparison-portal.ini";
pub const DEFAULT_PRESET_TABLE: &str = "gap_analysis_presets";

#[derive(Debug, Clone)]
pub struct UrlSettings {
    pub default_scheme: String,
    pub guess_com_if_no_dot: bool,
    pub no_guess_hosts: HashSet<String>,
}

impl UrlSettings {
    pub fn normalizer(&self) -> GuessComNormalizer {
        GuessComNormalizer {
            default_scheme: self.default_scheme.clone(),
            guess_com_if_no_dot: self.guess_com_if_no_dot,
            no_guess_hosts: self.no_guess_hosts.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub ttl: Duration,
    pub max_entries: usize,
}

#[derive(Debug, Clone)]
pub struct PresetSettings {
    pub database: PathBuf,
    pub table: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub exe_path: PathBuf,
    pub reports_base: PathBuf,
    pub timeout: Duration,
    pub run_prefix: String,
    pub probe_capabilities: bool,
    pub url: UrlSettings,
    /// Fallback extra instructions when neither the form nor a preset supplies any.
    pub extra_instructions: String,
    pub server: ServerSettings,
    pub downloads: DownloadSettings,
    pub presets: Option<PresetSettings>,
}

impl Settings {
    pub fn exe_dir(&self) -> PathBuf {
        self.exe_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Read, parse and validate the INI file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini_str(&text, path)
    }

    /// Parse INI text; `origin` is only used in error messages.
    pub fn from_ini_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        // The INI source unescapes `\n`, `\t` and friends; values are literal here.
        let text = text.replace('\\', "\\\\");
        let cfg = Config::builder()
            .add_source(config::File::from_str(&text, FileFormat::Ini))
            .build()
            .map_err(|source| ConfigError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;
        let ini = Ini(cfg);

        let exe_path = ini.required_path(&["paths", "path"], "exe_path")?;
        let reports_base = ini.required_path(&["paths", "path"], "reports_base")?;

        let timeout_seconds = ini.int(&["execution"], "timeout_seconds", 1800)?;
        if timeout_seconds <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "execution.timeout_seconds".into(),
                message: "must be greater than zero".into(),
            });
        }
        let run_prefix = ini
            .string(&["execution"], "run_prefix")?
            .unwrap_or_else(|| DEFAULT_RUN_PREFIX.to_string());
        let probe_capabilities = ini.bool(&["execution"], "probe_capabilities", false)?;

        let default_scheme = ini
            .string(&["url_normalization"], "default_scheme")?
            .unwrap_or_else(|| "https".to_string());
        let guess_com_if_no_dot = ini.bool(&["url_normalization"], "guess_com_if_no_dot", true)?;
        let no_guess_hosts = ini
            .string(&["url_normalization"], "no_guess_hosts")?
            .unwrap_or_else(|| "localhost".to_string())
            .split(',')
            .map(|h| h.trim().to_lowercase())
            .filter(|h| !h.is_empty())
            .collect();

        let extra_instructions = ini
            .string(&["prompt"], "extra_instructions")?
            .unwrap_or_default();

        let host = ini
            .string(&["server", "flask"], "host")?
            .unwrap_or_else(|| "127.0.0.1".to_string());
        let port = ini.int(&["server", "flask"], "port", 5000)?;
        let port = u16::try_from(port).map_err(|_| ConfigError::InvalidValue {
            key: "server.port".into(),
            message: format!("{port} is not a valid port"),
        })?;

        let ttl_seconds = ini.int(&["downloads"], "ttl_seconds", 86_400)?;
        let max_entries = ini.int(&["downloads"], "max_entries", 256)?;

        let presets = match ini.string(&["presets"], "database")? {
            Some(raw) => {
                let table = ini
                    .string(&["presets"], "table")?
                    .unwrap_or_else(|| DEFAULT_PRESET_TABLE.to_string());
                if !is_sql_identifier(&table) {
                    return Err(ConfigError::InvalidValue {
                        key: "presets.table".into(),
                        message: format!("`{table}` is not a plain table name"),
                    });
                }
                Some(PresetSettings {
                    database: resolve_path(&raw)?,
                    table,
                })
            }
            None => None,
        };

        if !exe_path.is_file() {
            return Err(ConfigError::ExeNotFound(exe_path));
        }
        std::fs::create_dir_all(&reports_base).map_err(|source| ConfigError::ReportsBase {
            path: reports_base.clone(),
            source,
        })?;

        Ok(Settings {
            exe_path,
            reports_base,
            timeout: Duration::from_secs(timeout_seconds as u64),
            run_prefix,
            probe_capabilities,
            url: UrlSettings {
                default_scheme,
                guess_com_if_no_dot,
                no_guess_hosts,
            },
            extra_instructions,
            server: ServerSettings { host, port },
            downloads: DownloadSettings {
                ttl: Duration::from_secs(ttl_seconds.max(1) as u64),
                max_entries: max_entries.max(1) as usize,
            },
            presets,
        })
    }
}

/// Section-aware lookups over the parsed INI; blank values count as missing.
struct Ini(Config);

impl Ini {
    fn string(&self, sections: &[&str], key: &str) -> Result<Option<String>, ConfigError> {
        for section in sections {
            match self.0.get_string(&format!("{section}.{key}")) {
                Ok(v) if !v.trim().is_empty() => return Ok(Some(v.trim().to_string())),
                Ok(_) | Err(config::ConfigError::NotFound(_)) => continue,
                Err(e) => {
                    return Err(ConfigError::InvalidValue {
                        key: format!("{section}.{key}"),
                        message: e.to_string(),
                    })
                }
            }
        }
        Ok(None)
    }

    fn int(&self, sections: &[&str], key: &str, default: i64) -> Result<i64, ConfigError> {
        match self.string(sections, key)? {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: format!("{}.{key}", sections[0]),
                message: format!("`{raw}` is not an integer"),
            }),
            None => Ok(default),
        }
    }

    fn bool(&self, sections: &[&str], key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.string(sections, key)? {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: format!("{}.{key}", sections[0]),
                message: format!("`{raw}` is not a boolean"),
            }),
            None => Ok(default),
        }
    }

    fn required_path(&self, sections: &[&str], key: &str) -> Result<PathBuf, ConfigError> {
        match self.string(sections, key)? {
            Some(raw) => resolve_path(&raw),
            None => Err(ConfigError::MissingValue {
                key: key.to_string(),
                sections: sections.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

fn is_sql_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}

/// Expand `$VAR`, `${VAR}` and a leading `~`. Unknown variables are left as written.
pub(crate) fn expand_vars(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }
        let mut name = String::new();
        while let Some(&n) = chars.peek() {
            if n.is_ascii_alphanumeric() || n == '_' {
                name.push(n);
                chars.next();
            } else {
                break;
            }
        }
        let closed = braced && chars.peek() == Some(&'}');
        if closed {
            chars.next();
        }
        match std::env::var(&name) {
            Ok(value) if !name.is_empty() && (closed || !braced) => out.push_str(&value),
            _ => {
                out.push('$');
                if braced {
                    out.push('{');
                }
                out.push_str(&name);
                if closed {
                    out.push('}');
                }
            }
        }
    }

    if out == "~" || out.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{}", home.display(), &out[1..]);
        }
    }
    out
}

/// Expand and make absolute against the working directory.
fn resolve_path(raw: &str) -> Result<PathBuf, ConfigError> {
    let path = PathBuf::from(expand_vars(raw));
    if path.is_absolute() {
        return Ok(path);
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(&path))
        .map_err(|source| ConfigError::Resolve { path, source })
}

/// Config file to use when none is given: `./comparison-portal.ini`, then the
/// per-user config directory.
pub fn default_config_path() -> PathBuf {
    let local = PathBuf::from(DEFAULT_CONFIG_NAME);
    if local.is_file() {
        return local;
    }
    dirs::config_dir()
        .map(|d| d.join("comparison-portal").join(DEFAULT_CONFIG_NAME))
        .unwrap_or(local)
}
