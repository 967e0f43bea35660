use crate::orchestrator::{probe_prompt_flags, AnalysisService, TokioProcessRunner};
use crate::presets::{NoPresets, PresetRepository, SqlitePresetRepository};
use crate::runs::RunRepository;
use crate::settings::{default_config_path, Settings};
use crate::web::{build_router, AppState};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "comparison-portal",
    version,
    about = "Web front-end for the comparison report generator"
)]
pub struct Cli {
    /// INI configuration file (defaults to ./comparison-portal.ini, then the user config dir)
    #[arg(long, env = "APP_INI")]
    pub config: Option<PathBuf>,

    /// Address to bind, overriding [server] host
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind, overriding [server] port
    #[arg(long)]
    pub port: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Load and validate the configuration, print a summary and exit
    #[arg(long)]
    pub check_config: bool,
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Wire settings into the service graph shared by all requests.
pub async fn build_state(settings: &Settings) -> AppState {
    let runner = Arc::new(TokioProcessRunner);
    let run_repo = RunRepository::new(&settings.reports_base, settings.exe_dir())
        .with_prefix(settings.run_prefix.clone());

    let mut service = AnalysisService::new(
        settings.exe_path.clone(),
        settings.timeout,
        Arc::new(settings.url.normalizer()),
        run_repo,
        runner.clone(),
    );
    if settings.probe_capabilities {
        let support = probe_prompt_flags(runner.as_ref(), &settings.exe_path).await;
        service = service.with_prompt_flag_support(support);
    }

    let presets: Arc<dyn PresetRepository> = match &settings.presets {
        Some(p) => {
            info!(database = %p.database.display(), table = %p.table, "using preset database");
            Arc::new(SqlitePresetRepository::new(p.database.clone(), p.table.clone()))
        }
        None => {
            warn!("no [presets] database configured; preset dropdown will be empty");
            Arc::new(NoPresets)
        }
    };

    AppState::new(
        Arc::new(service),
        presets,
        &settings.downloads,
        &settings.extra_instructions,
    )
}

/// Human-readable summary of the loaded settings for `--check-config`.
pub(crate) fn settings_summary(settings: &Settings) -> Vec<String> {
    let mut lines = vec![
        format!("Generator:     {}", settings.exe_path.display()),
        format!("Reports base:  {}", settings.reports_base.display()),
        format!(
            "Timeout:       {}",
            humantime::format_duration(settings.timeout)
        ),
        format!("Run prefix:    {}", settings.run_prefix),
        format!(
            "URL defaults:  scheme {}, guess .com {}, excluded [{}]",
            settings.url.default_scheme,
            settings.url.guess_com_if_no_dot,
            {
                let mut hosts: Vec<&str> =
                    settings.url.no_guess_hosts.iter().map(String::as_str).collect();
                hosts.sort_unstable();
                hosts.join(", ")
            }
        ),
        format!(
            "Listen:        {}:{}",
            settings.server.host, settings.server.port
        ),
    ];
    match &settings.presets {
        Some(p) => lines.push(format!(
            "Presets:       {} (table {})",
            p.database.display(),
            p.table
        )),
        None => lines.push("Presets:       disabled".to_string()),
    }
    lines
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

pub async fn run(args: Cli) -> Result<()> {
    let path = args.config.clone().unwrap_or_else(default_config_path);
    let mut settings = Settings::load(&path)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }

    if args.check_config {
        for line in settings_summary(&settings) {
            println!("{line}");
        }
        return Ok(());
    }

    let state = build_state(&settings).await;
    let app = build_router(state);

    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(
        addr = %bind_addr,
        generator = %settings.exe_path.display(),
        "comparison-portal listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides() {
        let cli = Cli::try_parse_from([
            "comparison-portal",
            "--config",
            "/etc/portal.ini",
            "--port",
            "8080",
            "--log-json",
        ])
        .expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("/etc/portal.ini")));
        assert_eq!(cli.port, Some(8080));
        assert!(cli.log_json);
        assert!(!cli.check_config);
        assert!(cli.host.is_none());
    }

    #[test]
    fn summary_lists_core_settings() {
        let tmp = tempfile::tempdir().unwrap();
        let exe = tmp.path().join("generator");
        std::fs::write(&exe, "").unwrap();
        let text = format!(
            "[paths]\nexe_path = {}\nreports_base = {}\n",
            exe.display(),
            tmp.path().join("reports").display()
        );
        let settings =
            Settings::from_ini_str(&text, std::path::Path::new("t.ini")).expect("settings");
        let lines = settings_summary(&settings);
        assert!(lines[0].ends_with("generator"));
        assert!(lines.iter().any(|l| l == "Timeout:       30m"));
        assert!(lines.iter().any(|l| l == "Presets:       disabled"));
    }
}
