use anyhow::Result;
use clap::Parser;
use comparison_portal::cli;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::init_tracing(args.log_json);

    if let Err(e) = cli::run(args).await {
        tracing::error!(error = %format!("{e:#}"), "comparison-portal failed");
        return Err(e);
    }
    Ok(())
}
