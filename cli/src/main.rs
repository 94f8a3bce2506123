use anyhow::Result;
use brent_cli::{run, Cli};
use clap::Parser;
use shared::{init_tracing, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(config.log_file.as_deref(), config.log_json)?;

    tracing::info!(
        "brent {} ({} on {})",
        env!("CARGO_PKG_VERSION"),
        option_env!("GIT_HASH").unwrap_or("unknown"),
        option_env!("GIT_BRANCH").unwrap_or("unknown")
    );

    run(cli, config).await
}
