use super::Workspace;
use anyhow::{bail, Context, Result};
use brent_analysis::macro_data::{default_indicators, WorldBankClient, DEFAULT_COUNTRY};
use clap::Args;
use std::fmt::Write;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// ISO3 country code, or WLD for the world aggregate
    #[arg(long, default_value = DEFAULT_COUNTRY)]
    pub country: String,

    #[arg(long, default_value_t = 1987)]
    pub start_year: i32,

    #[arg(long, default_value_t = 2022)]
    pub end_year: i32,

    /// Output CSV (defaults to EVENTS_CSV)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: &FetchArgs, ws: &Workspace) -> Result<String> {
    if args.start_year > args.end_year {
        bail!("start year {} is after end year {}", args.start_year, args.end_year);
    }
    let client = WorldBankClient::new(ws.config.world_bank_base_url.as_str());
    let table = client
        .fetch_indicators(&default_indicators(), &args.country, args.start_year..=args.end_year)
        .await
        .context("failed to fetch World Bank indicators")?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| ws.config.events_csv.clone());
    table.write_csv(&output)?;

    let mut report = String::new();
    writeln!(report, "Indicators: {}", table.columns().join(", "))?;
    writeln!(report, "Years: {}", table.len())?;
    write!(report, "Written to {}", output.display())?;
    Ok(report)
}
