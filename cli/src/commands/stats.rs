use super::Workspace;
use anyhow::Result;
use brent_analysis::plot::{price_chart, ChartSeries};
use brent_analysis::stats::{adf_test, rolling_std, BasicStatistics, DEFAULT_VOLATILITY_WINDOW};
use clap::Args;
use std::fmt::Write;
use tracing::{info, warn};

#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    /// Rolling volatility window, in observations
    #[arg(long, default_value_t = DEFAULT_VOLATILITY_WINDOW)]
    pub window: usize,

    /// ADF lag order; chosen by AIC when omitted
    #[arg(long)]
    pub adf_lags: Option<usize>,
}

pub fn run(args: &StatsArgs, ws: &Workspace) -> Result<String> {
    let prices = ws.prices()?;
    let values = prices.prices();

    let stats = BasicStatistics::compute(&values)?;
    info!("Basic statistics calculated");
    let volatility = rolling_std(&values, args.window)?;

    let mut report = String::new();
    writeln!(report, "{} to {}", prices.first().date, prices.last().date)?;
    writeln!(report, "{}", stats.format())?;
    if let Some(latest) = volatility.last().copied().flatten() {
        writeln!(report, "Latest {}-day rolling volatility: {:.4}", args.window, latest)?;
    }

    writeln!(report, "\nADF test on prices")?;
    writeln!(report, "{}", adf_test(&values, args.adf_lags)?.format())?;
    match adf_test(&prices.log_returns(), args.adf_lags) {
        Ok(adf) => {
            writeln!(report, "\nADF test on log returns")?;
            writeln!(report, "{}", adf.format())?;
        }
        Err(e) => warn!("Skipping ADF test on log returns: {}", e),
    }

    ws.plot("price_trends.svg", |path| {
        price_chart(&prices, &[], &[], "Brent Oil Prices Over Time", path)
    });
    ws.plot("rolling_volatility.svg", |path| {
        let overlay = ChartSeries::partial(
            format!("{}-Day Rolling Volatility", args.window),
            volatility.clone(),
        );
        price_chart(&prices, &[overlay], &[], "Brent Oil Price and Rolling Volatility", path)
    });

    Ok(report)
}
