use super::Workspace;
use anyhow::{Context, Result};
use brent_analysis::artifacts::{save_model, MARKOV_MODEL_FILE};
use brent_analysis::config::MarkovConfig;
use brent_analysis::models::MarkovSwitching;
use brent_analysis::plot::{line_chart, ChartSeries};
use clap::Args;
use std::fmt::Write;

#[derive(Args, Debug, Clone)]
pub struct MarkovArgs {
    /// Number of regimes
    #[arg(long, default_value_t = 2)]
    pub k_regimes: usize,

    /// Model log returns instead of price levels
    #[arg(long)]
    pub returns: bool,

    /// EM iteration cap
    #[arg(long, default_value_t = 500)]
    pub max_iter: usize,
}

pub fn run(args: &MarkovArgs, ws: &Workspace) -> Result<String> {
    let prices = ws.prices()?;
    let (series, dates) = if args.returns {
        (prices.log_returns(), prices.dates()[1..].to_vec())
    } else {
        (prices.prices(), prices.dates())
    };

    let config = MarkovConfig {
        k_regimes: args.k_regimes,
        max_iter: args.max_iter,
        ..Default::default()
    };
    let model = MarkovSwitching::with_config(config).fit(&series)?;

    let path = ws.artifact(MARKOV_MODEL_FILE);
    save_model(&model, "markov", &path)
        .with_context(|| format!("failed to save model to {}", path.display()))?;

    let regimes = model.most_likely_regimes();
    let mut report = model.summary();
    if let (Some(&last), Some(date)) = (regimes.last(), dates.last()) {
        writeln!(report, "Regime on {}: {}", date, last)?;
    }
    let switches = regimes.windows(2).filter(|w| w[0] != w[1]).count();
    writeln!(report, "Regime switches: {}", switches)?;
    writeln!(report, "Model saved to {}", path.display())?;

    ws.plot("markov_regimes.svg", |file| {
        let series: Vec<ChartSeries> = (0..model.k_regimes)
            .map(|j| ChartSeries::new(format!("P(regime {})", j), model.smoothed.column(j).to_vec()))
            .collect();
        line_chart("Smoothed Regime Probabilities", &series, &[], Some(dates.as_slice()), file)
    });

    Ok(report)
}
