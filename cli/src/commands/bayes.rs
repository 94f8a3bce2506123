use super::Workspace;
use anyhow::{Context, Result};
use brent_analysis::changepoint::BayesianChangePoint;
use brent_analysis::config::BayesianConfig;
use brent_analysis::plot::{histogram, price_chart};
use clap::Args;
use std::fmt::Write;

#[derive(Args, Debug, Clone)]
pub struct BayesArgs {
    /// Posterior draws kept after warmup
    #[arg(long, default_value_t = 2000)]
    pub samples: usize,

    #[arg(long, default_value_t = 1000)]
    pub warmup: usize,

    /// Keep every n-th draw
    #[arg(long, default_value_t = 1)]
    pub thin: usize,

    /// RNG seed (default 42)
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run(args: &BayesArgs, ws: &Workspace) -> Result<String> {
    let prices = ws.prices()?;
    let values = prices.prices();

    let defaults = BayesianConfig::default();
    let config = BayesianConfig {
        n_samples: args.samples,
        n_warmup: args.warmup,
        thin: args.thin,
        seed: args.seed.or(defaults.seed),
        ..defaults
    };
    let result = BayesianChangePoint::new(config).fit(&values)?;
    let tau = result.tau_mode();
    let point = prices.get(tau).context("change point outside the series")?;

    let mut report = result.summary();
    writeln!(report, "Most probable change: {} (price {:.2})", point.date, point.price)?;

    ws.plot("bayesian_change_point.svg", |path| {
        price_chart(&prices, &[], &[tau], "Bayesian Change Point Detection", path)
    });
    ws.plot("bayesian_tau_posterior.svg", |path| {
        histogram("Posterior of the change point", &result.tau, path)
    });

    Ok(report)
}
