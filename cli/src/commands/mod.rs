use anyhow::{Context, Result};
use brent_analysis::config::ArimaOrder;
use brent_analysis::data::{load_prices, PriceSeries};
use clap::{Args, Parser, Subcommand};
use shared::Config;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub mod arima;
pub mod bayes;
pub mod cusum;
pub mod evaluate;
pub mod fetch;
pub mod lstm;
pub mod markov;
pub mod pelt;
pub mod stats;
pub mod var;

/// Brent crude oil price analysis: change points, regimes and forecasts
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Price CSV with `Date,Price` columns (defaults to PRICES_CSV)
    #[arg(long, global = true)]
    pub prices: Option<PathBuf>,

    /// Skip writing SVG charts
    #[arg(long, global = true)]
    pub no_plots: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Descriptive statistics, rolling volatility and ADF tests
    Stats(stats::StatsArgs),
    /// Single change point from the cumulative sum of deviations
    Cusum(cusum::CusumArgs),
    /// Penalized multiple change-point detection (PELT)
    Pelt(pelt::PeltArgs),
    /// Bayesian single change point by MCMC
    Bayes(bayes::BayesArgs),
    /// Fit an ARIMA model and forecast
    Arima(arima::ArimaArgs),
    /// Vector autoregression on prices and macro indicators
    Var(var::VarArgs),
    /// Markov-switching regimes of the price level
    Markov(markov::MarkovArgs),
    /// Train an LSTM forecaster on a hold-out split
    Lstm(lstm::LstmArgs),
    /// Download World Bank indicators into a CSV table
    FetchIndicators(fetch::FetchArgs),
    /// Score an ARIMA forecast against held-out prices
    Evaluate(evaluate::EvaluateArgs),
}

/// ARIMA `(p, d, q)` flags shared by `arima` and `evaluate`
#[derive(Args, Debug, Clone, Copy)]
pub struct OrderArgs {
    /// Autoregressive order
    #[arg(long, default_value_t = 1)]
    pub p: usize,
    /// Differencing order
    #[arg(long, default_value_t = 1)]
    pub d: usize,
    /// Moving-average order
    #[arg(long, default_value_t = 1)]
    pub q: usize,
}

impl From<OrderArgs> for ArimaOrder {
    fn from(args: OrderArgs) -> Self {
        ArimaOrder::new(args.p, args.d, args.q)
    }
}

/// Resolved configuration for one invocation
#[derive(Debug, Clone)]
pub struct Workspace {
    pub config: Config,
    pub plots: bool,
}

impl Workspace {
    pub fn new(config: Config, plots: bool) -> Self {
        Self { config, plots }
    }

    pub fn prices(&self) -> Result<PriceSeries> {
        let path = &self.config.prices_csv;
        load_prices(path).with_context(|| format!("failed to load prices from {}", path.display()))
    }

    pub fn artifact(&self, file_name: &str) -> PathBuf {
        self.config.artifact_path(file_name)
    }

    /// Draw a chart into the plots directory. Chart failures are logged and
    /// do not fail the command.
    pub fn plot<F>(&self, file_name: &str, draw: F) -> Option<PathBuf>
    where
        F: FnOnce(&Path) -> brent_analysis::Result<()>,
    {
        if !self.plots {
            return None;
        }
        let path = self.config.plot_path(file_name);
        match draw(&path) {
            Ok(()) => Some(path),
            Err(e) => {
                warn!("Failed to draw {}: {}", path.display(), e);
                None
            }
        }
    }
}

pub async fn run(cli: Cli, mut config: Config) -> Result<()> {
    if let Some(prices) = cli.prices {
        config.prices_csv = prices;
    }
    let ws = Workspace::new(config, !cli.no_plots);

    let report = match &cli.command {
        Commands::Stats(args) => stats::run(args, &ws)?,
        Commands::Cusum(args) => cusum::run(args, &ws)?,
        Commands::Pelt(args) => pelt::run(args, &ws)?,
        Commands::Bayes(args) => bayes::run(args, &ws)?,
        Commands::Arima(args) => arima::run(args, &ws)?,
        Commands::Var(args) => var::run(args, &ws)?,
        Commands::Markov(args) => markov::run(args, &ws)?,
        Commands::Lstm(args) => lstm::run(args, &ws)?,
        Commands::FetchIndicators(args) => fetch::run(args, &ws).await?,
        Commands::Evaluate(args) => evaluate::run(args, &ws)?,
    };
    println!("{}", report);
    info!("Done");
    Ok(())
}
