use super::{OrderArgs, Workspace};
use anyhow::{bail, Result};
use brent_analysis::evaluation::{evaluate_forecast, plot_forecast, EvaluationReport};
use brent_analysis::models::ArimaModel;
use clap::Args;
use shared::ModelMetrics;
use std::fmt::Write;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub order: OrderArgs,

    /// Observations held out at the end of the series
    #[arg(long, default_value_t = 30)]
    pub test_size: usize,

    /// Metrics JSON for the dashboard (defaults to METRICS_PATH when set)
    #[arg(long)]
    pub save_metrics: Option<PathBuf>,
}

pub fn run(args: &EvaluateArgs, ws: &Workspace) -> Result<String> {
    let prices = ws.prices()?;
    let values = prices.prices();
    if args.test_size == 0 || args.test_size >= values.len() {
        bail!(
            "test size {} must be between 1 and {}",
            args.test_size,
            values.len().saturating_sub(1)
        );
    }
    let (train, test) = values.split_at(values.len() - args.test_size);

    let model = ArimaModel::fit(train, args.order.into())?;
    let forecast = model.forecast(test.len());
    let metrics = evaluate_forecast(test, &forecast)?;

    let mut report = EvaluationReport::new(format!("ARIMA{}", model.order), metrics).format();

    let target = args.save_metrics.clone().or_else(|| ws.config.metrics_path.clone());
    if let Some(path) = target {
        ModelMetrics::new(metrics.rmse, metrics.mae).to_file(&path)?;
        write!(report, "\nMetrics written to {}", path.display())?;
    }

    ws.plot("forecast_evaluation.svg", |path| {
        plot_forecast(test, &forecast, "Forecast vs Actual", path)
    });

    Ok(report)
}
