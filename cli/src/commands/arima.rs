use super::{OrderArgs, Workspace};
use anyhow::{Context, Result};
use brent_analysis::artifacts::{save_model, ARIMA_MODEL_FILE};
use brent_analysis::config::ArimaConfig;
use brent_analysis::models::ArimaModel;
use brent_analysis::plot::{price_chart, ChartSeries};
use clap::Args;
use std::fmt::Write;

#[derive(Args, Debug, Clone)]
pub struct ArimaArgs {
    #[command(flatten)]
    pub order: OrderArgs,

    /// Forecast horizon
    #[arg(long, default_value_t = 10)]
    pub steps: usize,

    /// Nelder-Mead iteration cap
    #[arg(long, default_value_t = 2000)]
    pub max_iter: usize,
}

/// Fitted values aligned with the full series, `None` before the first fit
pub fn aligned_fit(model: &ArimaModel, len: usize) -> Vec<Option<f64>> {
    let start = model.fitted_start();
    (0..len)
        .map(|i| i.checked_sub(start).and_then(|j| model.fitted_values().get(j).copied()))
        .collect()
}

pub fn run(args: &ArimaArgs, ws: &Workspace) -> Result<String> {
    let prices = ws.prices()?;
    let values = prices.prices();

    let config = ArimaConfig {
        order: args.order.into(),
        max_iter: args.max_iter,
        ..Default::default()
    };
    let model = ArimaModel::fit_with(&values, &config)?;
    let forecast = model.forecast(args.steps);

    let path = ws.artifact(ARIMA_MODEL_FILE);
    save_model(&model, "arima", &path)
        .with_context(|| format!("failed to save model to {}", path.display()))?;

    let mut report = model.summary();
    writeln!(report, "\nForecast ({} steps):", args.steps)?;
    for (h, value) in forecast.iter().enumerate() {
        writeln!(report, "  t+{:<3} {:.4}", h + 1, value)?;
    }
    writeln!(report, "Model saved to {}", path.display())?;

    ws.plot("arima_fit.svg", |path| {
        let fit = ChartSeries::partial("ARIMA Fit", aligned_fit(&model, values.len()));
        price_chart(&prices, &[fit], &[], &format!("ARIMA{} Model Fit", config.order), path)
    });

    Ok(report)
}
