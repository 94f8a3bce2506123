use super::Workspace;
use anyhow::{Context, Result};
use brent_analysis::artifacts::{save_model, VAR_MODEL_FILE};
use brent_analysis::config::VarConfig;
use brent_analysis::macro_data::table::PRICE_COLUMN;
use brent_analysis::macro_data::IndicatorTable;
use brent_analysis::models::{InfoCriterion, VarModel};
use brent_analysis::plot::{line_chart, ChartSeries};
use brent_analysis::stats::CorrelationMatrix;
use clap::Args;
use std::fmt::Write;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct VarArgs {
    /// Indicator table with a `year` column (defaults to EVENTS_CSV)
    #[arg(long)]
    pub indicators: Option<PathBuf>,

    /// Lag order when not selecting automatically
    #[arg(long, default_value_t = 1)]
    pub lags: usize,

    /// Pick the lag order by information criterion
    #[arg(long)]
    pub select_order: bool,

    #[arg(long, default_value_t = 15)]
    pub max_lags: usize,

    /// aic, bic or hqic
    #[arg(long, default_value_t = InfoCriterion::Aic)]
    pub criterion: InfoCriterion,

    /// Forecast and impulse-response horizon
    #[arg(long, default_value_t = 10)]
    pub steps: usize,

    /// Shocked variable for the impulse response
    #[arg(long, requires = "response")]
    pub impulse: Option<String>,

    /// Responding variable for the impulse response
    #[arg(long, requires = "impulse")]
    pub response: Option<String>,

    /// Use Cholesky-orthogonalized shocks
    #[arg(long)]
    pub orthogonalized: bool,
}

impl From<&VarArgs> for VarConfig {
    fn from(args: &VarArgs) -> Self {
        VarConfig {
            lags: args.lags,
            select_order: args.select_order,
            max_lags: args.max_lags,
            steps: args.steps,
        }
    }
}

/// Indicator table joined with annual mean prices, unless it already has prices
fn load_table(args: &VarArgs, ws: &Workspace) -> Result<IndicatorTable> {
    let path = args
        .indicators
        .clone()
        .unwrap_or_else(|| ws.config.events_csv.clone());
    let table = IndicatorTable::read_csv(&path)
        .with_context(|| format!("failed to read indicators from {}", path.display()))?;
    if table.columns().iter().any(|c| c == PRICE_COLUMN) {
        return Ok(table);
    }
    let prices = ws.prices()?;
    Ok(table.merge_prices(&prices.annual())?)
}

pub fn run(args: &VarArgs, ws: &Workspace) -> Result<String> {
    let config = VarConfig::from(args);
    let table = load_table(args, ws)?;
    let data = table.complete_columns();
    info!("Training VAR model on {} variables", data.len());

    let model = if config.select_order {
        VarModel::select_order(&data, config.max_lags, args.criterion)?
    } else {
        VarModel::fit(&data, config.lags)?
    };

    let path = ws.artifact(VAR_MODEL_FILE);
    save_model(&model, "var", &path)
        .with_context(|| format!("failed to save model to {}", path.display()))?;

    let mut report = model.summary();
    writeln!(report, "\nCorrelation matrix:\n{}", CorrelationMatrix::compute(&data)?.format())?;
    let forecast = model.forecast(config.steps);
    writeln!(report, "\nForecast ({} steps):", config.steps)?;
    writeln!(report, "  {:<6}{}", "step", model.names.iter().map(|n| format!("{:>16}", n)).collect::<String>())?;
    for (h, row) in forecast.row_iter().enumerate() {
        let cells: String = row.iter().map(|v| format!("{:>16.4}", v)).collect();
        writeln!(report, "  {:<6}{}", h + 1, cells)?;
    }

    if let (Some(impulse), Some(response)) = (&args.impulse, &args.response) {
        let irf = model.response(impulse, response, config.steps, args.orthogonalized)?;
        writeln!(report, "\nImpulse response of {} to {}:", response, impulse)?;
        for (h, value) in irf.iter().enumerate() {
            writeln!(report, "  {:<3} {:.6}", h, value)?;
        }
        ws.plot("impulse_response.svg", |file| {
            line_chart(
                &format!("Impulse Response: {} -> {}", impulse, response),
                &[ChartSeries::new(response.as_str(), irf.clone())],
                &[],
                None,
                file,
            )
        });
    }
    writeln!(report, "Model saved to {}", path.display())?;

    Ok(report)
}
