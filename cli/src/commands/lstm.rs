use super::Workspace;
use anyhow::{bail, Context, Result};
use brent_analysis::artifacts::LSTM_MODEL_FILE;
use brent_analysis::config::LstmConfig;
use brent_analysis::evaluation::{evaluate_forecast, plot_forecast, EvaluationReport};
use brent_analysis::models::{make_windows, LstmModel, MinMaxScaler};
use clap::Args;
use ndarray::s;
use shared::ModelMetrics;
use std::fmt::Write;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct LstmArgs {
    #[arg(long, default_value_t = 20)]
    pub epochs: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Window length fed to the network
    #[arg(long, default_value_t = 60)]
    pub lookback: usize,

    /// Hidden units per LSTM layer, comma separated
    #[arg(long, value_delimiter = ',', default_value = "50,50")]
    pub hidden: Vec<usize>,

    #[arg(long, default_value_t = 0.2)]
    pub dropout: f64,

    #[arg(long, default_value_t = 0.001)]
    pub learning_rate: f64,

    /// Share of windows held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    pub test_fraction: f64,

    /// Share of training windows monitored for checkpointing
    #[arg(long, default_value_t = 0.0)]
    pub validation_split: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Write RMSE and MAE to METRICS_PATH for the dashboard
    #[arg(long)]
    pub save_metrics: bool,
}

impl From<&LstmArgs> for LstmConfig {
    fn from(args: &LstmArgs) -> Self {
        LstmConfig {
            hidden_sizes: args.hidden.clone(),
            dropout: args.dropout,
            learning_rate: args.learning_rate,
            epochs: args.epochs,
            batch_size: args.batch_size,
            lookback: args.lookback,
            validation_split: args.validation_split,
            seed: args.seed,
        }
    }
}

pub fn run(args: &LstmArgs, ws: &Workspace) -> Result<String> {
    if !(args.test_fraction > 0.0 && args.test_fraction < 1.0) {
        bail!("--test-fraction must be in (0, 1), got {}", args.test_fraction);
    }
    let prices = ws.prices()?;
    let values = prices.prices();

    let scaler = MinMaxScaler::fit(&values)?;
    let (x, y) = make_windows(&scaler.transform(&values), args.lookback)?;
    let samples = y.len();
    let test = ((samples as f64) * args.test_fraction).ceil() as usize;
    if test == 0 || test >= samples {
        bail!("{} windows cannot be split with test fraction {}", samples, args.test_fraction);
    }
    let split = samples - test;
    info!("Training on {} windows, testing on {}", split, test);

    let x_train = x.slice(s![..split, .., ..]).to_owned();
    let y_train = y.slice(s![..split]).to_owned();
    let x_test = x.slice(s![split.., .., ..]).to_owned();
    let y_test = y.slice(s![split..]).to_owned();

    let checkpoint = ws.artifact(LSTM_MODEL_FILE);
    let mut model = LstmModel::new(LstmConfig::from(args))?.with_scaler(scaler);
    let history = model.fit(&x_train, &y_train, Some(checkpoint.as_path()))?.clone();
    info!("LSTM model trained for {} epochs", history.loss.len());

    let predicted = scaler.inverse_transform(&model.predict(&x_test)?.to_vec());
    let actual = scaler.inverse_transform(&y_test.to_vec());
    let metrics = evaluate_forecast(&actual, &predicted)?;

    let mut report = String::new();
    for (epoch, loss) in history.loss.iter().enumerate() {
        match history.val_loss.get(epoch) {
            Some(val) => writeln!(report, "Epoch {:>3}: loss {:.6}  val_loss {:.6}", epoch + 1, loss, val)?,
            None => writeln!(report, "Epoch {:>3}: loss {:.6}", epoch + 1, loss)?,
        }
    }
    if let (Some(epoch), Some(loss)) = (history.best_epoch, history.best_loss) {
        writeln!(
            report,
            "Best epoch {} (loss {:.6}), checkpoint at {}",
            epoch,
            loss,
            checkpoint.display()
        )?;
    }
    report.push_str(&EvaluationReport::new("LSTM", metrics).format());

    if args.save_metrics {
        let path = ws
            .config
            .metrics_path
            .clone()
            .context("--save-metrics needs METRICS_PATH to be set")?;
        ModelMetrics::new(metrics.rmse, metrics.mae).to_file(&path)?;
        writeln!(report, "\nMetrics written to {}", path.display())?;
    }

    ws.plot("lstm_forecast.svg", |path| {
        plot_forecast(&actual, &predicted, "LSTM Forecast vs Actual", path)
    });

    Ok(report)
}
