use super::Workspace;
use anyhow::Result;
use brent_analysis::changepoint::{ChangePointDetector, CostModel, DEFAULT_JUMP, DEFAULT_MIN_SIZE, DEFAULT_PELT_PENALTY};
use brent_analysis::config::PeltConfig;
use brent_analysis::plot::price_chart;
use brent_analysis::stats::mean;
use clap::Args;
use std::fmt::Write;

#[derive(Args, Debug, Clone)]
pub struct PeltArgs {
    /// Segment cost: l1, l2 or rbf
    #[arg(long, default_value_t = CostModel::Rbf)]
    pub model: CostModel,

    /// Penalty added per change point
    #[arg(long, default_value_t = DEFAULT_PELT_PENALTY)]
    pub penalty: f64,

    #[arg(long, default_value_t = DEFAULT_MIN_SIZE)]
    pub min_size: usize,

    /// Candidate change points lie on multiples of this step
    #[arg(long, default_value_t = DEFAULT_JUMP)]
    pub jump: usize,
}

impl From<&PeltArgs> for PeltConfig {
    fn from(args: &PeltArgs) -> Self {
        PeltConfig {
            model: args.model,
            penalty: args.penalty,
            min_size: args.min_size,
            jump: args.jump,
        }
    }
}

pub fn run(args: &PeltArgs, ws: &Workspace) -> Result<String> {
    let prices = ws.prices()?;
    let values = prices.prices();
    let detector = PeltConfig::from(args).detector();
    let result = detector.detect(&values)?;

    let mut report = String::new();
    writeln!(
        report,
        "PELT ({} cost, penalty {}): {} change points",
        args.model,
        args.penalty,
        result.interior().len()
    )?;
    for &bkp in result.interior() {
        if let Some(point) = prices.get(bkp) {
            writeln!(report, "  index {:>6}  {}  price {:.2}", bkp, point.date, point.price)?;
        }
    }
    writeln!(report, "Segments:")?;
    for segment in result.segments() {
        let segment_mean = mean(&values[segment.clone()]).unwrap_or(f64::NAN);
        writeln!(
            report,
            "  [{:>6}, {:>6})  mean {:.2}",
            segment.start, segment.end, segment_mean
        )?;
    }

    ws.plot("pelt_change_points.svg", |path| {
        price_chart(&prices, &[], result.interior(), "Brent Oil Price with PELT Change Points", path)
    });

    Ok(report)
}
