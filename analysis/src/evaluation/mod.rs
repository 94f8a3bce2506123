//! Forecast evaluation

pub mod metrics;
pub mod report;

pub use metrics::*;
pub use report::*;

use crate::error::Result;
use crate::plot::{line_chart, ChartSeries};
use std::path::Path;

/// Write an actual-vs-forecast line chart to `path` (SVG)
pub fn plot_forecast(actual: &[f64], predicted: &[f64], title: &str, path: &Path) -> Result<()> {
    let series = [
        ChartSeries::new("Actual", actual.to_vec()),
        ChartSeries::new("Forecast", predicted.to_vec()),
    ];
    line_chart(title, &series, &[], None, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;

    #[test]
    fn test_plot_forecast_writes_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eval").join("forecast.svg");
        let actual = [70.0, 71.5, 69.8, 72.3, 73.0];
        let predicted = [70.2, 71.0, 70.5, 71.9, 72.6];
        match plot_forecast(&actual, &predicted, "ARIMA forecast", &path) {
            // no system font to lay out text with
            Err(AnalysisError::Plot(msg)) if msg.to_lowercase().contains("font") => return,
            other => other.unwrap(),
        }
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn test_plot_forecast_rejects_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.svg");
        assert!(plot_forecast(&[], &[], "Empty", &path).is_err());
        assert!(plot_forecast(&[f64::NAN], &[f64::NAN], "NaN", &path).is_err());
        assert!(!path.exists());
    }
}
