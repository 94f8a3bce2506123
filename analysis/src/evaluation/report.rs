//! Evaluation report generation

use crate::evaluation::ForecastMetrics;

/// Evaluation report
#[derive(Debug)]
pub struct EvaluationReport {
    model: String,
    metrics: ForecastMetrics,
}

impl EvaluationReport {
    pub fn new(model: impl Into<String>, metrics: ForecastMetrics) -> Self {
        Self {
            model: model.into(),
            metrics,
        }
    }

    /// Format report as string
    pub fn format(&self) -> String {
        let mape = self
            .metrics
            .mape
            .map_or_else(|| "n/a".to_string(), |m| format!("{:.2}%", m));
        format!(
            r#"
Forecast Evaluation: {}
================
Observations: {}
RMSE: {:.4}
MAE: {:.4}
MAPE: {}
R-squared: {:.4}
"#,
            self.model, self.metrics.count, self.metrics.rmse, self.metrics.mae, mape, self.metrics.r2,
        )
    }

    pub fn metrics(&self) -> &ForecastMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::evaluate_forecast;

    #[test]
    fn test_report_lists_metrics() {
        let metrics = evaluate_forecast(&[1.0, 2.0], &[1.5, 2.5]).unwrap();
        let text = EvaluationReport::new("ARIMA(1, 1, 1)", metrics).format();
        assert!(text.contains("Forecast Evaluation: ARIMA(1, 1, 1)"));
        assert!(text.contains("RMSE: 0.5000"));
        assert!(text.contains("MAPE: 37.50%"));
    }
}
