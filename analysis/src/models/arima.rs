//! ARIMA(p, d, q) estimated by conditional sum of squares

use crate::config::{ArimaConfig, ArimaOrder};
use crate::error::{AnalysisError, Result};
use crate::models::optimize::nelder_mead;
use crate::stats::{mean, ols};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{info, warn};

/// Fitted ARIMA model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArimaModel {
    pub order: ArimaOrder,
    /// Intercept `c` in `w[t] = c + sum(ar * w) + sum(ma * e) + e[t]`, fitted only
    /// when `d = 0`. This is not the series mean; see [`ArimaModel::process_mean`].
    pub constant: Option<f64>,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub sigma2: f64,
    pub llf: f64,
    pub aic: f64,
    pub bic: f64,
    /// Residuals of the differenced series, from index `p` of that series
    pub residuals: Vec<f64>,
    /// One-step-ahead fitted levels for observations `fitted_start..`
    fitted: Vec<f64>,
    fitted_start: usize,
    /// Original (level) observations
    history: Vec<f64>,
    converged: bool,
}

impl ArimaModel {
    /// Fit with default optimiser settings
    pub fn fit(series: &[f64], order: ArimaOrder) -> Result<Self> {
        Self::fit_with(
            series,
            &ArimaConfig {
                order,
                ..Default::default()
            },
        )
    }

    pub fn fit_with(series: &[f64], config: &ArimaConfig) -> Result<Self> {
        let ArimaOrder { p, d, q } = config.order;
        let w = difference(series, d);
        let n_params = p + q + usize::from(d == 0);
        if series.len() <= d || w.len() < 2 * (p + q) + n_params + 3 {
            return Err(AnalysisError::insufficient(format!(
                "ARIMA{} needs more than {} observations",
                config.order,
                series.len()
            )));
        }

        let include_const = d == 0;
        let start = hannan_rissanen(&w, p, q, include_const);
        let objective = |params: &[f64]| {
            let (c, ar, ma) = split_params(params, p, q, include_const);
            css_residuals(&w, c, ar, ma).iter().map(|e| e * e).sum::<f64>()
        };
        let minimum = nelder_mead(objective, &start, 0.1, config.max_iter, config.tolerance);
        if !minimum.converged {
            warn!(
                "ARIMA{} optimiser stopped after {} iterations without converging",
                config.order, minimum.iterations
            );
        }

        let (c, ar, ma) = split_params(&minimum.x, p, q, include_const);
        let residuals = css_residuals(&w, c, ar, ma);
        let nobs = residuals.len() as f64;
        let css: f64 = residuals.iter().map(|e| e * e).sum();
        let sigma2 = css / nobs;
        if !sigma2.is_finite() {
            return Err(AnalysisError::numerical("ARIMA residual variance is not finite"));
        }
        let llf = -0.5 * nobs * ((2.0 * PI * sigma2).ln() + 1.0);
        // coefficients plus sigma2
        let n_estimated = (n_params + 1) as f64;

        // w[t] = fitted + e for t >= p; map back onto levels
        let coeffs = binomial_signs(d);
        let fitted_start = d + p;
        let fitted = (p..w.len())
            .map(|t| {
                let i = t + d;
                let w_hat = w[t] - residuals[t - p];
                w_hat - (1..=d).map(|k| coeffs[k] * series[i - k]).sum::<f64>()
            })
            .collect();

        let model = Self {
            order: config.order,
            constant: c,
            ar: ar.to_vec(),
            ma: ma.to_vec(),
            sigma2,
            llf,
            aic: -2.0 * llf + 2.0 * n_estimated,
            bic: -2.0 * llf + n_estimated * nobs.ln(),
            residuals,
            fitted,
            fitted_start,
            history: series.to_vec(),
            converged: minimum.converged,
        };
        info!(
            "ARIMA{} fitted: AIC {:.2}, BIC {:.2}, sigma2 {:.4}",
            model.order, model.aic, model.bic, model.sigma2
        );
        Ok(model)
    }

    /// In-sample one-step predictions on the level scale
    pub fn fitted_values(&self) -> &[f64] {
        &self.fitted
    }

    /// Index of the first observation covered by [`Self::fitted_values`]
    pub fn fitted_start(&self) -> usize {
        self.fitted_start
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Unconditional mean `c / (1 - sum(ar))` implied by the intercept.
    /// `None` without a constant or when the AR polynomial has a unit root.
    pub fn process_mean(&self) -> Option<f64> {
        let c = self.constant?;
        let denom = 1.0 - self.ar.iter().sum::<f64>();
        (denom.abs() > 1e-8).then(|| c / denom)
    }

    /// `h`-step forecast on the level scale, continuing from the last observation
    pub fn forecast(&self, h: usize) -> Vec<f64> {
        let ArimaOrder { p, d, q } = self.order;
        let mut w = difference(&self.history, d);
        let mut e = vec![0.0; w.len() - self.residuals.len()];
        e.extend_from_slice(&self.residuals);
        let c = self.constant.unwrap_or(0.0);
        let coeffs = binomial_signs(d);
        let mut levels = self.history.clone();

        let mut out = Vec::with_capacity(h);
        for _ in 0..h {
            let t = w.len();
            let mut next = c;
            for i in 0..p.min(t) {
                next += self.ar[i] * w[t - 1 - i];
            }
            for j in 0..q.min(t) {
                next += self.ma[j] * e[t - 1 - j];
            }
            w.push(next);
            e.push(0.0);

            let i = levels.len();
            let level = next - (1..=d).map(|k| coeffs[k] * levels[i - k]).sum::<f64>();
            levels.push(level);
            out.push(level);
        }
        out
    }

    pub fn summary(&self) -> String {
        let mut s = format!("ARIMA{} Model Summary\n", self.order);
        s.push_str(&"=".repeat(40));
        s.push('\n');
        s.push_str(&format!("Observations: {}\n", self.history.len()));
        if let Some(c) = self.constant {
            s.push_str(&format!("Intercept: {:.6}\n", c));
        }
        if let Some(m) = self.process_mean() {
            s.push_str(&format!("Mean: {:.6}\n", m));
        }
        for (i, c) in self.ar.iter().enumerate() {
            s.push_str(&format!("  ar.L{} = {:.6}\n", i + 1, c));
        }
        for (i, c) in self.ma.iter().enumerate() {
            s.push_str(&format!("  ma.L{} = {:.6}\n", i + 1, c));
        }
        s.push_str(&format!("Sigma2: {:.6}\n", self.sigma2));
        s.push_str(&format!("Log likelihood: {:.3}\n", self.llf));
        s.push_str(&format!("AIC: {:.2}\n", self.aic));
        s.push_str(&format!("BIC: {:.2}\n", self.bic));
        s
    }
}

/// Apply first differences `d` times
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut out = series.to_vec();
    for _ in 0..d {
        out = out.windows(2).map(|w| w[1] - w[0]).collect();
    }
    out
}

/// `(-1)^k C(d, k)` for `k = 0..=d`, the weights of the `d`-th difference
fn binomial_signs(d: usize) -> Vec<f64> {
    let mut coeffs = vec![1.0; d + 1];
    for k in 1..=d {
        coeffs[k] = -coeffs[k - 1] * (d - k + 1) as f64 / k as f64;
    }
    coeffs
}

fn split_params(params: &[f64], p: usize, q: usize, include_const: bool) -> (Option<f64>, &[f64], &[f64]) {
    let offset = usize::from(include_const);
    let c = include_const.then(|| params[0]);
    (c, &params[offset..offset + p], &params[offset + p..offset + p + q])
}

/// Conditional residuals for `t >= p`, pre-sample shocks set to zero
fn css_residuals(w: &[f64], c: Option<f64>, ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let p = ar.len();
    let c = c.unwrap_or(0.0);
    let mut e = vec![0.0; w.len()];
    for t in p..w.len() {
        let mut pred = c;
        for (i, phi) in ar.iter().enumerate() {
            pred += phi * w[t - 1 - i];
        }
        for (j, theta) in ma.iter().enumerate() {
            if t > j {
                pred += theta * e[t - 1 - j];
            }
        }
        e[t] = w[t] - pred;
    }
    e.split_off(p)
}

/// Hannan-Rissanen starting values: a long autoregression supplies residual
/// estimates, then ARMA coefficients come from one OLS pass.
fn hannan_rissanen(w: &[f64], p: usize, q: usize, include_const: bool) -> Vec<f64> {
    let fallback = || {
        let mut x = Vec::with_capacity(p + q + 1);
        if include_const {
            x.push(mean(w).unwrap_or(0.0));
        }
        x.extend(std::iter::repeat(0.0).take(p + q));
        x
    };

    let long = if q > 0 { (p + q).max(3).min(w.len() / 4).max(1) } else { 0 };
    let shocks = if q > 0 {
        match ar_ols(w, long, include_const) {
            Some((_, resid)) => {
                let mut e = vec![0.0; long];
                e.extend(resid);
                e
            }
            None => return fallback(),
        }
    } else {
        vec![0.0; w.len()]
    };

    let skip = p.max(q) + long;
    let rows = w.len().saturating_sub(skip);
    let cols = p + q + usize::from(include_const);
    if cols == 0 {
        return Vec::new();
    }
    if rows <= cols {
        return fallback();
    }

    let x = DMatrix::from_fn(rows, cols, |r, col| {
        let t = skip + r;
        let col = if include_const {
            if col == 0 {
                return 1.0;
            }
            col - 1
        } else {
            col
        };
        if col < p {
            w[t - 1 - col]
        } else {
            shocks[t - 1 - (col - p)]
        }
    });
    let y = DVector::from_iterator(rows, w[skip..].iter().copied());
    match ols(&x, &y) {
        Ok(fit) => fit.beta.iter().copied().collect(),
        Err(_) => fallback(),
    }
}

/// OLS autoregression of order `lags`; returns coefficients and residuals
fn ar_ols(w: &[f64], lags: usize, include_const: bool) -> Option<(Vec<f64>, Vec<f64>)> {
    let rows = w.len().checked_sub(lags)?;
    let cols = lags + usize::from(include_const);
    if rows <= cols {
        return None;
    }
    let x = DMatrix::from_fn(rows, cols, |r, col| {
        let t = lags + r;
        if include_const {
            if col == 0 {
                1.0
            } else {
                w[t - col]
            }
        } else {
            w[t - 1 - col]
        }
    });
    let y = DVector::from_iterator(rows, w[lags..].iter().copied());
    let fit = ols(&x, &y).ok()?;
    Some((fit.beta.iter().copied().collect(), fit.residuals.iter().copied().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn ar1(phi: f64, c: f64, n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let mut x = vec![c / (1.0 - phi)];
        for _ in 1..n {
            let prev = x[x.len() - 1];
            x.push(c + phi * prev + noise.sample(&mut rng));
        }
        x
    }

    #[test]
    fn test_difference_and_weights() {
        assert_eq!(difference(&[1.0, 4.0, 9.0, 16.0], 1), vec![3.0, 5.0, 7.0]);
        assert_eq!(difference(&[1.0, 4.0, 9.0, 16.0], 2), vec![2.0, 2.0]);
        assert_eq!(binomial_signs(2), vec![1.0, -2.0, 1.0]);
    }

    #[test]
    fn test_recovers_ar1_coefficient() {
        let series = ar1(0.6, 1.0, 600, 7);
        let model = ArimaModel::fit(&series, ArimaOrder::new(1, 0, 0)).unwrap();
        assert!((model.ar[0] - 0.6).abs() < 0.1, "phi = {}", model.ar[0]);
        assert!((model.constant.unwrap() - 1.0).abs() < 0.3);
        assert!((model.sigma2 - 1.0).abs() < 0.2);
        assert_eq!(model.fitted_values().len(), series.len() - 1);
        assert_eq!(model.fitted_start(), 1);
    }

    #[test]
    fn test_process_mean_differs_from_intercept() {
        // c = 2, phi = 0.5 gives mean 4
        let series = ar1(0.5, 2.0, 800, 21);
        let model = ArimaModel::fit(&series, ArimaOrder::new(1, 0, 0)).unwrap();
        let mean = model.process_mean().unwrap();
        assert!((mean - 4.0).abs() < 0.3, "mean = {}", mean);
        assert!((model.constant.unwrap() - mean).abs() > 1.0);

        let summary = model.summary();
        assert!(summary.contains(&format!("Intercept: {:.6}", model.constant.unwrap())));
        assert!(summary.contains(&format!("Mean: {:.6}", mean)));

        let differenced = ArimaModel::fit(&series, ArimaOrder::new(1, 1, 0)).unwrap();
        assert!(differenced.process_mean().is_none());
        assert!(!differenced.summary().contains("Mean:"));
    }

    #[test]
    fn test_random_walk_forecast_continues_from_last_level() {
        let series: Vec<f64> = (0..50).map(|i| 10.0 + (i as f64 * 0.9).sin()).collect();
        let model = ArimaModel::fit(&series, ArimaOrder::new(0, 1, 0)).unwrap();
        assert!(model.constant.is_none());
        let forecast = model.forecast(3);
        for f in forecast {
            assert!((f - series[49]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_default_order_fits_and_summarises() {
        let mut level = 50.0;
        let series: Vec<f64> = ar1(0.4, 0.0, 300, 11)
            .into_iter()
            .map(|shock| {
                level += 0.3 * shock;
                level
            })
            .collect();
        let model = ArimaModel::fit(&series, ArimaOrder::default()).unwrap();
        assert_eq!(model.ar.len(), 1);
        assert_eq!(model.ma.len(), 1);
        assert!(model.aic.is_finite() && model.bic > model.aic);

        let forecast = model.forecast(5);
        assert_eq!(forecast.len(), 5);
        assert!((forecast[0] - series[299]).abs() < 3.0);
        assert!(model.summary().contains("ARIMA(1, 1, 1)"));
    }

    #[test]
    fn test_fitted_levels_match_residuals() {
        let series = ar1(0.5, 0.0, 120, 3);
        let model = ArimaModel::fit(&series, ArimaOrder::new(1, 1, 0)).unwrap();
        // level residual equals differenced residual
        let start = model.fitted_start();
        for (k, fitted) in model.fitted_values().iter().enumerate() {
            let resid = series[start + k] - fitted;
            assert!((resid - model.residuals[k]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_too_short() {
        assert!(ArimaModel::fit(&[1.0, 2.0, 3.0], ArimaOrder::default()).is_err());
    }
}
