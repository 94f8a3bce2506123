//! Augmented Dickey-Fuller unit-root test (constant, no trend)

use crate::error::{AnalysisError, Result};
use crate::stats::ols;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// MacKinnon (2010) response-surface coefficients, constant-only model.
const CRIT_COEFFS: [(&str, [f64; 4]); 3] = [
    ("1%", [-3.43035, -6.5393, -16.786, -79.433]),
    ("5%", [-2.86154, -2.8903, -4.234, -40.040]),
    ("10%", [-2.56677, -1.5384, -2.809, 0.0]),
];

/// MacKinnon (1994) p-value polynomials, constant-only model.
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

/// ADF test outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdfResult {
    pub statistic: f64,
    pub p_value: f64,
    pub used_lag: usize,
    pub nobs: usize,
    /// `(level, critical value)`, most to least strict
    pub critical_values: Vec<(String, f64)>,
}

impl AdfResult {
    /// Reject the unit root at `level` ("1%", "5%" or "10%")?
    pub fn is_stationary_at(&self, level: &str) -> bool {
        self.critical_values
            .iter()
            .find(|(l, _)| l == level)
            .map(|(_, cv)| self.statistic < *cv)
            .unwrap_or(false)
    }

    pub fn format(&self) -> String {
        let mut s = format!(
            "ADF Statistic: {:.4}\np-value: {:.4}\nLags used: {}\nObservations: {}\n",
            self.statistic, self.p_value, self.used_lag, self.nobs
        );
        for (level, cv) in &self.critical_values {
            s.push_str(&format!("Critical value ({}): {:.4}\n", level, cv));
        }
        s
    }
}

/// Run the ADF regression `dy_t = a + g*y_{t-1} + sum b_i*dy_{t-i} + e_t`.
///
/// With `lags = None` the lag is chosen by AIC over `0..=12*(n/100)^(1/4)`
/// on a common sample, then the regression is refit with all usable rows.
pub fn adf_test(values: &[f64], lags: Option<usize>) -> Result<AdfResult> {
    let n = values.len();
    if n < 8 {
        return Err(AnalysisError::insufficient(format!(
            "ADF test needs at least 8 observations, got {}",
            n
        )));
    }
    let diff: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    let used_lag = match lags {
        Some(lag) => lag,
        None => {
            let max_lag = ((12.0 * (n as f64 / 100.0).powf(0.25)) as usize).min(n / 2 - 2);
            select_lag(values, &diff, max_lag)?
        }
    };
    if diff.len() <= used_lag + 3 {
        return Err(AnalysisError::insufficient(format!(
            "{} differences leave no room for {} lags",
            diff.len(),
            used_lag
        )));
    }

    let (x, y) = adf_design(values, &diff, used_lag, used_lag);
    let fit = ols(&x, &y)?;
    let statistic = fit.t_stat(1);
    let nobs = y.len();

    let critical_values = CRIT_COEFFS
        .iter()
        .map(|(level, b)| {
            let t = nobs as f64;
            (
                level.to_string(),
                b[0] + b[1] / t + b[2] / t.powi(2) + b[3] / t.powi(3),
            )
        })
        .collect();

    Ok(AdfResult {
        statistic,
        p_value: mackinnon_p_value(statistic),
        used_lag,
        nobs,
        critical_values,
    })
}

/// Design rows start at difference index `start` (>= lag).
fn adf_design(values: &[f64], diff: &[f64], lag: usize, start: usize) -> (DMatrix<f64>, DVector<f64>) {
    let rows = diff.len() - start;
    let cols = 2 + lag;
    let mut x = DMatrix::zeros(rows, cols);
    let mut y = DVector::zeros(rows);
    for (r, t) in (start..diff.len()).enumerate() {
        y[r] = diff[t];
        x[(r, 0)] = 1.0;
        // diff[t] = values[t + 1] - values[t]
        x[(r, 1)] = values[t];
        for i in 1..=lag {
            x[(r, 1 + i)] = diff[t - i];
        }
    }
    (x, y)
}

fn select_lag(values: &[f64], diff: &[f64], max_lag: usize) -> Result<usize> {
    let mut best = (0usize, f64::INFINITY);
    for lag in 0..=max_lag {
        let (x, y) = adf_design(values, diff, lag, max_lag);
        let fit = match ols(&x, &y) {
            Ok(fit) => fit,
            Err(_) => continue,
        };
        let nobs = y.len() as f64;
        let llf = -nobs / 2.0 * ((2.0 * std::f64::consts::PI * fit.ssr / nobs).ln() + 1.0);
        let aic = -2.0 * llf + 2.0 * x.ncols() as f64;
        if aic < best.1 {
            best = (lag, aic);
        }
    }
    if best.1.is_infinite() {
        return Err(AnalysisError::numerical("no ADF lag order could be fitted"));
    }
    Ok(best.0)
}

/// Approximate p-value of the ADF statistic
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let z = if statistic <= TAU_STAR {
        polyval(&TAU_SMALL_P, statistic)
    } else {
        polyval(&TAU_LARGE_P, statistic)
    };
    Normal::new(0.0, 1.0).map(|n| n.cdf(z)).unwrap_or(f64::NAN)
}

/// `c[0] + c[1] x + c[2] x^2 + ...`
fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use rand_distr::{Distribution, Normal as NormalDist};

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let dist = NormalDist::new(0.0, 1.0).unwrap();
        (0..n).map(|_| dist.sample(&mut rng)).collect()
    }

    #[test]
    fn test_p_value_at_five_percent_critical_value() {
        let p = mackinnon_p_value(-2.86);
        assert!((p - 0.05).abs() < 0.005, "p = {}", p);
        assert_eq!(mackinnon_p_value(5.0), 1.0);
        assert_eq!(mackinnon_p_value(-30.0), 0.0);
    }

    #[test]
    fn test_white_noise_is_stationary() {
        let result = adf_test(&noise(400, 7), Some(1)).unwrap();
        assert!(result.is_stationary_at("1%"), "{}", result.format());
        assert!(result.p_value < 0.01);
    }

    #[test]
    fn test_random_walk_is_not_stationary() {
        let walk: Vec<f64> = noise(400, 11)
            .iter()
            .scan(100.0, |level, e| {
                *level += e;
                Some(*level)
            })
            .collect();
        let result = adf_test(&walk, None).unwrap();
        assert!(!result.is_stationary_at("1%"), "{}", result.format());
        assert_eq!(result.critical_values.len(), 3);
    }
}
