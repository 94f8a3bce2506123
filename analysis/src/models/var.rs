//! Vector autoregression

use crate::error::{AnalysisError, Result};
use crate::stats::ols_multi;
use nalgebra::{Cholesky, DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Information criterion for lag selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoCriterion {
    Aic,
    Bic,
    Hqic,
}

impl FromStr for InfoCriterion {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "aic" => Ok(Self::Aic),
            "bic" => Ok(Self::Bic),
            "hqic" => Ok(Self::Hqic),
            other => Err(AnalysisError::invalid(format!(
                "unknown information criterion {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for InfoCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Aic => "AIC",
            Self::Bic => "BIC",
            Self::Hqic => "HQIC",
        })
    }
}

/// Criteria of one candidate lag order on the common sample
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LagScore {
    pub lags: usize,
    pub aic: f64,
    pub bic: f64,
    pub hqic: f64,
}

impl LagScore {
    pub fn get(&self, criterion: InfoCriterion) -> f64 {
        match criterion {
            InfoCriterion::Aic => self.aic,
            InfoCriterion::Bic => self.bic,
            InfoCriterion::Hqic => self.hqic,
        }
    }
}

/// Fitted VAR(p) with intercept: `y_t = c + A_1 y_{t-1} + ... + A_p y_{t-p} + u_t`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarModel {
    pub names: Vec<String>,
    pub lags: usize,
    pub intercept: DVector<f64>,
    /// `A_1..A_p`, each `k x k`
    pub coefs: Vec<DMatrix<f64>>,
    /// Residual covariance, degrees-of-freedom adjusted
    pub sigma_u: DMatrix<f64>,
    pub residuals: DMatrix<f64>,
    pub nobs: usize,
    pub llf: f64,
    pub aic: f64,
    pub bic: f64,
    pub hqic: f64,
    /// Observations, one row per period
    history: DMatrix<f64>,
    /// Lag-order table when the order was selected
    pub lag_scores: Vec<LagScore>,
}

struct Estimate {
    intercept: DVector<f64>,
    coefs: Vec<DMatrix<f64>>,
    residuals: DMatrix<f64>,
    nobs: usize,
    scores: LagScore,
    log_det_ml: f64,
}

impl VarModel {
    /// Fit with a fixed lag order
    pub fn fit(data: &[(String, Vec<f64>)], lags: usize) -> Result<Self> {
        let (names, y) = to_matrix(data)?;
        if lags == 0 {
            return Err(AnalysisError::invalid("VAR lag order must be at least 1"));
        }
        let est = estimate(&y, lags, lags)?;
        Ok(Self::from_estimate(names, y, lags, est, Vec::new()))
    }

    /// Choose the lag order in `1..=max_lags` minimising `criterion` on a
    /// common estimation sample, then refit on the full sample
    pub fn select_order(
        data: &[(String, Vec<f64>)],
        max_lags: usize,
        criterion: InfoCriterion,
    ) -> Result<Self> {
        let (names, y) = to_matrix(data)?;
        let (t, k) = y.shape();
        let mut max_lags = max_lags;
        while max_lags > 0 && t.saturating_sub(max_lags) <= k * max_lags + 1 {
            max_lags -= 1;
        }
        if max_lags == 0 {
            return Err(AnalysisError::insufficient(format!(
                "{} observations are too few for a VAR in {} variables",
                t, k
            )));
        }

        let mut scores = Vec::with_capacity(max_lags);
        for p in 1..=max_lags {
            scores.push(estimate(&y, p, max_lags)?.scores);
        }
        let best = scores
            .iter()
            .min_by(|a, b| a.get(criterion).total_cmp(&b.get(criterion)))
            .map(|s| s.lags)
            .unwrap_or(1);
        info!(
            "VAR lag order selected by {}: {} (searched 1..={})",
            criterion, best, max_lags
        );

        let est = estimate(&y, best, best)?;
        Ok(Self::from_estimate(names, y, best, est, scores))
    }

    fn from_estimate(
        names: Vec<String>,
        history: DMatrix<f64>,
        lags: usize,
        est: Estimate,
        lag_scores: Vec<LagScore>,
    ) -> Self {
        let k = names.len();
        let dof = (est.nobs - (k * lags + 1)).max(1) as f64;
        let sigma_u = est.residuals.transpose() * &est.residuals / dof;
        let nobs = est.nobs as f64;
        let llf = -0.5 * nobs * (k as f64 * (2.0 * PI).ln() + est.log_det_ml + k as f64);
        info!(
            "VAR({}) fitted on {} observations: AIC {:.4}, BIC {:.4}",
            lags, est.nobs, est.scores.aic, est.scores.bic
        );
        Self {
            names,
            lags,
            intercept: est.intercept,
            coefs: est.coefs,
            sigma_u,
            residuals: est.residuals,
            nobs: est.nobs,
            llf,
            aic: est.scores.aic,
            bic: est.scores.bic,
            hqic: est.scores.hqic,
            history,
            lag_scores,
        }
    }

    pub fn k(&self) -> usize {
        self.names.len()
    }

    /// Forecast `steps` periods past the end of the sample, one row per step
    pub fn forecast(&self, steps: usize) -> DMatrix<f64> {
        let k = self.k();
        let t = self.history.nrows();
        let mut path: Vec<DVector<f64>> = (t - self.lags..t)
            .map(|i| self.history.row(i).transpose())
            .collect();

        let mut out = DMatrix::zeros(steps, k);
        for s in 0..steps {
            let mut next = self.intercept.clone();
            for (i, a) in self.coefs.iter().enumerate() {
                next += a * &path[path.len() - 1 - i];
            }
            out.set_row(s, &next.transpose());
            path.push(next);
        }
        out
    }

    /// MA coefficient matrices `Phi_0 = I, Phi_1, .., Phi_steps`
    pub fn impulse_response(&self, steps: usize) -> Vec<DMatrix<f64>> {
        let k = self.k();
        let mut phi: Vec<DMatrix<f64>> = vec![DMatrix::identity(k, k)];
        for i in 1..=steps {
            let mut m = DMatrix::zeros(k, k);
            for j in 1..=i.min(self.lags) {
                m += &phi[i - j] * &self.coefs[j - 1];
            }
            phi.push(m);
        }
        phi
    }

    /// Responses to one-standard-deviation orthogonal shocks, `Phi_i P` with
    /// `P` the lower Cholesky factor of `sigma_u`
    pub fn orthogonalized_impulse_response(&self, steps: usize) -> Result<Vec<DMatrix<f64>>> {
        let p = Cholesky::new(self.sigma_u.clone())
            .ok_or_else(|| AnalysisError::numerical("residual covariance is not positive definite"))?
            .l();
        Ok(self
            .impulse_response(steps)
            .into_iter()
            .map(|phi| phi * &p)
            .collect())
    }

    /// Path of `response` after a shock to `impulse`, by variable name
    pub fn response(
        &self,
        impulse: &str,
        response: &str,
        steps: usize,
        orthogonalized: bool,
    ) -> Result<Vec<f64>> {
        let find = |name: &str| {
            self.names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| AnalysisError::invalid(format!("unknown variable {:?}", name)))
        };
        let (imp, resp) = (find(impulse)?, find(response)?);
        let irf = if orthogonalized {
            self.orthogonalized_impulse_response(steps)?
        } else {
            self.impulse_response(steps)
        };
        Ok(irf.iter().map(|m| m[(resp, imp)]).collect())
    }

    pub fn summary(&self) -> String {
        let mut s = format!("VAR({}) Model Summary\n", self.lags);
        s.push_str(&"=".repeat(40));
        s.push('\n');
        s.push_str(&format!("Variables: {}\n", self.names.join(", ")));
        s.push_str(&format!("Observations: {}\n", self.nobs));
        s.push_str(&format!("Log likelihood: {:.3}\n", self.llf));
        s.push_str(&format!("AIC: {:.4}  BIC: {:.4}  HQIC: {:.4}\n", self.aic, self.bic, self.hqic));
        for (eq, name) in self.names.iter().enumerate() {
            s.push_str(&format!("\nEquation {}\n", name));
            s.push_str(&format!("  const        {:>12.6}\n", self.intercept[eq]));
            for (lag, a) in self.coefs.iter().enumerate() {
                for (col, var) in self.names.iter().enumerate() {
                    s.push_str(&format!("  L{}.{:<10} {:>12.6}\n", lag + 1, var, a[(eq, col)]));
                }
            }
        }
        s
    }
}

fn to_matrix(data: &[(String, Vec<f64>)]) -> Result<(Vec<String>, DMatrix<f64>)> {
    if data.is_empty() {
        return Err(AnalysisError::insufficient("VAR needs at least one variable"));
    }
    let t = data[0].1.len();
    if let Some((name, _)) = data.iter().find(|(_, v)| v.len() != t) {
        return Err(AnalysisError::invalid(format!(
            "column {:?} has a different length",
            name
        )));
    }
    let names = data.iter().map(|(n, _)| n.clone()).collect();
    let y = DMatrix::from_fn(t, data.len(), |r, c| data[c].1[r]);
    Ok((names, y))
}

/// OLS estimate of VAR(`lags`) on observations `start..`
fn estimate(y: &DMatrix<f64>, lags: usize, start: usize) -> Result<Estimate> {
    let (t, k) = y.shape();
    let nobs = t.saturating_sub(start);
    if nobs <= k * lags + 1 {
        return Err(AnalysisError::insufficient(format!(
            "{} observations for a VAR({}) in {} variables",
            nobs, lags, k
        )));
    }

    let x = DMatrix::from_fn(nobs, 1 + k * lags, |r, c| {
        if c == 0 {
            return 1.0;
        }
        let lag = (c - 1) / k + 1;
        let var = (c - 1) % k;
        y[(start + r - lag, var)]
    });
    let target = y.rows(start, nobs).into_owned();
    let (b, residuals) = ols_multi(&x, &target)?;

    let intercept = b.row(0).transpose();
    let coefs = (0..lags)
        .map(|i| b.rows(1 + i * k, k).transpose())
        .collect();

    let sigma_ml = residuals.transpose() * &residuals / nobs as f64;
    let det = sigma_ml.determinant();
    if !(det > 0.0) {
        return Err(AnalysisError::numerical(
            "residual covariance is singular; variables may be collinear",
        ));
    }
    let log_det_ml = det.ln();
    let n = nobs as f64;
    let free = (lags * k * k + k) as f64;
    let scores = LagScore {
        lags,
        aic: log_det_ml + 2.0 * free / n,
        bic: log_det_ml + n.ln() * free / n,
        hqic: log_det_ml + 2.0 * n.ln().ln() * free / n,
    };

    Ok(Estimate {
        intercept,
        coefs,
        residuals,
        nobs,
        scores,
        log_det_ml,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn simulate(n: usize) -> Vec<(String, Vec<f64>)> {
        let mut rng = StdRng::seed_from_u64(5);
        let noise = Normal::new(0.0, 0.5).unwrap();
        let (mut a, mut b) = (vec![0.0], vec![0.0]);
        for t in 1..n {
            let (pa, pb) = (a[t - 1], b[t - 1]);
            a.push(1.0 + 0.5 * pa + 0.2 * pb + noise.sample(&mut rng));
            b.push(-0.5 + 0.1 * pa + 0.3 * pb + noise.sample(&mut rng));
        }
        vec![("oil".to_string(), a), ("gdp".to_string(), b)]
    }

    #[test]
    fn test_recovers_var1_coefficients() {
        let model = VarModel::fit(&simulate(2000), 1).unwrap();
        let a = &model.coefs[0];
        assert!((a[(0, 0)] - 0.5).abs() < 0.06);
        assert!((a[(0, 1)] - 0.2).abs() < 0.06);
        assert!((a[(1, 0)] - 0.1).abs() < 0.06);
        assert!((a[(1, 1)] - 0.3).abs() < 0.06);
        assert!((model.intercept[0] - 1.0).abs() < 0.15);
        assert!((model.sigma_u[(0, 0)] - 0.25).abs() < 0.03);
    }

    #[test]
    fn test_impulse_response_starts_at_identity() {
        let model = VarModel::fit(&simulate(300), 1).unwrap();
        let irf = model.impulse_response(10);
        assert_eq!(irf.len(), 11);
        assert_eq!(irf[0], DMatrix::identity(2, 2));
        assert!((&irf[2] - &model.coefs[0] * &model.coefs[0]).norm() < 1e-12);

        let path = model.response("oil", "gdp", 10, false).unwrap();
        assert_eq!(path[0], 0.0);
        assert!(model.response("oil", "rates", 10, false).is_err());

        let orth = model.orthogonalized_impulse_response(3).unwrap();
        assert!(orth[0][(0, 1)].abs() < 1e-12);
    }

    #[test]
    fn test_select_order_and_forecast() {
        let data = simulate(400);
        let model = VarModel::select_order(&data, 8, InfoCriterion::Bic).unwrap();
        assert_eq!(model.lags, 1);
        assert_eq!(model.lag_scores.len(), 8);

        let forecast = model.forecast(50);
        assert_eq!(forecast.shape(), (50, 2));
        // converges to the unconditional mean
        let a = &model.coefs[0];
        let mean = (DMatrix::identity(2, 2) - a).try_inverse().unwrap() * &model.intercept;
        assert!((forecast[(49, 0)] - mean[0]).abs() < 1e-3);
    }

    #[test]
    fn test_too_short_sample() {
        let data = vec![("x".to_string(), vec![1.0, 2.0, 3.0])];
        assert!(VarModel::select_order(&data, 15, InfoCriterion::Aic).is_err());
    }
}
