//! Ordinary least squares on `nalgebra` matrices

use crate::error::{AnalysisError, Result};
use nalgebra::{DMatrix, DVector};

/// Single-equation OLS fit
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub beta: DVector<f64>,
    pub residuals: DVector<f64>,
    /// `(X'X)^-1`, used for coefficient standard errors
    pub xtx_inv: DMatrix<f64>,
    /// Residual sum of squares
    pub ssr: f64,
    pub nobs: usize,
}

impl OlsFit {
    /// Residual variance with `nobs - k` degrees of freedom
    pub fn sigma2(&self) -> f64 {
        let df = self.nobs.saturating_sub(self.beta.len()).max(1);
        self.ssr / df as f64
    }

    /// Standard error of coefficient `i`
    pub fn std_error(&self, i: usize) -> f64 {
        (self.sigma2() * self.xtx_inv[(i, i)]).sqrt()
    }

    /// t-statistic of coefficient `i`
    pub fn t_stat(&self, i: usize) -> f64 {
        self.beta[i] / self.std_error(i)
    }
}

/// Fit `y = X b` by OLS
pub fn ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<OlsFit> {
    if x.nrows() != y.len() {
        return Err(AnalysisError::invalid(format!(
            "design has {} rows but response has {}",
            x.nrows(),
            y.len()
        )));
    }
    if x.nrows() < x.ncols() {
        return Err(AnalysisError::insufficient(format!(
            "{} observations for {} regressors",
            x.nrows(),
            x.ncols()
        )));
    }

    let xtx = x.transpose() * x;
    let xtx_inv = xtx
        .try_inverse()
        .ok_or_else(|| AnalysisError::numerical("singular design matrix"))?;
    let beta = &xtx_inv * (x.transpose() * y);
    let residuals = y - x * &beta;
    let ssr = residuals.dot(&residuals);

    Ok(OlsFit {
        beta,
        residuals,
        xtx_inv,
        ssr,
        nobs: x.nrows(),
    })
}

/// Multi-equation OLS: `Y = X B`, one column of `B` per response column.
/// Returns `(B, residuals)`.
pub fn ols_multi(x: &DMatrix<f64>, y: &DMatrix<f64>) -> Result<(DMatrix<f64>, DMatrix<f64>)> {
    if x.nrows() != y.nrows() {
        return Err(AnalysisError::invalid(format!(
            "design has {} rows but response has {}",
            x.nrows(),
            y.nrows()
        )));
    }
    if x.nrows() <= x.ncols() {
        return Err(AnalysisError::insufficient(format!(
            "{} observations for {} regressors",
            x.nrows(),
            x.ncols()
        )));
    }

    let xtx = x.transpose() * x;
    let xtx_inv = xtx
        .try_inverse()
        .ok_or_else(|| AnalysisError::numerical("singular design matrix"))?;
    let b = xtx_inv * (x.transpose() * y);
    let residuals = y - x * &b;
    Ok((b, residuals))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_line() {
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0]);
        let y = DVector::from_vec(vec![1.0, 3.0, 5.0, 7.0]);
        let fit = ols(&x, &y).unwrap();
        assert!((fit.beta[0] - 1.0).abs() < 1e-10);
        assert!((fit.beta[1] - 2.0).abs() < 1e-10);
        assert!(fit.ssr < 1e-18);
    }

    #[test]
    fn test_singular_design() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert!(ols(&x, &y).is_err());
    }
}
