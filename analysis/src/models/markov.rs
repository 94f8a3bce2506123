//! Markov-switching mean/variance model
//!
//! `x_t = mu[s_t] + e_t`, `e_t ~ N(0, sigma2[s_t])`, with `s_t` a first-order
//! Markov chain. Estimated by EM: the Hamilton filter and Kim smoother give
//! regime probabilities, closed-form updates give the parameters.

use crate::config::MarkovConfig;
use crate::error::{AnalysisError, Result};
use crate::stats::variance;
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{debug, info, warn};

/// Fitted regime model; regimes are ordered by ascending mean
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkovSwitchingModel {
    pub k_regimes: usize,
    pub means: Array1<f64>,
    pub variances: Array1<f64>,
    /// `transition[[i, j]] = P(s_t = j | s_{t-1} = i)`
    pub transition: Array2<f64>,
    /// `P(s_t | x_1..x_t)`, one row per observation
    pub filtered: Array2<f64>,
    /// `P(s_t | x_1..x_T)`
    pub smoothed: Array2<f64>,
    pub llf: f64,
    pub aic: f64,
    pub bic: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl MarkovSwitchingModel {
    /// Expected regime durations `1 / (1 - p_ii)`
    pub fn expected_durations(&self) -> Vec<f64> {
        (0..self.k_regimes)
            .map(|i| 1.0 / (1.0 - self.transition[[i, i]]))
            .collect()
    }

    /// Most probable regime per observation under the smoothed probabilities
    pub fn most_likely_regimes(&self) -> Vec<usize> {
        self.smoothed
            .axis_iter(Axis(0))
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |best, (j, &p)| if p > best.1 { (j, p) } else { best })
                    .0
            })
            .collect()
    }

    pub fn summary(&self) -> String {
        let mut s = format!("Markov Switching Model ({} regimes)\n", self.k_regimes);
        s.push_str(&"=".repeat(40));
        s.push('\n');
        s.push_str(&format!("Observations: {}\n", self.smoothed.nrows()));
        s.push_str(&format!("Log likelihood: {:.3}\n", self.llf));
        s.push_str(&format!("AIC: {:.2}  BIC: {:.2}\n", self.aic, self.bic));
        let durations = self.expected_durations();
        for j in 0..self.k_regimes {
            s.push_str(&format!(
                "Regime {}: mean {:>10.4}  variance {:>10.4}  expected duration {:>8.1}\n",
                j, self.means[j], self.variances[j], durations[j]
            ));
        }
        s.push_str("Transition matrix:\n");
        for row in self.transition.axis_iter(Axis(0)) {
            let cells: Vec<String> = row.iter().map(|p| format!("{:.4}", p)).collect();
            s.push_str(&format!("  [{}]\n", cells.join(", ")));
        }
        s
    }
}

/// EM estimator
#[derive(Debug, Clone, Default)]
pub struct MarkovSwitching {
    config: MarkovConfig,
}

struct Filtered {
    predicted: Array2<f64>,
    filtered: Array2<f64>,
    llf: f64,
}

impl MarkovSwitching {
    pub fn new(k_regimes: usize) -> Self {
        Self {
            config: MarkovConfig {
                k_regimes,
                ..Default::default()
            },
        }
    }

    pub fn with_config(config: MarkovConfig) -> Self {
        Self { config }
    }

    pub fn fit(&self, series: &[f64]) -> Result<MarkovSwitchingModel> {
        let k = self.config.k_regimes;
        let n = series.len();
        if k < 2 {
            return Err(AnalysisError::invalid("Markov switching needs at least two regimes"));
        }
        if n < 5 * k {
            return Err(AnalysisError::insufficient(format!(
                "{} observations are too few for {} regimes",
                n, k
            )));
        }
        let total_var = variance(series).unwrap_or(1.0).max(1e-12);
        let var_floor = total_var * 1e-6;
        let x = Array1::from_vec(series.to_vec());

        // quantile-spread starting values
        let mut sorted = series.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mut means = Array1::from_shape_fn(k, |j| {
            let q = (j as f64 + 0.5) / k as f64;
            sorted[((q * (n - 1) as f64).round() as usize).min(n - 1)]
        });
        let mut variances = Array1::from_elem(k, total_var / k as f64);
        let mut transition = Array2::from_shape_fn((k, k), |(i, j)| {
            if i == j {
                0.9
            } else {
                0.1 / (k - 1) as f64
            }
        });

        let mut llf_prev = f64::NEG_INFINITY;
        let mut converged = false;
        let mut iterations = 0;
        let mut result = hamilton_filter(&x, &means, &variances, &transition)?;

        while iterations < self.config.max_iter {
            iterations += 1;
            let (smoothed, xi_sum) = kim_smoother(&result, &transition);

            // M-step
            for j in 0..k {
                let w = smoothed.column(j);
                let weight = w.sum().max(1e-12);
                let mu = w.dot(&x) / weight;
                let var = w
                    .iter()
                    .zip(x.iter())
                    .map(|(g, v)| g * (v - mu).powi(2))
                    .sum::<f64>()
                    / weight;
                means[j] = mu;
                variances[j] = var.max(var_floor);
            }
            for i in 0..k {
                let row_sum: f64 = xi_sum.row(i).sum();
                if row_sum > 0.0 {
                    for j in 0..k {
                        transition[[i, j]] = (xi_sum[[i, j]] / row_sum).max(1e-12);
                    }
                    let norm = transition.row(i).sum();
                    transition.row_mut(i).mapv_inplace(|p| p / norm);
                }
            }

            result = hamilton_filter(&x, &means, &variances, &transition)?;
            debug!("EM iteration {}: llf {:.6}", iterations, result.llf);
            if (result.llf - llf_prev).abs() < self.config.tolerance * (1.0 + result.llf.abs()) {
                converged = true;
                break;
            }
            llf_prev = result.llf;
        }
        if !converged {
            warn!(
                "Markov switching EM did not converge in {} iterations",
                self.config.max_iter
            );
        }
        let (smoothed, _) = kim_smoother(&result, &transition);

        // order regimes by mean
        let mut order: Vec<usize> = (0..k).collect();
        order.sort_by(|&a, &b| means[a].total_cmp(&means[b]));
        let means = Array1::from_shape_fn(k, |j| means[order[j]]);
        let variances = Array1::from_shape_fn(k, |j| variances[order[j]]);
        let transition = Array2::from_shape_fn((k, k), |(i, j)| transition[[order[i], order[j]]]);
        let filtered = Array2::from_shape_fn((n, k), |(t, j)| result.filtered[[t, order[j]]]);
        let smoothed = Array2::from_shape_fn((n, k), |(t, j)| smoothed[[t, order[j]]]);

        let n_params = (2 * k + k * (k - 1)) as f64;
        let llf = result.llf;
        let model = MarkovSwitchingModel {
            k_regimes: k,
            means,
            variances,
            transition,
            filtered,
            smoothed,
            llf,
            aic: -2.0 * llf + 2.0 * n_params,
            bic: -2.0 * llf + n_params * (n as f64).ln(),
            iterations,
            converged,
        };
        info!(
            "Markov switching fitted in {} iterations: llf {:.3}, regime means {:?}",
            iterations,
            llf,
            model.means.to_vec()
        );
        Ok(model)
    }
}

/// Stationary distribution of a transition matrix
fn ergodic_probabilities(transition: &Array2<f64>) -> Result<Array1<f64>> {
    let k = transition.nrows();
    // (I - P') pi = 0 with the last equation replaced by sum(pi) = 1
    let mut a = DMatrix::from_fn(k, k, |i, j| {
        let identity = if i == j { 1.0 } else { 0.0 };
        identity - transition[[j, i]]
    });
    for j in 0..k {
        a[(k - 1, j)] = 1.0;
    }
    let mut b = DVector::zeros(k);
    b[k - 1] = 1.0;
    let pi = a
        .lu()
        .solve(&b)
        .ok_or_else(|| AnalysisError::numerical("transition matrix has no unique ergodic distribution"))?;
    Ok(Array1::from_iter(pi.iter().map(|p| p.max(0.0))))
}

fn hamilton_filter(
    x: &Array1<f64>,
    means: &Array1<f64>,
    variances: &Array1<f64>,
    transition: &Array2<f64>,
) -> Result<Filtered> {
    let n = x.len();
    let k = means.len();
    let mut predicted = Array2::zeros((n, k));
    let mut filtered = Array2::zeros((n, k));
    let mut llf = 0.0;
    let mut prior = ergodic_probabilities(transition)?;

    for t in 0..n {
        if t > 0 {
            prior = transition.t().dot(&filtered.row(t - 1));
        }
        predicted.row_mut(t).assign(&prior);

        let log_dens: Vec<f64> = (0..k)
            .map(|j| -0.5 * ((2.0 * PI * variances[j]).ln() + (x[t] - means[j]).powi(2) / variances[j]))
            .collect();
        let max_ld = log_dens.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut total = 0.0;
        for j in 0..k {
            let v = prior[j] * (log_dens[j] - max_ld).exp();
            filtered[[t, j]] = v;
            total += v;
        }
        if !(total > 0.0) || !total.is_finite() {
            return Err(AnalysisError::numerical(format!(
                "regime probabilities vanished at observation {}",
                t
            )));
        }
        filtered.row_mut(t).mapv_inplace(|v| v / total);
        llf += max_ld + total.ln();
    }

    Ok(Filtered {
        predicted,
        filtered,
        llf,
    })
}

/// Smoothed probabilities and summed joint transition probabilities
fn kim_smoother(result: &Filtered, transition: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    let (n, k) = result.filtered.dim();
    let mut smoothed = Array2::zeros((n, k));
    let mut xi_sum = Array2::zeros((k, k));
    smoothed.row_mut(n - 1).assign(&result.filtered.row(n - 1));

    for t in (0..n - 1).rev() {
        let ratio = Array1::from_shape_fn(k, |j| {
            let pred = result.predicted[[t + 1, j]];
            if pred > 0.0 {
                smoothed[[t + 1, j]] / pred
            } else {
                0.0
            }
        });
        for i in 0..k {
            let mut acc = 0.0;
            for j in 0..k {
                let joint = result.filtered[[t, i]] * transition[[i, j]] * ratio[j];
                xi_sum[[i, j]] += joint;
                acc += joint;
            }
            smoothed[[t, i]] = acc;
        }
    }
    (smoothed, xi_sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn two_regimes() -> (Vec<f64>, Vec<usize>) {
        let mut rng = StdRng::seed_from_u64(9);
        let low = Normal::new(0.0, 0.5).unwrap();
        let high = Normal::new(10.0, 1.0).unwrap();
        let mut values = Vec::new();
        let mut states = Vec::new();
        for block in 0..6 {
            for _ in 0..50 {
                if block % 2 == 0 {
                    values.push(low.sample(&mut rng));
                    states.push(0);
                } else {
                    values.push(high.sample(&mut rng));
                    states.push(1);
                }
            }
        }
        (values, states)
    }

    #[test]
    fn test_recovers_two_regimes() {
        let (values, states) = two_regimes();
        let model = MarkovSwitching::new(2).fit(&values).unwrap();

        assert!(model.means[0].abs() < 0.3);
        assert!((model.means[1] - 10.0).abs() < 0.4);
        assert!(model.variances[0] < model.variances[1]);
        assert_eq!(model.most_likely_regimes(), states);

        for row in model.transition.axis_iter(Axis(0)) {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        assert!(model.transition[[0, 0]] > 0.9);
        assert!(model.expected_durations()[1] > 10.0);
        for row in model.smoothed.axis_iter(Axis(0)) {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_ergodic_probabilities() {
        let p = Array2::from_shape_vec((2, 2), vec![0.9, 0.1, 0.3, 0.7]).unwrap();
        let pi = ergodic_probabilities(&p).unwrap();
        assert!((pi[0] - 0.75).abs() < 1e-12);
        assert!((pi[1] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(MarkovSwitching::new(1).fit(&[1.0; 50]).is_err());
        assert!(MarkovSwitching::new(2).fit(&[1.0, 2.0, 3.0]).is_err());
    }
}
