//! Derivative-free minimisation

/// Outcome of a Nelder-Mead run
#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Nelder-Mead simplex minimisation of `f` starting at `x0`.
///
/// The initial simplex offsets each coordinate by `step` (or by 5% of the
/// coordinate when that is larger). Non-finite objective values are treated
/// as `+inf`, so the simplex steps away from them.
pub fn nelder_mead<F>(f: F, x0: &[f64], step: f64, max_iter: usize, tolerance: f64) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    let eval = |x: &[f64]| {
        let v = f(x);
        if v.is_finite() {
            v
        } else {
            f64::INFINITY
        }
    };

    let dim = x0.len();
    if dim == 0 {
        return Minimum {
            x: Vec::new(),
            value: eval(x0),
            iterations: 0,
            converged: true,
        };
    }

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(dim + 1);
    simplex.push(x0.to_vec());
    for i in 0..dim {
        let mut point = x0.to_vec();
        point[i] += step.max(0.05 * x0[i].abs());
        simplex.push(point);
    }
    let mut values: Vec<f64> = simplex.iter().map(|p| eval(p)).collect();

    let (alpha, gamma, rho, sigma) = (1.0, 2.0, 0.5, 0.5);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iter {
        let mut order: Vec<usize> = (0..=dim).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        let spread = (values[dim] - values[0]).abs();
        if spread <= tolerance * (1.0 + values[0].abs()) {
            converged = true;
            break;
        }
        iterations += 1;

        let centroid: Vec<f64> = (0..dim)
            .map(|j| simplex[..dim].iter().map(|p| p[j]).sum::<f64>() / dim as f64)
            .collect();
        let along = |coef: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&simplex[dim])
                .map(|(c, w)| c + coef * (w - c))
                .collect()
        };

        let reflected = along(-alpha);
        let f_reflected = eval(&reflected);

        if f_reflected < values[0] {
            let expanded = along(-gamma);
            let f_expanded = eval(&expanded);
            if f_expanded < f_reflected {
                simplex[dim] = expanded;
                values[dim] = f_expanded;
            } else {
                simplex[dim] = reflected;
                values[dim] = f_reflected;
            }
            continue;
        }
        if f_reflected < values[dim - 1] {
            simplex[dim] = reflected;
            values[dim] = f_reflected;
            continue;
        }

        let contracted = if f_reflected < values[dim] {
            along(-rho)
        } else {
            along(rho)
        };
        let f_contracted = eval(&contracted);
        if f_contracted < values[dim].min(f_reflected) {
            simplex[dim] = contracted;
            values[dim] = f_contracted;
            continue;
        }

        // shrink towards the best vertex
        let best = simplex[0].clone();
        for i in 1..=dim {
            simplex[i] = best
                .iter()
                .zip(&simplex[i])
                .map(|(b, p)| b + sigma * (p - b))
                .collect();
            values[i] = eval(&simplex[i]);
        }
    }

    let best = (0..=dim)
        .min_by(|&a, &b| values[a].total_cmp(&values[b]))
        .unwrap_or(0);
    Minimum {
        x: simplex[best].clone(),
        value: values[best],
        iterations,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadratic_bowl() {
        let f = |x: &[f64]| (x[0] - 3.0).powi(2) + 2.0 * (x[1] + 1.0).powi(2);
        let min = nelder_mead(f, &[0.0, 0.0], 0.5, 5000, 1e-12);
        assert!(min.converged);
        assert!((min.x[0] - 3.0).abs() < 1e-4);
        assert!((min.x[1] + 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_rosenbrock() {
        let f = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        let min = nelder_mead(f, &[-1.2, 1.0], 0.1, 10_000, 1e-16);
        assert!((min.x[0] - 1.0).abs() < 1e-3);
        assert!((min.x[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_dimensional() {
        let min = nelder_mead(|_| 4.0, &[], 0.1, 10, 1e-8);
        assert_eq!(min.value, 4.0);
        assert!(min.x.is_empty());
    }
}
