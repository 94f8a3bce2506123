//! Adam optimiser

use ndarray::{Array, Dimension, Zip};

/// Adam with Keras defaults (`beta1 = 0.9`, `beta2 = 0.999`, `epsilon = 1e-7`)
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    step: i32,
}

/// First and second moment estimates of one parameter tensor
#[derive(Debug, Clone)]
pub struct Moments<D: Dimension> {
    m: Array<f64, D>,
    v: Array<f64, D>,
}

impl<D: Dimension> Moments<D> {
    pub fn like(param: &Array<f64, D>) -> Self {
        Self {
            m: Array::zeros(param.raw_dim()),
            v: Array::zeros(param.raw_dim()),
        }
    }
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            step: 0,
        }
    }

    /// Advance the bias-correction step; call once per batch
    pub fn next_step(&mut self) {
        self.step += 1;
    }

    pub fn update<D: Dimension>(
        &self,
        param: &mut Array<f64, D>,
        grad: &Array<f64, D>,
        moments: &mut Moments<D>,
    ) {
        let t = self.step.max(1);
        let lr_t = self.learning_rate * (1.0 - self.beta2.powi(t)).sqrt() / (1.0 - self.beta1.powi(t));
        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);
        Zip::from(param)
            .and(grad)
            .and(&mut moments.m)
            .and(&mut moments.v)
            .for_each(|p, &g, m, v| {
                *m = b1 * *m + (1.0 - b1) * g;
                *v = b2 * *v + (1.0 - b2) * g * g;
                *p -= lr_t * *m / (v.sqrt() + eps);
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_minimises_quadratic() {
        let mut adam = Adam::new(0.1);
        let mut x = array![5.0, -3.0];
        let mut moments = Moments::like(&x);
        for _ in 0..500 {
            adam.next_step();
            let grad = x.mapv(|v| 2.0 * v);
            adam.update(&mut x, &grad, &mut moments);
        }
        assert!(x.iter().all(|v| v.abs() < 1e-2));
    }
}
