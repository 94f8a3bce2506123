//! LSTM and dense layers with batched forward and backward passes

use ndarray::{s, Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One LSTM layer. Gates are packed along the last axis in the order
/// input, forget, candidate, output (Keras layout).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmLayer {
    pub input_size: usize,
    pub hidden_size: usize,
    /// `(input_size, 4 * hidden_size)`
    pub kernel: Array2<f64>,
    /// `(hidden_size, 4 * hidden_size)`
    pub recurrent: Array2<f64>,
    /// `4 * hidden_size`
    pub bias: Array1<f64>,
}

#[derive(Debug, Clone)]
pub struct LstmGrads {
    pub kernel: Array2<f64>,
    pub recurrent: Array2<f64>,
    pub bias: Array1<f64>,
}

/// Activations of one time step, kept for back-propagation
#[derive(Debug, Clone)]
pub struct StepCache {
    x: Array2<f64>,
    h_prev: Array2<f64>,
    c_prev: Array2<f64>,
    i: Array2<f64>,
    f: Array2<f64>,
    g: Array2<f64>,
    o: Array2<f64>,
    tanh_c: Array2<f64>,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl LstmLayer {
    pub fn new(input_size: usize, hidden_size: usize, rng: &mut StdRng) -> Self {
        let limit = (1.0 / hidden_size as f64).sqrt();
        let mut uniform = |shape: (usize, usize)| {
            Array2::from_shape_fn(shape, |_| rng.gen_range(-limit..limit))
        };
        let kernel = uniform((input_size, 4 * hidden_size));
        let recurrent = uniform((hidden_size, 4 * hidden_size));
        // forget gate bias starts at one
        let bias = Array1::from_shape_fn(4 * hidden_size, |j| {
            if (hidden_size..2 * hidden_size).contains(&j) {
                1.0
            } else {
                0.0
            }
        });
        Self {
            input_size,
            hidden_size,
            kernel,
            recurrent,
            bias,
        }
    }

    /// Run the layer over a sequence of `(batch, input_size)` steps from a
    /// zero state; returns the hidden state of every step
    pub fn forward(&self, inputs: &[Array2<f64>]) -> (Vec<Array2<f64>>, Vec<StepCache>) {
        let hs = self.hidden_size;
        let batch = inputs.first().map_or(0, |x| x.nrows());
        let mut h = Array2::<f64>::zeros((batch, hs));
        let mut c = Array2::<f64>::zeros((batch, hs));
        let mut outputs = Vec::with_capacity(inputs.len());
        let mut cache = Vec::with_capacity(inputs.len());

        for x in inputs {
            let z = x.dot(&self.kernel) + h.dot(&self.recurrent) + &self.bias;
            let i = z.slice(s![.., 0..hs]).mapv(sigmoid);
            let f = z.slice(s![.., hs..2 * hs]).mapv(sigmoid);
            let g = z.slice(s![.., 2 * hs..3 * hs]).mapv(f64::tanh);
            let o = z.slice(s![.., 3 * hs..4 * hs]).mapv(sigmoid);

            let c_new = &f * &c + &i * &g;
            let tanh_c = c_new.mapv(f64::tanh);
            let h_new = &o * &tanh_c;

            cache.push(StepCache {
                x: x.clone(),
                h_prev: h,
                c_prev: c,
                i,
                f,
                g,
                o,
                tanh_c,
            });
            outputs.push(h_new.clone());
            h = h_new;
            c = c_new;
        }
        (outputs, cache)
    }

    /// Back-propagation through time. `d_outputs[t]` is the loss gradient
    /// with respect to the hidden output of step `t`; returns the gradient
    /// with respect to each input step and the parameter gradients.
    pub fn backward(&self, cache: &[StepCache], d_outputs: &[Array2<f64>]) -> (Vec<Array2<f64>>, LstmGrads) {
        let hs = self.hidden_size;
        let mut grads = LstmGrads {
            kernel: Array2::zeros(self.kernel.raw_dim()),
            recurrent: Array2::zeros(self.recurrent.raw_dim()),
            bias: Array1::zeros(self.bias.raw_dim()),
        };
        let batch = cache.first().map_or(0, |step| step.x.nrows());
        let mut dh_next = Array2::<f64>::zeros((batch, hs));
        let mut dc_next = Array2::<f64>::zeros((batch, hs));
        let mut d_inputs = vec![Array2::zeros((batch, self.input_size)); cache.len()];

        for t in (0..cache.len()).rev() {
            let step = &cache[t];
            let dh = &d_outputs[t] + &dh_next;

            let d_o = &dh * &step.tanh_c;
            let dc = &dc_next + &(&dh * &step.o * &step.tanh_c.mapv(|v| 1.0 - v * v));
            let d_f = &dc * &step.c_prev;
            let d_i = &dc * &step.g;
            let d_g = &dc * &step.i;
            dc_next = &dc * &step.f;

            let mut dz = Array2::<f64>::zeros((batch, 4 * hs));
            dz.slice_mut(s![.., 0..hs])
                .assign(&(&d_i * &step.i.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![.., hs..2 * hs])
                .assign(&(&d_f * &step.f.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![.., 2 * hs..3 * hs])
                .assign(&(&d_g * &step.g.mapv(|v| 1.0 - v * v)));
            dz.slice_mut(s![.., 3 * hs..4 * hs])
                .assign(&(&d_o * &step.o.mapv(|v| v * (1.0 - v))));

            grads.kernel += &step.x.t().dot(&dz);
            grads.recurrent += &step.h_prev.t().dot(&dz);
            grads.bias += &dz.sum_axis(Axis(0));

            d_inputs[t] = dz.dot(&self.kernel.t());
            dh_next = dz.dot(&self.recurrent.t());
        }
        (d_inputs, grads)
    }
}

/// Fully connected output layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    /// `(inputs, outputs)`
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

#[derive(Debug, Clone)]
pub struct DenseGrads {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

impl Dense {
    pub fn new(inputs: usize, outputs: usize, rng: &mut StdRng) -> Self {
        let limit = (6.0 / (inputs + outputs) as f64).sqrt();
        Self {
            weights: Array2::from_shape_fn((inputs, outputs), |_| rng.gen_range(-limit..limit)),
            bias: Array1::zeros(outputs),
        }
    }

    pub fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.weights) + &self.bias
    }

    /// Returns the gradient with respect to the input and the parameter gradients
    pub fn backward(&self, x: &Array2<f64>, d_out: &Array2<f64>) -> (Array2<f64>, DenseGrads) {
        let grads = DenseGrads {
            weights: x.t().dot(d_out),
            bias: d_out.sum_axis(Axis(0)),
        };
        (d_out.dot(&self.weights.t()), grads)
    }
}

/// Inverted dropout mask: zero with probability `rate`, else `1 / (1 - rate)`
pub fn dropout_mask(shape: (usize, usize), rate: f64, rng: &mut StdRng) -> Array2<f64> {
    let keep = 1.0 / (1.0 - rate);
    Array2::from_shape_fn(shape, |_| if rng.gen::<f64>() < rate { 0.0 } else { keep })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_forward_shapes_and_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let layer = LstmLayer::new(2, 4, &mut rng);
        let inputs = vec![Array2::from_elem((3, 2), 0.5); 5];
        let (outputs, cache) = layer.forward(&inputs);
        assert_eq!(outputs.len(), 5);
        assert_eq!(cache.len(), 5);
        assert_eq!(outputs[4].dim(), (3, 4));
        assert!(outputs.iter().flatten().all(|h| h.abs() < 1.0));
    }

    #[test]
    fn test_dropout_mask_values() {
        let mut rng = StdRng::seed_from_u64(2);
        let mask = dropout_mask((50, 50), 0.2, &mut rng);
        assert!(mask.iter().all(|&m| m == 0.0 || (m - 1.25).abs() < 1e-12));
        let dropped = mask.iter().filter(|&&m| m == 0.0).count() as f64 / 2500.0;
        assert!((dropped - 0.2).abs() < 0.05);
    }
}
