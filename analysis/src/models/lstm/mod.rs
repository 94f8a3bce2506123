//! Stacked LSTM regressor for one-step-ahead forecasting

pub mod layer;
pub mod optimizer;
pub mod preprocessing;

pub use layer::{Dense, LstmLayer};
pub use optimizer::Adam;
pub use preprocessing::{make_windows, MinMaxScaler};

use crate::artifacts::save_model;
use crate::config::LstmConfig;
use crate::error::{AnalysisError, Result};
use layer::{dropout_mask, DenseGrads, LstmGrads, StepCache};
use ndarray::{Array1, Array2, Array3, Axis, Ix1, Ix2};
use optimizer::Moments;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Per-epoch losses recorded by [`LstmModel::fit`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub loss: Vec<f64>,
    pub val_loss: Vec<f64>,
    /// Epoch (from 1) with the best monitored loss
    pub best_epoch: Option<usize>,
    pub best_loss: Option<f64>,
}

/// LSTM layers, dropout between them, and a one-unit dense head
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmModel {
    pub config: LstmConfig,
    pub input_size: usize,
    layers: Vec<LstmLayer>,
    dense: Dense,
    /// Scaler the training data was prepared with, kept for inverse transforms
    pub scaler: Option<MinMaxScaler>,
    pub history: TrainingHistory,
}

struct ForwardPass {
    caches: Vec<Vec<StepCache>>,
    /// Dropout mask applied to each layer's output at each step
    masks: Vec<Vec<Option<Array2<f64>>>>,
    last_hidden: Array2<f64>,
    output: Array1<f64>,
}

struct Gradients {
    layers: Vec<LstmGrads>,
    dense: DenseGrads,
}

struct OptimizerState {
    adam: Adam,
    layers: Vec<(Moments<Ix2>, Moments<Ix2>, Moments<Ix1>)>,
    dense: (Moments<Ix2>, Moments<Ix1>),
}

impl LstmModel {
    /// Univariate model
    pub fn new(config: LstmConfig) -> Result<Self> {
        Self::with_input_size(config, 1)
    }

    pub fn with_input_size(config: LstmConfig, input_size: usize) -> Result<Self> {
        if config.hidden_sizes.is_empty() || config.hidden_sizes.contains(&0) {
            return Err(AnalysisError::invalid("LSTM needs at least one non-empty layer"));
        }
        if !(0.0..1.0).contains(&config.dropout) {
            return Err(AnalysisError::invalid(format!(
                "dropout must be in [0, 1), got {}",
                config.dropout
            )));
        }
        if !(config.learning_rate > 0.0) || config.batch_size == 0 || input_size == 0 {
            return Err(AnalysisError::invalid(
                "learning rate, batch size and input size must be positive",
            ));
        }
        if !(0.0..1.0).contains(&config.validation_split) {
            return Err(AnalysisError::invalid("validation_split must be in [0, 1)"));
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut layers = Vec::with_capacity(config.hidden_sizes.len());
        let mut fan_in = input_size;
        for &units in &config.hidden_sizes {
            layers.push(LstmLayer::new(fan_in, units, &mut rng));
            fan_in = units;
        }
        let dense = Dense::new(fan_in, 1, &mut rng);

        Ok(Self {
            config,
            input_size,
            layers,
            dense,
            scaler: None,
            history: TrainingHistory::default(),
        })
    }

    pub fn with_scaler(mut self, scaler: MinMaxScaler) -> Self {
        self.scaler = Some(scaler);
        self
    }

    /// Train on windows `x` of shape `(samples, lookback, input_size)`.
    ///
    /// The last `validation_split` share of samples is held out. Whenever the
    /// monitored loss (validation loss, else training loss) improves, the model
    /// is written to `checkpoint`.
    pub fn fit(&mut self, x: &Array3<f64>, y: &Array1<f64>, checkpoint: Option<&Path>) -> Result<&TrainingHistory> {
        let (samples, lookback, features) = x.dim();
        if samples != y.len() {
            return Err(AnalysisError::invalid(format!(
                "{} input windows but {} targets",
                samples,
                y.len()
            )));
        }
        if samples == 0 || lookback == 0 {
            return Err(AnalysisError::insufficient("no training windows"));
        }
        if features != self.input_size {
            return Err(AnalysisError::invalid(format!(
                "model expects {} features per step, got {}",
                self.input_size, features
            )));
        }

        let split_at = ((samples as f64) * (1.0 - self.config.validation_split)) as usize;
        if split_at == 0 || (self.config.validation_split > 0.0 && split_at == samples) {
            return Err(AnalysisError::insufficient(format!(
                "{} samples cannot be split with validation_split {}",
                samples, self.config.validation_split
            )));
        }
        let mut train: Vec<usize> = (0..split_at).collect();
        let val: Vec<usize> = (split_at..samples).collect();

        let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(1));
        let mut opt = OptimizerState {
            adam: Adam::new(self.config.learning_rate),
            layers: self
                .layers
                .iter()
                .map(|l| (Moments::like(&l.kernel), Moments::like(&l.recurrent), Moments::like(&l.bias)))
                .collect(),
            dense: (Moments::like(&self.dense.weights), Moments::like(&self.dense.bias)),
        };
        self.history = TrainingHistory::default();

        info!(
            "Training LSTM {:?} on {} windows ({} validation), {} epochs, batch size {}",
            self.config.hidden_sizes,
            split_at,
            val.len(),
            self.config.epochs,
            self.config.batch_size
        );

        for epoch in 1..=self.config.epochs {
            train.shuffle(&mut rng);
            let mut total = 0.0;
            for batch in train.chunks(self.config.batch_size) {
                let steps = batch_steps(x, batch);
                let targets = Array1::from_iter(batch.iter().map(|&i| y[i]));
                let (loss, grads) = self.loss_and_grads(&steps, &targets, Some(&mut rng));
                if !loss.is_finite() {
                    return Err(AnalysisError::numerical(format!(
                        "training loss diverged in epoch {}",
                        epoch
                    )));
                }
                self.apply(&grads, &mut opt);
                total += loss * batch.len() as f64;
            }
            let loss = total / split_at as f64;
            self.history.loss.push(loss);

            let monitored = if val.is_empty() {
                loss
            } else {
                let val_loss = self.mse(x, y, &val);
                self.history.val_loss.push(val_loss);
                info!(
                    "Epoch {}/{} - loss: {:.6} - val_loss: {:.6}",
                    epoch, self.config.epochs, loss, val_loss
                );
                val_loss
            };
            if val.is_empty() {
                info!("Epoch {}/{} - loss: {:.6}", epoch, self.config.epochs, loss);
            }

            let improved = self.history.best_loss.map_or(true, |best| monitored < best);
            if improved {
                self.history.best_loss = Some(monitored);
                self.history.best_epoch = Some(epoch);
                if let Some(path) = checkpoint {
                    info!(
                        "Epoch {}: monitored loss improved to {:.6}, saving model to {}",
                        epoch,
                        monitored,
                        path.display()
                    );
                    save_model(&*self, "lstm", path)?;
                }
            }
        }

        Ok(&self.history)
    }

    /// One prediction per window
    pub fn predict(&self, x: &Array3<f64>) -> Result<Array1<f64>> {
        let (samples, lookback, features) = x.dim();
        if features != self.input_size || lookback == 0 {
            return Err(AnalysisError::invalid(format!(
                "expected windows with {} features per step, got shape {:?}",
                self.input_size,
                x.dim()
            )));
        }
        let index: Vec<usize> = (0..samples).collect();
        let mut out = Vec::with_capacity(samples);
        for batch in index.chunks(self.config.batch_size.max(1)) {
            let pass = self.forward_pass(batch_steps(x, batch), None);
            out.extend(pass.output.iter().copied());
        }
        Ok(Array1::from_vec(out))
    }

    fn mse(&self, x: &Array3<f64>, y: &Array1<f64>, index: &[usize]) -> f64 {
        let mut total = 0.0;
        for batch in index.chunks(self.config.batch_size.max(1)) {
            let pass = self.forward_pass(batch_steps(x, batch), None);
            total += batch
                .iter()
                .zip(pass.output.iter())
                .map(|(&i, p)| (p - y[i]).powi(2))
                .sum::<f64>();
        }
        total / index.len() as f64
    }

    /// Dropout is active only when `rng` is given
    fn forward_pass(&self, steps: Vec<Array2<f64>>, mut rng: Option<&mut StdRng>) -> ForwardPass {
        let n_steps = steps.len();
        let mut inputs = steps;
        let mut caches = Vec::with_capacity(self.layers.len());
        let mut masks = Vec::with_capacity(self.layers.len());

        for (l, layer) in self.layers.iter().enumerate() {
            let (mut outputs, cache) = layer.forward(&inputs);
            let mut layer_masks: Vec<Option<Array2<f64>>> = vec![None; n_steps];
            if let Some(rng) = rng.as_deref_mut() {
                if self.config.dropout > 0.0 {
                    // the last layer only passes its final state on
                    let first = if l + 1 == self.layers.len() { n_steps - 1 } else { 0 };
                    for t in first..n_steps {
                        let mask = dropout_mask(outputs[t].dim(), self.config.dropout, rng);
                        outputs[t] *= &mask;
                        layer_masks[t] = Some(mask);
                    }
                }
            }
            caches.push(cache);
            masks.push(layer_masks);
            inputs = outputs;
        }

        let last_hidden = inputs[n_steps - 1].clone();
        let output = self.dense.forward(&last_hidden).column(0).to_owned();
        ForwardPass {
            caches,
            masks,
            last_hidden,
            output,
        }
    }

    fn loss_and_grads(&self, steps: &[Array2<f64>], y: &Array1<f64>, rng: Option<&mut StdRng>) -> (f64, Gradients) {
        let n_steps = steps.len();
        let pass = self.forward_pass(steps.to_vec(), rng);
        let batch = y.len() as f64;
        let diff = &pass.output - y;
        let loss = diff.mapv(|d| d * d).sum() / batch;

        let d_out = diff.mapv(|d| 2.0 * d / batch).insert_axis(Axis(1));
        let (d_hidden, dense) = self.dense.backward(&pass.last_hidden, &d_out);

        let top = self.layers.len() - 1;
        let mut d_outputs: Vec<Array2<f64>> = vec![Array2::zeros(d_hidden.raw_dim()); n_steps];
        d_outputs[n_steps - 1] = d_hidden;

        let mut layer_grads = Vec::with_capacity(self.layers.len());
        for l in (0..=top).rev() {
            for (d, mask) in d_outputs.iter_mut().zip(&pass.masks[l]) {
                if let Some(mask) = mask {
                    *d *= mask;
                }
            }
            let (d_inputs, grads) = self.layers[l].backward(&pass.caches[l], &d_outputs);
            layer_grads.push(grads);
            d_outputs = d_inputs;
        }
        layer_grads.reverse();

        (
            loss,
            Gradients {
                layers: layer_grads,
                dense,
            },
        )
    }

    fn apply(&mut self, grads: &Gradients, opt: &mut OptimizerState) {
        opt.adam.next_step();
        for ((layer, g), (mk, mr, mb)) in self.layers.iter_mut().zip(&grads.layers).zip(opt.layers.iter_mut()) {
            opt.adam.update(&mut layer.kernel, &g.kernel, mk);
            opt.adam.update(&mut layer.recurrent, &g.recurrent, mr);
            opt.adam.update(&mut layer.bias, &g.bias, mb);
        }
        opt.adam.update(&mut self.dense.weights, &grads.dense.weights, &mut opt.dense.0);
        opt.adam.update(&mut self.dense.bias, &grads.dense.bias, &mut opt.dense.1);
    }
}

/// Slice the selected windows into one `(batch, features)` matrix per step
fn batch_steps(x: &Array3<f64>, index: &[usize]) -> Vec<Array2<f64>> {
    let (_, lookback, features) = x.dim();
    (0..lookback)
        .map(|t| Array2::from_shape_fn((index.len(), features), |(b, k)| x[[index[b], t, k]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::load_model;

    fn sine_windows(lookback: usize) -> (Array3<f64>, Array1<f64>) {
        let series: Vec<f64> = (0..240).map(|i| 0.5 + 0.4 * (i as f64 * 0.2).sin()).collect();
        make_windows(&series, lookback).unwrap()
    }

    fn small_config() -> LstmConfig {
        LstmConfig {
            hidden_sizes: vec![16],
            dropout: 0.0,
            learning_rate: 0.01,
            epochs: 10,
            batch_size: 16,
            lookback: 12,
            validation_split: 0.0,
            seed: 3,
        }
    }

    #[test]
    fn test_training_loss_decreases() {
        let (x, y) = sine_windows(12);
        let mut model = LstmModel::new(small_config()).unwrap();
        let history = model.fit(&x, &y, None).unwrap().clone();
        assert_eq!(history.loss.len(), 10);
        assert!(history.loss[9] < history.loss[0]);
        assert!(history.val_loss.is_empty());
        assert_eq!(model.predict(&x).unwrap().len(), y.len());
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        let config = LstmConfig {
            hidden_sizes: vec![3, 2],
            ..small_config()
        };
        let model = LstmModel::new(config).unwrap();
        let (x, y) = sine_windows(5);
        let index: Vec<usize> = (0..4).collect();
        let steps = batch_steps(&x, &index);
        let targets = Array1::from_iter(index.iter().map(|&i| y[i]));
        let (_, grads) = model.loss_and_grads(&steps, &targets, None);

        let loss_of = |m: &LstmModel| m.loss_and_grads(&steps, &targets, None).0;
        let eps = 1e-6;
        let check = |analytic: f64, perturb: &dyn Fn(&mut LstmModel, f64)| {
            let mut plus = model.clone();
            perturb(&mut plus, eps);
            let mut minus = model.clone();
            perturb(&mut minus, -eps);
            let numeric = (loss_of(&plus) - loss_of(&minus)) / (2.0 * eps);
            assert!(
                (numeric - analytic).abs() < 1e-6 + 1e-4 * analytic.abs(),
                "numeric {} vs analytic {}",
                numeric,
                analytic
            );
        };

        check(grads.layers[0].kernel[[0, 1]], &|m, e| m.layers[0].kernel[[0, 1]] += e);
        check(grads.layers[0].recurrent[[2, 7]], &|m, e| m.layers[0].recurrent[[2, 7]] += e);
        check(grads.layers[1].kernel[[1, 5]], &|m, e| m.layers[1].kernel[[1, 5]] += e);
        check(grads.layers[1].bias[3], &|m, e| m.layers[1].bias[3] += e);
        check(grads.dense.weights[[1, 0]], &|m, e| m.dense.weights[[1, 0]] += e);
    }

    #[test]
    fn test_checkpoint_on_validation_loss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lstm_model.json");
        let config = LstmConfig {
            hidden_sizes: vec![8, 8],
            dropout: 0.2,
            epochs: 3,
            validation_split: 0.2,
            ..small_config()
        };
        let (x, y) = sine_windows(12);
        let mut model = LstmModel::new(config).unwrap();
        let history = model.fit(&x, &y, Some(&path)).unwrap();
        assert_eq!(history.val_loss.len(), 3);
        assert!(history.best_epoch.is_some());

        let restored = load_model::<LstmModel>(&path).unwrap();
        assert_eq!(restored.kind, "lstm");
        assert_eq!(restored.model.layers.len(), 2);
    }

    #[test]
    fn test_rejects_bad_config() {
        let bad = LstmConfig {
            dropout: 1.0,
            ..small_config()
        };
        assert!(LstmModel::new(bad).is_err());
        let empty = LstmConfig {
            hidden_sizes: vec![],
            ..small_config()
        };
        assert!(LstmModel::new(empty).is_err());
    }
}
