//! Fully connected neural network classifier (ReLU hidden layers, softmax output)

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::DomainError;

const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;
const EPSILON: f32 = 1e-7;
const MIN_IMPROVEMENT: f32 = 1e-4;

/// Hyperparameters for the neural-network classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralParams {
    pub hidden_layers: Vec<usize>,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    /// Epochs without training-loss improvement before stopping early
    pub patience: usize,
}

impl Default for NeuralParams {
    fn default() -> Self {
        Self {
            hidden_layers: vec![128, 64],
            epochs: 100,
            batch_size: 16,
            learning_rate: 0.001,
            patience: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DenseLayer {
    inputs: usize,
    outputs: usize,
    /// Row-major `outputs x inputs`
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl DenseLayer {
    fn new<R: Rng>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let limit = (6.0 / inputs as f32).sqrt();
        let weights = (0..inputs * outputs)
            .map(|_| rng.gen_range(-limit..limit))
            .collect();

        Self {
            inputs,
            outputs,
            weights,
            biases: vec![0.0; outputs],
        }
    }

    fn forward(&self, input: &[f32], output: &mut [f32]) {
        for (o, out) in output.iter_mut().enumerate() {
            let row = &self.weights[o * self.inputs..(o + 1) * self.inputs];
            *out = self.biases[o] + row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>();
        }
    }
}

#[derive(Debug, Clone)]
struct LayerGradients {
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl LayerGradients {
    fn zeros_like(layers: &[DenseLayer]) -> Vec<Self> {
        layers
            .iter()
            .map(|l| Self {
                weights: vec![0.0; l.weights.len()],
                biases: vec![0.0; l.biases.len()],
            })
            .collect()
    }

    fn reset(&mut self) {
        self.weights.iter_mut().for_each(|g| *g = 0.0);
        self.biases.iter_mut().for_each(|g| *g = 0.0);
    }
}

/// Adam optimizer state, one moment pair per layer
struct Adam {
    learning_rate: f32,
    step: i32,
    first: Vec<LayerGradients>,
    second: Vec<LayerGradients>,
}

impl Adam {
    fn new(layers: &[DenseLayer], learning_rate: f32) -> Self {
        Self {
            learning_rate,
            step: 0,
            first: LayerGradients::zeros_like(layers),
            second: LayerGradients::zeros_like(layers),
        }
    }

    fn apply(&mut self, layers: &mut [DenseLayer], grads: &[LayerGradients], scale: f32) {
        self.step += 1;
        let correction1 = 1.0 - BETA1.powi(self.step);
        let correction2 = 1.0 - BETA2.powi(self.step);
        let lr = self.learning_rate;

        let update = |param: &mut f32, grad: f32, m: &mut f32, v: &mut f32| {
            *m = BETA1 * *m + (1.0 - BETA1) * grad;
            *v = BETA2 * *v + (1.0 - BETA2) * grad * grad;
            let m_hat = *m / correction1;
            let v_hat = *v / correction2;
            *param -= lr * m_hat / (v_hat.sqrt() + EPSILON);
        };

        for (l, layer) in layers.iter_mut().enumerate() {
            let (m, v, g) = (&mut self.first[l], &mut self.second[l], &grads[l]);

            for i in 0..layer.weights.len() {
                update(
                    &mut layer.weights[i],
                    g.weights[i] * scale,
                    &mut m.weights[i],
                    &mut v.weights[i],
                );
            }

            for i in 0..layer.biases.len() {
                update(
                    &mut layer.biases[i],
                    g.biases[i] * scale,
                    &mut m.biases[i],
                    &mut v.biases[i],
                );
            }
        }
    }
}

/// Trained neural network.
///
/// Prediction writes into internal activation buffers, so it needs `&mut self`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralNetwork {
    input_len: usize,
    layers: Vec<DenseLayer>,
    #[serde(skip)]
    activations: Vec<Vec<f32>>,
}

impl NeuralNetwork {
    /// Fit a network whose output width is `n_classes`
    pub fn fit<R: Rng>(
        samples: &[&[f32]],
        labels: &[usize],
        n_classes: usize,
        params: &NeuralParams,
        rng: &mut R,
    ) -> Result<Self, DomainError> {
        if samples.is_empty() {
            return Err(DomainError::training("Cannot fit network on an empty dataset"));
        }

        if samples.len() != labels.len() {
            return Err(DomainError::training(format!(
                "Sample/label count mismatch: {} vs {}",
                samples.len(),
                labels.len()
            )));
        }

        if n_classes == 0 || labels.iter().any(|&l| l >= n_classes) {
            return Err(DomainError::training(format!(
                "Labels must fall inside {} classes",
                n_classes
            )));
        }

        let input_len = samples[0].len();

        if input_len == 0 || samples.iter().any(|s| s.len() != input_len) {
            return Err(DomainError::training("Samples must share a non-zero feature length"));
        }

        let mut widths = vec![input_len];
        widths.extend(params.hidden_layers.iter().copied().filter(|&w| w > 0));
        widths.push(n_classes);

        let layers = widths
            .windows(2)
            .map(|pair| DenseLayer::new(pair[0], pair[1], rng))
            .collect();

        let mut network = Self {
            input_len,
            layers,
            activations: Vec::new(),
        };
        network.ensure_buffers();

        let mut optimizer = Adam::new(&network.layers, params.learning_rate);
        let mut grads = LayerGradients::zeros_like(&network.layers);
        let mut order: Vec<usize> = (0..samples.len()).collect();
        let mut best_loss = f32::INFINITY;
        let mut best_layers = network.layers.clone();
        let mut stale_epochs = 0;

        for epoch in 0..params.epochs.max(1) {
            order.shuffle(rng);
            let mut epoch_loss = 0.0;

            for batch in order.chunks(params.batch_size.max(1)) {
                grads.iter_mut().for_each(LayerGradients::reset);

                for &i in batch {
                    epoch_loss += network.backpropagate(samples[i], labels[i], &mut grads);
                }

                optimizer.apply(&mut network.layers, &grads, 1.0 / batch.len() as f32);
            }

            epoch_loss /= samples.len() as f32;

            if !epoch_loss.is_finite() {
                return Err(DomainError::training(format!(
                    "Training loss diverged at epoch {}",
                    epoch
                )));
            }

            if epoch_loss < best_loss - MIN_IMPROVEMENT {
                best_loss = epoch_loss;
                best_layers = network.layers.clone();
                stale_epochs = 0;
            } else {
                stale_epochs += 1;

                if stale_epochs >= params.patience.max(1) {
                    debug!(epoch, loss = best_loss, "Early stopping neural network training");
                    break;
                }
            }
        }

        network.layers = best_layers;
        Ok(network)
    }

    pub fn n_classes(&self) -> usize {
        self.layers.last().map(|l| l.outputs).unwrap_or(0)
    }

    pub fn input_len(&self) -> usize {
        self.input_len
    }

    /// Structural check for a network read back from disk
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.layers.is_empty() || self.input_len == 0 {
            return Err(DomainError::artifact("Network has no layers or no inputs"));
        }

        let mut expected_inputs = self.input_len;
        for (position, layer) in self.layers.iter().enumerate() {
            let shape_ok = layer.inputs == expected_inputs
                && layer.outputs > 0
                && layer.weights.len() == layer.inputs * layer.outputs
                && layer.biases.len() == layer.outputs;

            if !shape_ok {
                return Err(DomainError::artifact(format!(
                    "Layer {} shape does not chain: {} inputs, {} outputs",
                    position, layer.inputs, layer.outputs
                )));
            }
            expected_inputs = layer.outputs;
        }

        Ok(())
    }

    /// Softmax class distribution for one sample
    pub fn predict_proba(&mut self, features: &[f32]) -> Result<Vec<f32>, DomainError> {
        if features.len() != self.input_len {
            return Err(DomainError::inference(format!(
                "Expected {} features, got {}",
                self.input_len,
                features.len()
            )));
        }

        self.validate()
            .map_err(|e| DomainError::inference(e.to_string()))?;
        self.ensure_buffers();
        self.forward(features);

        Ok(self.activations.last().cloned().unwrap_or_default())
    }

    fn ensure_buffers(&mut self) {
        if self.activations.len() == self.layers.len() + 1 {
            return;
        }

        let mut buffers = vec![vec![0.0; self.input_len]];
        buffers.extend(self.layers.iter().map(|l| vec![0.0; l.outputs]));
        self.activations = buffers;
    }

    fn forward(&mut self, features: &[f32]) {
        let last = self.layers.len() - 1;
        self.activations[0].copy_from_slice(features);

        for (l, layer) in self.layers.iter().enumerate() {
            let (before, after) = self.activations.split_at_mut(l + 1);
            let output = &mut after[0];
            layer.forward(&before[l], output);

            if l == last {
                softmax(output);
            } else {
                output.iter_mut().for_each(|v| *v = v.max(0.0));
            }
        }
    }

    /// Accumulate gradients for one sample; returns its cross-entropy loss
    fn backpropagate(&mut self, features: &[f32], label: usize, grads: &mut [LayerGradients]) -> f32 {
        self.forward(features);

        let output = &self.activations[self.layers.len()];
        let loss = -output[label].max(1e-7).ln();

        let mut delta = output.clone();
        delta[label] -= 1.0;

        for l in (0..self.layers.len()).rev() {
            let layer = &self.layers[l];
            let input = &self.activations[l];
            let grad = &mut grads[l];

            for (o, d) in delta.iter().enumerate() {
                grad.biases[o] += d;
                let row = &mut grad.weights[o * layer.inputs..(o + 1) * layer.inputs];
                row.iter_mut().zip(input).for_each(|(g, x)| *g += d * x);
            }

            if l == 0 {
                break;
            }

            let mut previous = vec![0.0; layer.inputs];
            for (o, d) in delta.iter().enumerate() {
                let row = &layer.weights[o * layer.inputs..(o + 1) * layer.inputs];
                previous.iter_mut().zip(row).for_each(|(p, w)| *p += w * d);
            }

            // ReLU derivative from the stored activation
            previous
                .iter_mut()
                .zip(input)
                .for_each(|(p, a)| if *a <= 0.0 { *p = 0.0 });

            delta = previous;
        }

        loss
    }
}

fn softmax(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;

    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }

    values.iter_mut().for_each(|v| *v /= sum);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn quick_params() -> NeuralParams {
        NeuralParams {
            hidden_layers: vec![16],
            epochs: 200,
            batch_size: 4,
            learning_rate: 0.01,
            patience: 20,
        }
    }

    fn three_clusters() -> (Vec<Vec<f32>>, Vec<usize>) {
        let centers = [[0.1f32, 0.1], [0.9, 0.1], [0.5, 0.9]];
        let mut samples = Vec::new();
        let mut labels = Vec::new();

        for (label, center) in centers.iter().enumerate() {
            for i in 0..8 {
                let jitter = (i as f32 - 4.0) * 0.01;
                samples.push(vec![center[0] + jitter, center[1] - jitter]);
                labels.push(label);
            }
        }

        (samples, labels)
    }

    #[test]
    fn test_output_width_matches_class_count() {
        let (samples, labels) = three_clusters();
        let refs: Vec<&[f32]> = samples.iter().map(Vec::as_slice).collect();
        let mut rng = StdRng::seed_from_u64(5);

        let mut network = NeuralNetwork::fit(&refs, &labels, 3, &quick_params(), &mut rng).unwrap();

        assert_eq!(network.n_classes(), 3);
        let proba = network.predict_proba(&[0.5, 0.5]).unwrap();
        assert_eq!(proba.len(), 3);
        assert!((proba.iter().sum::<f32>() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_learns_separable_clusters() {
        let (samples, labels) = three_clusters();
        let refs: Vec<&[f32]> = samples.iter().map(Vec::as_slice).collect();
        let mut rng = StdRng::seed_from_u64(9);

        let mut network = NeuralNetwork::fit(&refs, &labels, 3, &quick_params(), &mut rng).unwrap();

        let mut correct = 0;
        for (sample, &label) in samples.iter().zip(&labels) {
            let proba = network.predict_proba(sample).unwrap();
            let predicted = proba
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .unwrap();
            if predicted == label {
                correct += 1;
            }
        }

        assert!(correct >= 20, "only {} of 24 correct", correct);
    }

    #[test]
    fn test_deserialized_network_rebuilds_buffers() {
        let (samples, labels) = three_clusters();
        let refs: Vec<&[f32]> = samples.iter().map(Vec::as_slice).collect();
        let mut rng = StdRng::seed_from_u64(2);
        let mut network = NeuralNetwork::fit(&refs, &labels, 3, &quick_params(), &mut rng).unwrap();

        let json = serde_json::to_string(&network).unwrap();
        let mut restored: NeuralNetwork = serde_json::from_str(&json).unwrap();

        let before = network.predict_proba(&[0.2, 0.2]).unwrap();
        let after = restored.predict_proba(&[0.2, 0.2]).unwrap();
        for (a, b) in before.iter().zip(&after) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_rejects_wrong_input_length() {
        let (samples, labels) = three_clusters();
        let refs: Vec<&[f32]> = samples.iter().map(Vec::as_slice).collect();
        let mut rng = StdRng::seed_from_u64(2);
        let mut network = NeuralNetwork::fit(&refs, &labels, 3, &quick_params(), &mut rng).unwrap();

        assert!(network.predict_proba(&[0.1, 0.2, 0.3]).is_err());
    }

    #[test]
    fn test_softmax_is_stable_for_large_inputs() {
        let mut values = [1000.0, 1001.0, 999.0];
        softmax(&mut values);
        assert!(values.iter().all(|v| v.is_finite()));
        assert!(values[1] > values[0]);
    }

    #[test]
    fn test_mismatched_layer_shapes_are_rejected() {
        let mut network: NeuralNetwork = serde_json::from_value(serde_json::json!({
            "input_len": 2,
            "layers": [
                {"inputs": 2, "outputs": 3, "weights": [0.1, 0.2], "biases": [0.0, 0.0, 0.0]}
            ]
        }))
        .unwrap();

        assert!(matches!(network.validate(), Err(DomainError::Artifact { .. })));
        assert!(matches!(
            network.predict_proba(&[0.5, 0.5]),
            Err(DomainError::Inference { .. })
        ));
    }

    #[test]
    fn test_fitted_network_validates() {
        let (samples, labels) = three_clusters();
        let refs: Vec<&[f32]> = samples.iter().map(Vec::as_slice).collect();
        let mut rng = StdRng::seed_from_u64(9);

        let network = NeuralNetwork::fit(&refs, &labels, 3, &quick_params(), &mut rng).unwrap();
        assert!(network.validate().is_ok());
    }
}
