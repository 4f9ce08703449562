use serde::{Serialize, Deserialize};

use crate::{math::matrix::Matrix, activation::activation::ActivationFunction};

/// Fully connected layer: `a = σ(x·W + b)`.
///
/// `weights` is `input_size × size`, `biases` is `1 × size`. The activation
/// caches (`neurons`, `pre_neurons`) are only meaningful between a training
/// forward pass and its backward pass and are never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub size: usize,
    pub weights: Matrix,
    pub biases: Matrix,
    pub activator: ActivationFunction,
    #[serde(skip)]
    pub neurons: Matrix,
    #[serde(skip)]
    pre_neurons: Matrix,
}

impl Layer {
    /// New layer with He init before ReLU-family activations and Xavier
    /// otherwise; biases start at zero.
    pub fn new(size: usize, input_size: usize, activation: ActivationFunction) -> Layer {
        let weights = match activation {
            ActivationFunction::ReLU | ActivationFunction::LeakyReLU { .. } => {
                Matrix::he(input_size, size)
            }
            _ => Matrix::xavier(input_size, size),
        };
        Layer::from_parts(weights, Matrix::zeros(1, size), activation)
    }

    /// Assembles a layer from existing parameters.
    ///
    /// # Panics
    /// Panics if `biases` is not `1 × weights.cols`.
    pub fn from_parts(weights: Matrix, biases: Matrix, activation: ActivationFunction) -> Layer {
        assert_eq!(biases.rows, 1, "biases must be a row vector");
        assert_eq!(biases.cols, weights.cols, "bias count must match layer size");
        Layer {
            size: weights.cols,
            weights,
            biases,
            activator: activation,
            neurons: Matrix::default(),
            pre_neurons: Matrix::default(),
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.rows
    }

    /// Training forward pass; caches `z` and `a` for `compute_gradients`.
    pub fn feed_from(&mut self, input: &Matrix) -> Matrix {
        let z = &(input * &self.weights) + &self.biases;
        let a = z.map(|x| self.activator.function(x));
        self.pre_neurons = z;
        self.neurons = a.clone();
        a
    }

    /// Inference forward pass; leaves the layer untouched so a shared model
    /// can serve concurrent requests.
    pub fn apply(&self, input: &Matrix) -> Matrix {
        let z = &(input * &self.weights) + &self.biases;
        z.map(|x| self.activator.function(x))
    }

    /// Computes gradient adjustments. Returns `(weights_grad, biases_grad)`.
    /// `next_layer_delta` is ∂L/∂a for this layer (error in activation space).
    pub fn compute_gradients(&self, next_layer_delta: &Matrix, inputs: &Matrix) -> (Matrix, Matrix) {
        // σ'(z), not σ'(a)
        let act_derivative = self.pre_neurons.map(|x| self.activator.derivative(x));
        let layer_delta = next_layer_delta.hadamard(&act_derivative);

        let weights_adjustment = &inputs.transpose() * &layer_delta;
        (weights_adjustment, layer_delta)
    }

    /// Applies pre-computed gradients scaled by `lr`.
    pub fn apply_gradients(&mut self, weights_grad: &Matrix, biases_grad: &Matrix, lr: f64) {
        self.weights.sub_scaled(weights_grad, lr);
        self.biases.sub_scaled(biases_grad, lr);
    }
}
