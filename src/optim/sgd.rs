use crate::{math::matrix::Matrix, layers::dense::Layer};

/// Plain mini-batch SGD with optional L2 weight decay.
///
/// Decay applies to weights only; biases are never regularized.
#[derive(Debug, Clone, Copy)]
pub struct Sgd {
    pub learning_rate: f64,
    pub weight_decay: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate, weight_decay: 0.0 }
    }

    pub fn with_weight_decay(mut self, weight_decay: f64) -> Sgd {
        self.weight_decay = weight_decay;
        self
    }

    /// Applies one update to `layer` given its averaged gradients.
    pub fn step(&self, layer: &mut Layer, weights_grad: &Matrix, biases_grad: &Matrix) {
        if self.weight_decay > 0.0 {
            let decay = layer.weights.map(|w| w * self.weight_decay);
            layer.apply_gradients(&(weights_grad + &decay), biases_grad, self.learning_rate);
        } else {
            layer.apply_gradients(weights_grad, biases_grad, self.learning_rate);
        }
    }
}
