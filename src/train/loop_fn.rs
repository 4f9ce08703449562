use std::time::Instant;

use rand::seq::SliceRandom;

use crate::loss::loss_type::LossType;
use crate::math::matrix::Matrix;
use crate::network::network::Network;
use crate::optim::sgd::Sgd;
use crate::train::epoch_stats::EpochStats;
use crate::train::train_config::TrainConfig;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Trains `network` for `config.epochs` epochs and returns the mean training
/// loss of the last completed epoch.
///
/// Labels are expected as `[0.0]` / `[1.0]` for a single sigmoid output;
/// accuracy counts a sample as correct when prediction and label fall on the
/// same side of the strict 0.5 threshold used at inference time.
///
/// The loop stops early when the `progress_tx` receiver has been dropped.
///
/// # Panics
/// Panics if `train_inputs` is empty, lengths mismatch, or `batch_size == 0`.
pub fn train_loop(
    network: &mut Network,
    train_inputs: &[Vec<f64>],
    train_labels: &[Vec<f64>],
    val_inputs: Option<&[Vec<f64>]>,
    val_labels: Option<&[Vec<f64>]>,
    optimizer: &Sgd,
    config: &TrainConfig,
) -> f64 {
    assert!(!train_inputs.is_empty(), "train_inputs must not be empty");
    assert_eq!(
        train_inputs.len(),
        train_labels.len(),
        "train_inputs and train_labels must have equal length"
    );
    assert!(config.batch_size > 0, "batch_size must be at least 1");

    let mut last_train_loss = 0.0;

    for epoch in 1..=config.epochs {
        let t_start = Instant::now();

        let train_loss = run_one_epoch(
            network,
            train_inputs,
            train_labels,
            optimizer,
            config.batch_size,
            config.loss_type,
        );
        last_train_loss = train_loss;

        let train_accuracy = compute_accuracy(network, train_inputs, train_labels);

        let (val_loss, val_accuracy) = match (val_inputs, val_labels) {
            (Some(vi), Some(vl)) if !vi.is_empty() => (
                Some(compute_eval_loss(network, vi, vl, config.loss_type)),
                Some(compute_accuracy(network, vi, vl)),
            ),
            _ => (None, None),
        };

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            train_loss,
            val_loss,
            train_accuracy,
            val_accuracy,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };

        if let Some(ref tx) = config.progress_tx {
            if tx.send(stats).is_err() {
                break;
            }
        }
    }

    last_train_loss
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// One full epoch of shuffled mini-batch SGD. Returns the mean sample loss.
fn run_one_epoch(
    network: &mut Network,
    inputs: &[Vec<f64>],
    labels: &[Vec<f64>],
    optimizer: &Sgd,
    batch_size: usize,
    loss_type: LossType,
) -> f64 {
    let n = inputs.len();
    let mut total_loss = 0.0;

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rand::thread_rng());

    for batch in indices.chunks(batch_size) {
        let mut acc_grads: Vec<(Matrix, Matrix)> = network.layers.iter()
            .map(|layer| (
                Matrix::zeros(layer.weights.rows, layer.weights.cols),
                Matrix::zeros(layer.biases.rows, layer.biases.cols),
            ))
            .collect();

        for &idx in batch {
            let input    = &inputs[idx];
            let expected = &labels[idx];

            let output = network.forward(input);
            total_loss += loss_type.loss(&output, expected);

            let mut delta = Matrix::row_vector(loss_type.derivative(&output, expected));

            for i in (0..network.layers.len()).rev() {
                let input_for_layer = if i == 0 {
                    Matrix::row_vector(input.clone())
                } else {
                    network.layers[i - 1].neurons.clone()
                };

                let (w_grad, b_grad) = network.layers[i].compute_gradients(&delta, &input_for_layer);

                if i > 0 {
                    delta = &b_grad * &network.layers[i].weights.transpose();
                }

                acc_grads[i].0.add_assign(&w_grad);
                acc_grads[i].1.add_assign(&b_grad);
            }
        }

        let inv_batch = 1.0 / batch.len() as f64;
        for (i, (w_acc, b_acc)) in acc_grads.into_iter().enumerate() {
            let w_avg = w_acc.map(|x| x * inv_batch);
            let b_avg = b_acc.map(|x| x * inv_batch);
            optimizer.step(&mut network.layers[i], &w_avg, &b_avg);
        }
    }

    total_loss / n as f64
}

/// Mean loss over a dataset without touching the weights.
fn compute_eval_loss(
    network: &Network,
    inputs: &[Vec<f64>],
    labels: &[Vec<f64>],
    loss_type: LossType,
) -> f64 {
    let total: f64 = inputs.iter().zip(labels.iter())
        .map(|(input, label)| loss_type.loss(&network.predict(input), label))
        .sum();
    total / inputs.len() as f64
}

/// Fraction of samples whose first output lands on the label's side of 0.5.
fn compute_accuracy(network: &Network, inputs: &[Vec<f64>], labels: &[Vec<f64>]) -> f64 {
    if inputs.is_empty() {
        return 0.0;
    }
    let correct = inputs.iter().zip(labels.iter())
        .filter(|(input, label)| {
            let predicted = network.predict(input)[0] > 0.5;
            let actual = label[0] > 0.5;
            predicted == actual
        })
        .count();
    correct as f64 / inputs.len() as f64
}
