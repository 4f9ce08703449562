use serde::{Serialize, Deserialize};

/// Per-epoch training statistics emitted by `train_loop`.
///
/// When a `progress_tx` channel is configured in `TrainConfig`, the loop
/// sends one `EpochStats` at the end of every completed epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    pub total_epochs: usize,
    /// Mean training loss over all samples in this epoch.
    pub train_loss: f64,
    pub val_loss: Option<f64>,
    /// Fraction of training samples on the right side of the 0.5 threshold.
    pub train_accuracy: f64,
    pub val_accuracy: Option<f64>,
    /// Wall-clock duration of this epoch in milliseconds.
    pub elapsed_ms: u64,
}
