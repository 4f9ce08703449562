use std::sync::mpsc;
use crate::loss::loss_type::LossType;
use crate::train::epoch_stats::EpochStats;

/// Configuration for a `train_loop` run.
///
/// `progress_tx` receives one `EpochStats` per completed epoch; if the
/// receiver is dropped the loop stops after the current epoch.
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub loss_type: LossType,
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
}

impl TrainConfig {
    /// Creates a `TrainConfig` with no progress channel.
    pub fn new(epochs: usize, batch_size: usize, loss_type: LossType) -> Self {
        TrainConfig { epochs, batch_size, loss_type, progress_tx: None }
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<EpochStats>) -> Self {
        self.progress_tx = Some(tx);
        self
    }
}
