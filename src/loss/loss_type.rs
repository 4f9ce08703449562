use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::loss::{bce::BceLoss, mse::MseLoss};

/// Selects which loss function the training loop uses.
///
/// - `BinaryCrossEntropy`: pair with a single Sigmoid output (the classifier).
/// - `Mse`: mean-squared error; pair with an Identity or Sigmoid output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    BinaryCrossEntropy,
    Mse,
}

impl LossType {
    /// Scalar loss for one sample.
    pub fn loss(&self, predicted: &[f64], expected: &[f64]) -> f64 {
        match self {
            LossType::BinaryCrossEntropy => BceLoss::loss(predicted, expected),
            LossType::Mse                => MseLoss::loss(predicted, expected),
        }
    }

    /// Per-output gradient for one sample.
    pub fn derivative(&self, predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        match self {
            LossType::BinaryCrossEntropy => BceLoss::derivative(predicted, expected),
            LossType::Mse                => MseLoss::derivative(predicted, expected),
        }
    }
}

/// Accepts `bce` / `binary_cross_entropy` and `mse`, case-insensitively.
impl FromStr for LossType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bce" | "binary_cross_entropy" => Ok(LossType::BinaryCrossEntropy),
            "mse" => Ok(LossType::Mse),
            other => Err(format!("unknown loss `{}` (expected `bce` or `mse`)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cli_names() {
        assert_eq!("bce".parse::<LossType>().unwrap(), LossType::BinaryCrossEntropy);
        assert_eq!("Binary_Cross_Entropy".parse::<LossType>().unwrap(), LossType::BinaryCrossEntropy);
        assert_eq!(" MSE ".parse::<LossType>().unwrap(), LossType::Mse);
        assert!("huber".parse::<LossType>().is_err());
    }

    #[test]
    fn dispatches_to_matching_loss() {
        let p = [0.8];
        let t = [1.0];
        assert!((LossType::Mse.loss(&p, &t) - 0.04).abs() < 1e-12);
        assert!((LossType::BinaryCrossEntropy.loss(&p, &t) - (-(0.8f64).ln())).abs() < 1e-9);
    }
}
