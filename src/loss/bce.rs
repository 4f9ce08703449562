pub struct BceLoss;

const EPS: f64 = 1e-7;

impl BceLoss {
    /// Scalar BCE: -mean(y·log(p) + (1-y)·log(1-p)), with p clipped to [ε, 1-ε].
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        let n = predicted.len() as f64;
        predicted.iter().zip(expected.iter())
            .map(|(&p, y)| {
                let p = p.clamp(EPS, 1.0 - EPS);
                -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
            })
            .sum::<f64>() / n
    }

    /// Per-output gradient ∂L/∂p: (p - y) / (p · (1 - p)), p clipped as above.
    ///
    /// Multiplied by the sigmoid derivative in the layer this reduces to
    /// `p - y`.
    pub fn derivative(predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        predicted.iter().zip(expected.iter())
            .map(|(&p, y)| {
                let p = p.clamp(EPS, 1.0 - EPS);
                (p - y) / (p * (1.0 - p))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confident_correct_prediction_has_small_loss() {
        assert!(BceLoss::loss(&[0.99], &[1.0]) < 0.02);
        assert!(BceLoss::loss(&[0.01], &[1.0]) > 4.0);
    }

    #[test]
    fn saturated_prediction_stays_finite() {
        assert!(BceLoss::loss(&[0.0], &[1.0]).is_finite());
        assert!(BceLoss::derivative(&[1.0], &[0.0])[0].is_finite());
    }
}
