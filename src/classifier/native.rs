use std::path::Path;

use crate::classifier::{check_score, Classifier};
use crate::error::ModerationError;
use crate::network::metadata::InputType;
use crate::network::network::Network;
use crate::preprocess::{NormalizedTensor, CHANNELS, INPUT_HEIGHT, INPUT_WIDTH};

/// Full-precision backend: the trained dense `Network` as saved by training.
#[derive(Debug)]
pub struct NetworkClassifier {
    network: Network,
}

impl NetworkClassifier {
    /// Wraps `network` after checking that it takes a 64×64 RGB image and
    /// ends in a single probability output.
    pub fn new(network: Network) -> Result<Self, String> {
        network.validate()?;

        let expected_inputs = (INPUT_WIDTH * INPUT_HEIGHT) as usize * CHANNELS;
        if network.input_size() != expected_inputs {
            return Err(format!(
                "network expects {} inputs, the preprocessor produces {}",
                network.input_size(), expected_inputs
            ));
        }

        let input_type = network.metadata.as_ref().and_then(|m| m.input_type.as_ref());
        match input_type {
            None => {}
            Some(InputType::ImageRgb { width, height })
                if *width == INPUT_WIDTH && *height == INPUT_HEIGHT => {}
            Some(other) => {
                return Err(format!("network was trained on {:?}, not 64x64 RGB", other));
            }
        }

        let last = network.layers.last().ok_or("network has no layers")?;
        if last.size != 1 || !last.activator.is_probability() {
            return Err(format!(
                "output layer must be a single sigmoid unit, found {} x {:?}",
                last.size, last.activator
            ));
        }

        Ok(NetworkClassifier { network })
    }

    /// Loads a network JSON file; any failure means the model is unavailable.
    pub fn load(path: &Path) -> Result<Self, ModerationError> {
        let network = Network::load_json(path).map_err(|e| {
            ModerationError::ModelUnavailable(format!("{}: {}", path.display(), e))
        })?;
        NetworkClassifier::new(network)
            .map_err(|e| ModerationError::ModelUnavailable(format!("{}: {}", path.display(), e)))
    }

    pub fn network(&self) -> &Network {
        &self.network
    }
}

impl Classifier for NetworkClassifier {
    fn predict(&self, tensor: &NormalizedTensor) -> Result<f64, ModerationError> {
        let output = self.network.predict(&tensor.to_f64_vec());
        check_score(output[0])
    }

    fn name(&self) -> &'static str {
        "native"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use crate::network::spec::NetworkSpec;

    fn tensor(value: f32) -> NormalizedTensor {
        NormalizedTensor::from_raw(64, 64, vec![value; 64 * 64 * 3]).unwrap()
    }

    #[test]
    fn accepts_the_default_architecture() {
        let spec = NetworkSpec::binary_image_classifier("m", 64, 64, 4, vec!["illicit".into(), "licit".into()]);
        let classifier = NetworkClassifier::new(spec.build()).unwrap();
        let score = classifier.predict(&tensor(0.3)).unwrap();
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn rejects_wrong_input_width() {
        let net = Network::new(vec![(1, 10, ActivationFunction::Sigmoid)]);
        assert!(NetworkClassifier::new(net).is_err());
    }

    #[test]
    fn rejects_unbounded_output() {
        let net = Network::new(vec![(1, 64 * 64 * 3, ActivationFunction::Identity)]);
        assert!(NetworkClassifier::new(net).is_err());
    }

    #[test]
    fn truncated_weights_are_model_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let spec = NetworkSpec::binary_image_classifier("m", 64, 64, 4, vec!["illicit".into(), "licit".into()]);
        let mut net = spec.build();
        net.layers[0].weights.data.truncate(100);
        net.save_json(&path).unwrap();

        let err = NetworkClassifier::load(&path).unwrap_err();
        assert!(matches!(err, ModerationError::ModelUnavailable(_)));
    }

    #[test]
    fn missing_file_is_model_unavailable() {
        let err = NetworkClassifier::load(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, ModerationError::ModelUnavailable(_)));
    }
}
