use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::{
    activation::activation::ActivationFunction,
    layers::dense::Layer,
    math::matrix::Matrix,
    network::metadata::ModelMetadata,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub metadata: Option<ModelMetadata>,
}

impl Network {
    /// Builds a network from (size, input_size, activation) tuples.
    pub fn new(layer_specs: Vec<(usize, usize, ActivationFunction)>) -> Network {
        let layers = layer_specs.into_iter()
            .map(|(size, input_size, activation)| Layer::new(size, input_size, activation))
            .collect();
        Network { layers, metadata: None }
    }

    pub fn with_metadata(mut self, metadata: ModelMetadata) -> Network {
        self.metadata = Some(metadata);
        self
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(|l| l.input_size()).unwrap_or(0)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map(|l| l.size).unwrap_or(0)
    }

    /// Training forward pass; stores activations in each layer for backprop.
    pub fn forward(&mut self, input: &[f64]) -> Vec<f64> {
        let mut current = Matrix::row_vector(input.to_vec());
        for layer in &mut self.layers {
            current = layer.feed_from(&current);
        }
        current.data
    }

    /// Inference forward pass that does not touch the training caches.
    pub fn predict(&self, input: &[f64]) -> Vec<f64> {
        let mut current = Matrix::row_vector(input.to_vec());
        for layer in &self.layers {
            current = layer.apply(&current);
        }
        current.data
    }

    /// Checks that consecutive layers agree on their dimensions.
    pub fn validate(&self) -> Result<(), String> {
        if self.layers.is_empty() {
            return Err("network has no layers".into());
        }
        for (i, pair) in self.layers.windows(2).enumerate() {
            if pair[0].size != pair[1].input_size() {
                return Err(format!(
                    "layer {} outputs {} values but layer {} expects {}",
                    i, pair[0].size, i + 1, pair[1].input_size()
                ));
            }
        }
        for (i, layer) in self.layers.iter().enumerate() {
            let w = &layer.weights;
            if w.data.len() != w.rows * w.cols {
                return Err(format!(
                    "layer {} declares {}x{} weights but holds {}",
                    i, w.rows, w.cols, w.data.len()
                ));
            }
            if w.cols != layer.size {
                return Err(format!("layer {} has {} weight columns for {} units", i, w.cols, layer.size));
            }
            if layer.biases.cols != layer.size
                || layer.biases.rows != 1
                || layer.biases.data.len() != layer.size
            {
                return Err(format!("layer {} has a malformed bias vector", i));
            }
        }
        Ok(())
    }

    /// Serializes the network weights to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    /// Deserializes a network from a JSON file previously written by `save_json`.
    pub fn load_json(path: impl AsRef<Path>) -> std::io::Result<Network> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let network: Network = serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        network.validate()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_matches_training_forward() {
        let mut net = Network::new(vec![
            (3, 4, ActivationFunction::ReLU),
            (1, 3, ActivationFunction::Sigmoid),
        ]);
        let input = [0.1, 0.4, 0.9, 0.0];
        let inferred = net.predict(&input);
        let trained = net.forward(&input);
        assert_eq!(inferred, trained);
        assert_eq!(inferred.len(), 1);
    }

    #[test]
    fn json_round_trip_preserves_weights_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let net = Network::new(vec![(2, 3, ActivationFunction::Tanh)])
            .with_metadata(ModelMetadata::image_rgb(8, 8, vec!["a".into(), "b".into()]));
        net.save_json(&path).unwrap();

        let loaded = Network::load_json(&path).unwrap();
        let original = &net.layers[0].weights.data;
        let restored = &loaded.layers[0].weights.data;
        assert_eq!(original.len(), restored.len());
        assert!(original.iter().zip(restored).all(|(a, b)| (a - b).abs() < 1e-12));
        assert_eq!(loaded.metadata.unwrap().output_labels.unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn validate_rejects_inconsistent_weights() {
        let mut net = Network::new(vec![(3, 2, ActivationFunction::ReLU)]);
        net.layers[0].weights.data.truncate(4);
        assert!(net.validate().unwrap_err().contains("holds 4"));

        let mut net = Network::new(vec![(3, 2, ActivationFunction::ReLU)]);
        net.layers[0].size = 4;
        assert!(net.validate().is_err());
    }

    #[test]
    fn load_rejects_mismatched_layers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        let mut net = Network::new(vec![
            (3, 2, ActivationFunction::ReLU),
            (1, 3, ActivationFunction::Sigmoid),
        ]);
        net.layers[1] = Layer::new(1, 5, ActivationFunction::Sigmoid);
        net.save_json(&path).unwrap();

        let err = Network::load_json(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
