use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::loss::loss_type::LossType;
use crate::network::metadata::ModelMetadata;
use crate::network::network::Network;

/// One layer in an architecture description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSpec {
    pub size: usize,
    pub input_size: usize,
    pub activation: ActivationFunction,
}

/// A serializable architecture plus its training loss and metadata.
///
/// Kept apart from trained weights so an architecture can be stored and
/// reviewed before a training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub name: String,
    pub layers: Vec<LayerSpec>,
    pub loss: LossType,
    #[serde(default)]
    pub metadata: Option<ModelMetadata>,
}

impl NetworkSpec {
    /// The default moderation architecture: one hidden ReLU layer over the
    /// flattened RGB image, a single sigmoid output trained with BCE.
    pub fn binary_image_classifier(
        name: impl Into<String>,
        width: u32,
        height: u32,
        hidden: usize,
        labels: Vec<String>,
    ) -> NetworkSpec {
        let inputs = (width * height * 3) as usize;
        NetworkSpec {
            name: name.into(),
            layers: vec![
                LayerSpec { size: hidden, input_size: inputs, activation: ActivationFunction::ReLU },
                LayerSpec { size: 1, input_size: hidden, activation: ActivationFunction::Sigmoid },
            ],
            loss: LossType::BinaryCrossEntropy,
            metadata: Some(ModelMetadata::image_rgb(width, height, labels)),
        }
    }

    /// Instantiates freshly initialized weights for this architecture.
    pub fn build(&self) -> Network {
        let network = Network::new(
            self.layers.iter().map(|l| (l.size, l.input_size, l.activation)).collect(),
        );
        match &self.metadata {
            Some(meta) => network.with_metadata(meta.clone()),
            None => network,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_classifier_builds_expected_shape() {
        let spec = NetworkSpec::binary_image_classifier("optic", 4, 4, 8, vec!["no".into(), "yes".into()]);
        let net = spec.build();
        assert_eq!(net.input_size(), 48);
        assert_eq!(net.output_size(), 1);
        assert!(net.validate().is_ok());
        assert!(net.metadata.is_some());
    }
}
