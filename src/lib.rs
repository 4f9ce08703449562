pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod train;

pub mod error;
pub mod config;
pub mod logging;
pub mod preprocess;
pub mod classifier;
pub mod verdict;
pub mod moderation;

// Convenience re-exports
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::dense::Layer;
pub use network::{Network, NetworkSpec, LayerSpec};
pub use network::metadata::{InputType, ModelMetadata};
pub use loss::LossType;
pub use optim::sgd::Sgd;
pub use train::{train_loop, EpochStats, TrainConfig};

pub use error::ModerationError;
pub use config::{Backend, Config, ConfigError};
pub use preprocess::{prepare, NormalizedTensor};
pub use classifier::{Classifier, CompactClassifier, LazyClassifier, NetworkClassifier};
pub use verdict::{decide, Label, Verdict};
pub use moderation::{ImagePipeline, KeywordList};
