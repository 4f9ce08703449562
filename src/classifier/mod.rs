//! Classifier backends.
//!
//! Every backend answers the same question: given a `NormalizedTensor`,
//! what is P(licit)? The decision logic never knows which one it talks to.

pub mod native;
pub mod compact;
pub mod lazy;
pub mod source;

pub use native::NetworkClassifier;
pub use compact::{CompactClassifier, CompactModel};
pub use lazy::{LazyClassifier, ModelSource};
pub use source::{LocalCompactSource, LocalNetworkSource, RemoteCompactSource};

use std::sync::Arc;

use crate::config::{Backend, Config};
use crate::error::ModerationError;
use crate::preprocess::NormalizedTensor;

/// A binary image model. `predict` returns P(licit) in [0, 1].
pub trait Classifier: Send + Sync {
    fn predict(&self, tensor: &NormalizedTensor) -> Result<f64, ModerationError>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Fails with `ModelUnavailable` when `predict` could not run a model.
    /// Eager backends are always ready.
    fn ensure_ready(&self) -> Result<(), ModerationError> {
        Ok(())
    }
}

impl<C: Classifier + ?Sized> Classifier for Arc<C> {
    fn predict(&self, tensor: &NormalizedTensor) -> Result<f64, ModerationError> {
        (**self).predict(tensor)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn ensure_ready(&self) -> Result<(), ModerationError> {
        (**self).ensure_ready()
    }
}

/// Rejects non-finite or out-of-range model output.
pub fn check_score(score: f64) -> Result<f64, ModerationError> {
    if score.is_finite() && (0.0..=1.0).contains(&score) {
        Ok(score)
    } else {
        Err(ModerationError::InvalidScore(score))
    }
}

/// Builds the lazily loaded classifier selected by `config`.
///
/// - `native`: network JSON at `model_path`.
/// - `compact` with `MODEL_URL`: downloaded once to `model_cache_path`.
/// - `compact` without `MODEL_URL`: `.optc` file at `model_path`.
pub fn from_config(config: &Config) -> LazyClassifier {
    let source: Box<dyn ModelSource> = match (config.backend, &config.model_url) {
        (Backend::Native, _) => Box::new(LocalNetworkSource::new(&config.model_path)),
        (Backend::Compact, Some(url)) => Box::new(RemoteCompactSource::new(
            url.clone(),
            config.model_cache_path.clone(),
            config.download_timeout,
        )),
        (Backend::Compact, None) => Box::new(LocalCompactSource::new(&config.model_path)),
    };
    LazyClassifier::new(source)
}
