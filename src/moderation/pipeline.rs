use std::sync::Arc;

use crate::classifier::Classifier;
use crate::error::ModerationError;
use crate::preprocess::prepare;
use crate::verdict::{decide, Verdict};

/// Image bytes in, verdict out: `prepare` → `predict` → `decide`.
///
/// Cheap to clone; clones share the classifier.
#[derive(Clone)]
pub struct ImagePipeline {
    classifier: Arc<dyn Classifier>,
}

impl ImagePipeline {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        ImagePipeline { classifier }
    }

    /// Classifies one image.
    ///
    /// Model availability is checked first: while no model is loaded every
    /// request is `ModelUnavailable`, whatever the bytes.
    pub fn classify(&self, bytes: &[u8]) -> Result<Verdict, ModerationError> {
        self.classifier.ensure_ready()?;
        let tensor = prepare(bytes)?;
        let score = self.classifier.predict(&tensor)?;
        let verdict = decide(score);
        log::debug!(
            "{} backend scored {:.4} -> {}",
            self.classifier.name(),
            score,
            verdict.label.as_str()
        );
        Ok(verdict)
    }
}
