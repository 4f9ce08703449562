use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::classifier::Classifier;
use crate::error::ModerationError;
use crate::preprocess::NormalizedTensor;

/// Where a model comes from. `load` may be slow (download, parse) and is
/// called at most once at a time by `LazyClassifier`.
pub trait ModelSource: Send + Sync {
    fn load(&self) -> Result<Arc<dyn Classifier>, ModerationError>;

    /// Human-readable origin for logs.
    fn describe(&self) -> String;
}

enum Slot {
    Empty,
    Loading,
    Ready(Arc<dyn Classifier>),
}

/// Process-wide model handle with single-flight lazy initialization.
///
/// The first `predict` loads the model outside the lock while the slot is
/// marked `Loading`. Callers that arrive during that window get
/// `ModelUnavailable` immediately instead of waiting. A failed load empties
/// the slot again, so the next request makes a fresh attempt; nothing is
/// retried within a request. Once loaded, the model is shared for the
/// lifetime of the handle.
pub struct LazyClassifier {
    source: Box<dyn ModelSource>,
    slot: Mutex<Slot>,
}

impl LazyClassifier {
    pub fn new(source: Box<dyn ModelSource>) -> Self {
        LazyClassifier { source, slot: Mutex::new(Slot::Empty) }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.lock(), Slot::Ready(_))
    }

    /// Returns the loaded model, loading it first if nobody has yet.
    pub fn acquire(&self) -> Result<Arc<dyn Classifier>, ModerationError> {
        {
            let mut slot = self.lock();
            match &*slot {
                Slot::Ready(model) => return Ok(model.clone()),
                Slot::Loading => {
                    return Err(ModerationError::ModelUnavailable("model is still loading".into()))
                }
                Slot::Empty => *slot = Slot::Loading,
            }
        }

        log::info!("Loading model from {}", self.source.describe());
        let mut reset = ResetOnUnwind { slot: &self.slot, armed: true };
        let result = self.source.load();
        reset.armed = false;

        let mut slot = self.lock();
        match result {
            Ok(model) => {
                log::info!("Model ready ({} backend)", model.name());
                *slot = Slot::Ready(model.clone());
                Ok(model)
            }
            Err(e) => {
                log::error!("Failed to load model from {}: {}", self.source.describe(), e);
                *slot = Slot::Empty;
                Err(e)
            }
        }
    }

    /// Eager load at startup. Failure is logged, not fatal: the server stays
    /// up and answers 503 until a later request loads the model.
    pub fn warm(&self) {
        if let Err(e) = self.acquire() {
            log::warn!("Model not available at startup: {}", e);
        }
    }
}

/// Puts the slot back to `Empty` if `ModelSource::load` panics, so the
/// handle does not report "still loading" forever.
struct ResetOnUnwind<'a> {
    slot: &'a Mutex<Slot>,
    armed: bool,
}

impl Drop for ResetOnUnwind<'_> {
    fn drop(&mut self) {
        if self.armed {
            *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Slot::Empty;
        }
    }
}

impl Classifier for LazyClassifier {
    fn predict(&self, tensor: &NormalizedTensor) -> Result<f64, ModerationError> {
        self.acquire()?.predict(tensor)
    }

    fn name(&self) -> &'static str {
        "lazy"
    }

    fn ensure_ready(&self) -> Result<(), ModerationError> {
        self.acquire().map(|_| ())
    }
}
