use std::sync::Arc;

use optic::{ImagePipeline, LazyClassifier};

/// Shared, read-only server state. Per-request work never mutates it; the
/// lazily loaded model does its own locking.
pub struct AppState {
    pub pipeline: ImagePipeline,
    pub model: Option<Arc<LazyClassifier>>,
}

impl AppState {
    pub fn new(model: Arc<LazyClassifier>) -> Self {
        AppState { pipeline: ImagePipeline::new(model.clone()), model: Some(model) }
    }

    /// State around an arbitrary pipeline, without a lazy model to warm.
    #[cfg(test)]
    pub fn with_pipeline(pipeline: ImagePipeline) -> Self {
        AppState { pipeline, model: None }
    }
}

pub type SharedState = Arc<AppState>;
