use thiserror::Error;

/// Failures of the moderation pipeline.
///
/// Every variant is terminal for the request or message being processed;
/// nothing in the pipeline retries.
#[derive(Debug, Error)]
pub enum ModerationError {
    /// The bytes could not be decoded as an image.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// No model is loaded: not configured, still loading, download or load
    /// failed.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// The OCR engine failed. Callers on the bot path swallow this and treat
    /// the image as containing no text.
    #[error("OCR failure: {0}")]
    OcrFailure(String),

    /// The classifier returned something that is not a probability.
    #[error("model returned an invalid score: {0}")]
    InvalidScore(f64),

    /// A training dataset directory is unusable.
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ModerationError {
    /// HTTP status equivalent used by the REST surface.
    pub fn status_code(&self) -> u16 {
        match self {
            ModerationError::InvalidImage(_) => 400,
            ModerationError::ModelUnavailable(_) => 503,
            _ => 500,
        }
    }
}
