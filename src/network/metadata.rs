use serde::{Deserialize, Serialize};

/// Describes how to interpret the input fed to a Network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InputType {
    /// RGB image resized to width×height, normalized to [0, 1], flattened
    /// row-major as R,G,B,R,G,B,...
    ImageRgb { width: u32, height: u32 },
}

/// Optional annotations attached to a saved Network.
/// All fields are Option<> so bare weight files deserialize cleanly.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelMetadata {
    pub description: Option<String>,
    pub input_type: Option<InputType>,
    /// Class names in output order. For a single sigmoid output these are
    /// `[negative, positive]`.
    pub output_labels: Option<Vec<String>>,
}

impl ModelMetadata {
    pub fn image_rgb(width: u32, height: u32, labels: Vec<String>) -> Self {
        ModelMetadata {
            description: None,
            input_type: Some(InputType::ImageRgb { width, height }),
            output_labels: Some(labels),
        }
    }
}
