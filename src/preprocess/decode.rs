//! Image preprocessing for the classifier.
//!
//! Decodes image bytes (PNG/JPEG/BMP/GIF), stretches them to the fixed model
//! input size, and normalizes channel values to [0, 1]. The same function
//! feeds training and inference, so a model only ever sees inputs produced
//! here.

use image::imageops::{self, FilterType};

use crate::error::ModerationError;
use crate::preprocess::tensor::NormalizedTensor;

pub const INPUT_WIDTH: u32 = 64;
pub const INPUT_HEIGHT: u32 = 64;
pub const CHANNELS: usize = 3;

/// Decodes `bytes` to RGB, resizes to exactly 64×64 (no aspect-ratio
/// preservation), and divides every channel by 255.0.
///
/// Deterministic: the same bytes always yield the same tensor.
pub fn prepare(bytes: &[u8]) -> Result<NormalizedTensor, ModerationError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| ModerationError::InvalidImage(e.to_string()))?;
    let rgb = img.to_rgb8();
    let resized = imageops::resize(&rgb, INPUT_WIDTH, INPUT_HEIGHT, FilterType::CatmullRom);

    let data: Vec<f32> = resized
        .pixels()
        .flat_map(|p| p.0.iter().map(|&c| c as f32 / 255.0))
        .collect();

    NormalizedTensor::from_raw(INPUT_HEIGHT as usize, INPUT_WIDTH as usize, data)
        .map_err(ModerationError::InvalidImage)
}
