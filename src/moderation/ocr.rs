use std::path::{Path, PathBuf};
use std::process::Command;

use image::{DynamicImage, GrayImage, Luma};

use crate::error::ModerationError;

/// Gaussian block size for adaptive thresholding.
pub const THRESHOLD_BLOCK: usize = 11;
/// Subtracted from the local mean before comparing.
pub const THRESHOLD_C: i32 = 2;

/// Extracts text from an image file. Implementations may fail; moderation
/// treats any failure as "no text found".
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, image_path: &Path) -> Result<String, ModerationError>;
}

// ---------------------------------------------------------------------------
// Binarization
// ---------------------------------------------------------------------------

/// Prepares an image for OCR: grayscale, adaptive Gaussian threshold
/// (block 11, C = 2), then a 3×3 median blur to drop speckle.
pub fn binarize_for_ocr(img: &DynamicImage) -> GrayImage {
    let gray = to_gray_bt601(img);
    let binary = adaptive_threshold_gaussian(&gray, THRESHOLD_BLOCK, THRESHOLD_C);
    median_blur_3x3(&binary)
}

/// Grayscale with the fixed-point BT.601 weights (0.299, 0.587, 0.114).
fn to_gray_bt601(img: &DynamicImage) -> GrayImage {
    let rgb = img.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let v = (r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868 + (1 << 13)) >> 14;
        Luma([v as u8])
    })
}

fn gaussian_kernel(size: usize) -> Vec<f32> {
    // Sigma derived from the block size the same way as for an unspecified
    // sigma: 0.3 * ((size - 1) / 2 - 1) + 0.8, i.e. 2.0 for size 11.
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (size / 2) as f32;
    let raw: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - half;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = raw.iter().sum();
    raw.into_iter().map(|w| w / sum).collect()
}

/// Clamped ("replicate") coordinate.
fn clamp_coord(v: i64, len: u32) -> u32 {
    v.clamp(0, len as i64 - 1) as u32
}

/// Separable Gaussian blur with replicated borders, rounded back to u8.
fn gaussian_blur(img: &GrayImage, size: usize) -> GrayImage {
    let kernel = gaussian_kernel(size);
    let half = (size / 2) as i64;
    let (w, h) = img.dimensions();

    let mut horizontal = vec![0.0f32; (w * h) as usize];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = clamp_coord(x as i64 + k as i64 - half, w);
                acc += weight * img.get_pixel(sx, y).0[0] as f32;
            }
            horizontal[(y * w + x) as usize] = acc;
        }
    }

    GrayImage::from_fn(w, h, |x, y| {
        let mut acc = 0.0;
        for (k, weight) in kernel.iter().enumerate() {
            let sy = clamp_coord(y as i64 + k as i64 - half, h);
            acc += weight * horizontal[(sy * w + x) as usize];
        }
        Luma([acc.round().clamp(0.0, 255.0) as u8])
    })
}

/// `255` where the pixel is brighter than its Gaussian-weighted local mean
/// minus `c`, `0` elsewhere.
fn adaptive_threshold_gaussian(img: &GrayImage, block: usize, c: i32) -> GrayImage {
    let mean = gaussian_blur(img, block);
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let src = img.get_pixel(x, y).0[0] as i32;
        let m = mean.get_pixel(x, y).0[0] as i32;
        Luma([if src > m - c { 255 } else { 0 }])
    })
}

fn median_blur_3x3(img: &GrayImage) -> GrayImage {
    let (w, h) = img.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let mut window = [0u8; 9];
        let mut i = 0;
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let sx = clamp_coord(x as i64 + dx, w);
                let sy = clamp_coord(y as i64 + dy, h);
                window[i] = img.get_pixel(sx, sy).0[0];
                i += 1;
            }
        }
        window.sort_unstable();
        Luma([window[4]])
    })
}

// ---------------------------------------------------------------------------
// Tesseract
// ---------------------------------------------------------------------------

/// Runs the external `tesseract` binary on the binarized image.
///
/// Configured for Portuguese (`-l por`) with fully automatic page
/// segmentation (`--psm 3`).
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
    language: String,
    psm: u8,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        TesseractOcr { binary: binary.into(), language: "por".into(), psm: 3 }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        TesseractOcr::new("tesseract")
    }
}

impl TextExtractor for TesseractOcr {
    fn extract_text(&self, image_path: &Path) -> Result<String, ModerationError> {
        let img = image::open(image_path)
            .map_err(|e| ModerationError::OcrFailure(format!("cannot read {}: {}", image_path.display(), e)))?;
        let prepared = binarize_for_ocr(&img);

        let scratch = tempfile::Builder::new()
            .prefix("optic-ocr-")
            .suffix(".png")
            .tempfile()?;
        prepared
            .save_with_format(scratch.path(), image::ImageFormat::Png)
            .map_err(|e| ModerationError::OcrFailure(e.to_string()))?;

        let psm = self.psm.to_string();
        let output = Command::new(&self.binary)
            .arg(scratch.path())
            .arg("stdout")
            .args(["-l", self.language.as_str(), "--psm", psm.as_str()])
            .output()
            .map_err(|e| ModerationError::OcrFailure(format!("{} not available: {}", self.binary.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ModerationError::OcrFailure(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
