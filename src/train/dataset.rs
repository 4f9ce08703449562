use std::path::{Path, PathBuf};

use crate::error::ModerationError;
use crate::preprocess::prepare;

/// A binary image dataset laid out as `<root>/<class>/<image>`.
///
/// Class directories are sorted by name; the first becomes label `0.0`, the
/// second label `1.0`. With directories named `illicit` and `licit` the
/// network therefore learns P(licit).
#[derive(Debug, Clone)]
pub struct ImageFolder {
    pub inputs: Vec<Vec<f64>>,
    pub labels: Vec<Vec<f64>>,
    pub class_names: Vec<String>,
    /// Files that could not be decoded and were left out.
    pub skipped: usize,
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif"];

/// Loads every image under `root`, preprocessed exactly as at inference time.
pub fn load_image_folder(root: &Path) -> Result<ImageFolder, ModerationError> {
    let mut class_dirs: Vec<PathBuf> = std::fs::read_dir(root)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    class_dirs.sort();

    if class_dirs.len() != 2 {
        return Err(ModerationError::InvalidDataset(format!(
            "{} must contain exactly two class directories, found {}",
            root.display(),
            class_dirs.len()
        )));
    }

    let mut folder = ImageFolder {
        inputs: Vec::new(),
        labels: Vec::new(),
        class_names: Vec::with_capacity(2),
        skipped: 0,
    };

    for (class_idx, dir) in class_dirs.iter().enumerate() {
        let name = dir.file_name().and_then(|s| s.to_str()).unwrap_or_default().to_owned();
        folder.class_names.push(name);

        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .flatten()
            .map(|e| e.path())
            .filter(|p| has_image_extension(p))
            .collect();
        files.sort();

        for file in files {
            let bytes = std::fs::read(&file)?;
            match prepare(&bytes) {
                Ok(tensor) => {
                    folder.inputs.push(tensor.to_f64_vec());
                    folder.labels.push(vec![class_idx as f64]);
                }
                Err(e) => {
                    log::warn!("Skipping {}: {}", file.display(), e);
                    folder.skipped += 1;
                }
            }
        }
    }

    if folder.inputs.is_empty() {
        return Err(ModerationError::InvalidDataset(format!(
            "no decodable images under {}",
            root.display()
        )));
    }

    log::info!(
        "Loaded {} images from {} (classes: {:?}, skipped {})",
        folder.inputs.len(),
        root.display(),
        folder.class_names,
        folder.skipped
    );
    Ok(folder)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
