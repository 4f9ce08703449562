use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use optic::classifier::{self, CompactModel};
use optic::{Config, ImagePipeline, ModerationError, NetworkSpec};

fn png(color: [u8; 3], w: u32, h: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(color)))
        .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
        .unwrap();
    buf
}

fn config(pairs: Vec<(&'static str, String)>) -> Config {
    Config::from_lookup(move |key| {
        pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone())
    })
    .unwrap()
}

fn write_network(dir: &Path) -> std::path::PathBuf {
    let spec = NetworkSpec::binary_image_classifier(
        "optic",
        64,
        64,
        16,
        vec!["illicit".into(), "licit".into()],
    );
    let path = dir.join("model.json");
    spec.build().save_json(&path).unwrap();
    path
}

#[test]
fn native_backend_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = write_network(dir.path());
    let cfg = config(vec![("OPTIC_MODEL_PATH", model_path.display().to_string())]);

    let lazy = Arc::new(classifier::from_config(&cfg));
    assert!(!lazy.is_ready());
    let pipeline = ImagePipeline::new(lazy.clone());

    let first = pipeline.classify(&png([30, 200, 90], 120, 80)).unwrap();
    let second = pipeline.classify(&png([30, 200, 90], 120, 80)).unwrap();
    assert!(lazy.is_ready());
    assert_eq!(first, second);
    assert!((0.5..=1.0).contains(&first.confidence));
    assert_eq!(first.is_licit, first.raw_score > 0.5);
}

#[test]
fn compact_backend_tracks_native_scores() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = write_network(dir.path());
    let network = optic::Network::load_json(&model_path).unwrap();
    let compact_path = dir.path().join("model.optc");
    CompactModel::from_network(&network).save(&compact_path).unwrap();

    let native = ImagePipeline::new(Arc::new(classifier::from_config(&config(vec![(
        "OPTIC_MODEL_PATH",
        model_path.display().to_string(),
    )]))));
    let compact = ImagePipeline::new(Arc::new(classifier::from_config(&config(vec![
        ("OPTIC_BACKEND", "compact".to_owned()),
        ("OPTIC_MODEL_PATH", compact_path.display().to_string()),
    ]))));

    for color in [[0, 0, 0], [255, 255, 255], [200, 40, 40], [10, 90, 220]] {
        let img = png(color, 64, 64);
        let a = native.classify(&img).unwrap().raw_score;
        let b = compact.classify(&img).unwrap().raw_score;
        assert!((a - b).abs() < 0.05, "native {} vs compact {}", a, b);
    }
}

#[test]
fn missing_model_is_unavailable_and_recovers_once_present() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("model.json");
    let cfg = config(vec![("OPTIC_MODEL_PATH", model_path.display().to_string())]);
    let pipeline = ImagePipeline::new(Arc::new(classifier::from_config(&cfg)));

    let err = pipeline.classify(&png([0, 0, 0], 64, 64)).unwrap_err();
    assert!(matches!(err, ModerationError::ModelUnavailable(_)));
    assert_eq!(err.status_code(), 503);

    write_network(dir.path());
    assert!(pipeline.classify(&png([0, 0, 0], 64, 64)).is_ok());
}

#[test]
fn corrupt_upload_is_invalid_image() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = write_network(dir.path());
    let cfg = config(vec![("OPTIC_MODEL_PATH", model_path.display().to_string())]);
    let pipeline = ImagePipeline::new(Arc::new(classifier::from_config(&cfg)));

    let err = pipeline.classify(b"\x89PNG\r\n\x1a\ntruncated").unwrap_err();
    assert!(matches!(err, ModerationError::InvalidImage(_)));
    assert_eq!(err.status_code(), 400);
}

#[test]
fn corrupt_model_file_is_unavailable_not_a_crash() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("model.json");
    let mut network = NetworkSpec::binary_image_classifier(
        "optic",
        64,
        64,
        8,
        vec!["illicit".into(), "licit".into()],
    )
    .build();
    network.layers[0].weights.data.truncate(100);
    network.save_json(&model_path).unwrap();

    let cfg = config(vec![("OPTIC_MODEL_PATH", model_path.display().to_string())]);
    let pipeline = ImagePipeline::new(Arc::new(classifier::from_config(&cfg)));
    let err = pipeline.classify(&png([0, 0, 0], 64, 64)).unwrap_err();
    assert!(matches!(err, ModerationError::ModelUnavailable(_)));
}
