//! Compact model format (`.optc`) and its runtime.
//!
//! A converted copy of a dense `Network` with weights quantized to int8,
//! one symmetric scale per layer, and biases kept as f32. Inference runs
//! entirely in f32.
//!
//! # Layout (all integers and floats big-endian)
//! ```text
//! bytes 0-3:  "OPTC"        magic
//! byte  4:    0x01          format version
//! bytes 5-8:  L             layer count (u32)
//! per layer:
//!   u32       input_size
//!   u32       size
//!   u8        activation tag (0 Sigmoid, 1 ReLU, 2 Identity, 3 Tanh, 4 LeakyReLU)
//!   f32       alpha          (LeakyReLU only)
//!   f32       weight scale
//!   i8 × input_size·size    weights, row-major (input × output)
//!   f32 × size              biases
//! ```
//! Trailing bytes after the last layer are rejected.

use std::path::Path;

use crate::activation::activation::ActivationFunction;
use crate::classifier::{check_score, Classifier};
use crate::error::ModerationError;
use crate::network::network::Network;
use crate::preprocess::{NormalizedTensor, CHANNELS, INPUT_HEIGHT, INPUT_WIDTH};

const MAGIC: &[u8; 4] = b"OPTC";
const VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct CompactLayer {
    pub input_size: usize,
    pub size: usize,
    pub activation: ActivationFunction,
    pub scale: f32,
    pub weights: Vec<i8>,
    pub biases: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompactModel {
    pub layers: Vec<CompactLayer>,
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

impl CompactModel {
    /// Quantizes a trained network.
    pub fn from_network(network: &Network) -> CompactModel {
        let layers = network.layers.iter().map(|layer| {
            let max_abs = layer.weights.data.iter().fold(0.0f64, |m, w| m.max(w.abs()));
            let scale = if max_abs > 0.0 { max_abs / 127.0 } else { 1.0 };
            let weights = layer.weights.data.iter()
                .map(|w| (w / scale).round().clamp(-127.0, 127.0) as i8)
                .collect();
            CompactLayer {
                input_size: layer.input_size(),
                size: layer.size,
                activation: layer.activator,
                scale: scale as f32,
                weights,
                biases: layer.biases.data.iter().map(|&b| b as f32).collect(),
            }
        }).collect();
        CompactModel { layers }
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(|l| l.input_size).unwrap_or(0)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map(|l| l.size).unwrap_or(0)
    }

    /// Forward pass over one flat input vector.
    pub fn predict(&self, input: &[f32]) -> Vec<f32> {
        let mut current = input.to_vec();
        for layer in &self.layers {
            let mut acc = vec![0.0f32; layer.size];
            for (i, &x) in current.iter().enumerate() {
                if x == 0.0 {
                    continue;
                }
                let row = &layer.weights[i * layer.size..(i + 1) * layer.size];
                for (a, &q) in acc.iter_mut().zip(row) {
                    *a += x * q as f32;
                }
            }
            current = acc.iter().zip(&layer.biases)
                .map(|(a, b)| layer.activation.function_f32(a * layer.scale + b))
                .collect();
        }
        current
    }

    // -----------------------------------------------------------------------
    // Encoding
    // -----------------------------------------------------------------------

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        out.extend_from_slice(&(self.layers.len() as u32).to_be_bytes());
        for layer in &self.layers {
            out.extend_from_slice(&(layer.input_size as u32).to_be_bytes());
            out.extend_from_slice(&(layer.size as u32).to_be_bytes());
            match layer.activation {
                ActivationFunction::Sigmoid => out.push(0),
                ActivationFunction::ReLU => out.push(1),
                ActivationFunction::Identity => out.push(2),
                ActivationFunction::Tanh => out.push(3),
                ActivationFunction::LeakyReLU { alpha } => {
                    out.push(4);
                    out.extend_from_slice(&(alpha as f32).to_be_bytes());
                }
            }
            out.extend_from_slice(&layer.scale.to_be_bytes());
            out.extend(layer.weights.iter().map(|&w| w as u8));
            for b in &layer.biases {
                out.extend_from_slice(&b.to_be_bytes());
            }
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<CompactModel, String> {
        let mut r = Reader { bytes, pos: 0 };

        let magic = r.take(4, "magic")?;
        if magic != MAGIC {
            return Err(format!(
                "not a compact model: magic is {:02X?}, expected \"OPTC\"",
                magic
            ));
        }
        let version = r.u8("version")?;
        if version != VERSION {
            return Err(format!("unsupported compact model version {}", version));
        }

        let n_layers = r.u32("layer count")? as usize;
        if n_layers == 0 {
            return Err("compact model has no layers".into());
        }

        let mut layers: Vec<CompactLayer> = Vec::with_capacity(n_layers.min(64));
        for idx in 0..n_layers {
            let input_size = r.u32("input_size")? as usize;
            let size = r.u32("size")? as usize;
            let activation = match r.u8("activation")? {
                0 => ActivationFunction::Sigmoid,
                1 => ActivationFunction::ReLU,
                2 => ActivationFunction::Identity,
                3 => ActivationFunction::Tanh,
                4 => ActivationFunction::LeakyReLU { alpha: r.f32("alpha")? as f64 },
                tag => return Err(format!("layer {}: unknown activation tag {}", idx, tag)),
            };
            let scale = r.f32("scale")?;
            if !scale.is_finite() || scale <= 0.0 {
                return Err(format!("layer {}: invalid weight scale {}", idx, scale));
            }

            let n_weights = input_size.checked_mul(size).ok_or_else(|| {
                format!("layer {}: input_size * size overflows ({} x {})", idx, input_size, size)
            })?;
            let weights = r.take(n_weights, "weights")?.iter().map(|&b| b as i8).collect();
            let mut biases = Vec::with_capacity(size.min(1 << 16));
            for _ in 0..size {
                biases.push(r.f32("bias")?);
            }

            if let Some(prev) = layers.last() {
                if prev.size != input_size {
                    return Err(format!(
                        "layer {} expects {} inputs but layer {} outputs {}",
                        idx, input_size, idx - 1, prev.size
                    ));
                }
            }

            layers.push(CompactLayer { input_size, size, activation, scale, weights, biases });
        }

        if r.pos != bytes.len() {
            return Err(format!(
                "{} trailing bytes after the last layer",
                bytes.len() - r.pos
            ));
        }

        Ok(CompactModel { layers })
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_bytes())
    }

    pub fn load(path: &Path) -> std::io::Result<CompactModel> {
        let bytes = std::fs::read(path)?;
        CompactModel::from_bytes(&bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// Bounds-checked big-endian cursor.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], String> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.bytes.len()).ok_or_else(|| {
            format!(
                "truncated compact model: needed {} bytes for {} at offset {}, {} left",
                n, what, self.pos, self.bytes.len() - self.pos
            )
        })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self, what: &str) -> Result<u8, String> {
        Ok(self.take(1, what)?[0])
    }

    fn u32(&mut self, what: &str) -> Result<u32, String> {
        let b = self.take(4, what)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f32(&mut self, what: &str) -> Result<f32, String> {
        let b = self.take(4, what)?;
        Ok(f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Lightweight backend running a `CompactModel`.
#[derive(Debug)]
pub struct CompactClassifier {
    model: CompactModel,
}

impl CompactClassifier {
    pub fn new(model: CompactModel) -> Result<Self, String> {
        let expected_inputs = (INPUT_WIDTH * INPUT_HEIGHT) as usize * CHANNELS;
        if model.input_size() != expected_inputs {
            return Err(format!(
                "compact model expects {} inputs, the preprocessor produces {}",
                model.input_size(), expected_inputs
            ));
        }
        match model.layers.last() {
            Some(last) if last.size == 1 && last.activation.is_probability() => {}
            _ => return Err("compact model must end in a single sigmoid unit".into()),
        }
        Ok(CompactClassifier { model })
    }

    pub fn load(path: &Path) -> Result<Self, ModerationError> {
        let unavailable = |e: String| ModerationError::ModelUnavailable(format!("{}: {}", path.display(), e));
        let model = CompactModel::load(path).map_err(|e| unavailable(e.to_string()))?;
        CompactClassifier::new(model).map_err(unavailable)
    }
}

impl Classifier for CompactClassifier {
    fn predict(&self, tensor: &NormalizedTensor) -> Result<f64, ModerationError> {
        let output = self.model.predict(tensor.as_slice());
        check_score(output[0] as f64)
    }

    fn name(&self) -> &'static str {
        "compact"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::NetworkClassifier;
    use crate::network::spec::NetworkSpec;

    fn small_network() -> Network {
        Network::new(vec![
            (5, 6, ActivationFunction::ReLU),
            (3, 5, ActivationFunction::LeakyReLU { alpha: 0.25 }),
            (1, 3, ActivationFunction::Sigmoid),
        ])
    }

    #[test]
    fn encoding_round_trips() {
        let model = CompactModel::from_network(&small_network());
        let decoded = CompactModel::from_bytes(&model.to_bytes()).unwrap();
        assert_eq!(decoded, model);
    }

    #[test]
    fn quantized_output_tracks_full_precision() {
        let net = small_network();
        let model = CompactModel::from_network(&net);
        let input = [0.2, 0.9, 0.0, 0.4, 1.0, 0.7];
        let full = net.predict(&input)[0];
        let compact = model.predict(&input.map(|v| v as f32))[0] as f64;
        assert!((full - compact).abs() < 0.05, "full {} vs compact {}", full, compact);
    }

    #[test]
    fn classifier_backends_agree_on_a_real_sized_model() {
        let spec = NetworkSpec::binary_image_classifier("m", 64, 64, 8, vec!["illicit".into(), "licit".into()]);
        let net = spec.build();
        let compact = CompactClassifier::new(CompactModel::from_network(&net)).unwrap();
        let native = NetworkClassifier::new(net).unwrap();

        let data: Vec<f32> = (0..64 * 64 * 3).map(|i| (i % 256) as f32 / 255.0).collect();
        let tensor = NormalizedTensor::from_raw(64, 64, data).unwrap();
        let a = native.predict(&tensor).unwrap();
        let b = compact.predict(&tensor).unwrap();
        assert!((a - b).abs() < 0.05, "native {} vs compact {}", a, b);
    }

    #[test]
    fn rejects_bad_magic_truncation_and_trailing_bytes() {
        let bytes = CompactModel::from_network(&small_network()).to_bytes();

        let mut wrong_magic = bytes.clone();
        wrong_magic[0] = b'X';
        assert!(CompactModel::from_bytes(&wrong_magic).unwrap_err().contains("magic"));

        assert!(CompactModel::from_bytes(&bytes[..bytes.len() - 3]).unwrap_err().contains("truncated"));

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(CompactModel::from_bytes(&trailing).unwrap_err().contains("trailing"));
    }

    #[test]
    fn rejects_mismatched_layer_chain() {
        let mut model = CompactModel::from_network(&small_network());
        model.layers[1].input_size = 4;
        model.layers[1].weights.truncate(4 * 3);
        assert!(CompactModel::from_bytes(&model.to_bytes()).unwrap_err().contains("expects 4 inputs"));
    }
}
