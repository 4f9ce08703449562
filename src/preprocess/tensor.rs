/// Model input: a single RGB image as a `1 × H × W × 3` (NHWC) `f32` tensor
/// with every value in [0, 1].
///
/// Only `preprocess::prepare` constructs tensors from image bytes; the
/// value-range invariant is checked by `from_raw` for everything else.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    height: usize,
    width: usize,
    data: Vec<f32>,
}

impl NormalizedTensor {
    /// Wraps an interleaved RGB buffer of `height * width * 3` values.
    pub fn from_raw(height: usize, width: usize, data: Vec<f32>) -> Result<Self, String> {
        let expected = height * width * 3;
        if data.len() != expected {
            return Err(format!(
                "tensor buffer has {} values, expected {} for {}x{}x3",
                data.len(), expected, height, width
            ));
        }
        if let Some(bad) = data.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(format!("tensor value {} outside [0, 1]", bad));
        }
        Ok(NormalizedTensor { height, width, data })
    }

    /// `[batch, height, width, channels]`; batch is always 1.
    pub fn shape(&self) -> [usize; 4] {
        [1, self.height, self.width, 3]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value at `[0, y, x, channel]`.
    pub fn get(&self, y: usize, x: usize, channel: usize) -> f32 {
        self.data[(y * self.width + x) * 3 + channel]
    }

    /// Flat NHWC view, as fed to the compact runtime.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Flat NHWC copy widened to `f64`, as fed to the native network.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.data.iter().map(|&v| v as f64).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_values() {
        assert!(NormalizedTensor::from_raw(1, 1, vec![0.0, 0.5, 1.0]).is_ok());
        assert!(NormalizedTensor::from_raw(1, 1, vec![0.0, 1.5, 1.0]).is_err());
        assert!(NormalizedTensor::from_raw(1, 1, vec![0.0, f32::NAN, 1.0]).is_err());
        assert!(NormalizedTensor::from_raw(2, 1, vec![0.0; 3]).is_err());
    }

    #[test]
    fn indexing_is_nhwc() {
        let data: Vec<f32> = (0..12).map(|v| v as f32 / 12.0).collect();
        let t = NormalizedTensor::from_raw(2, 2, data).unwrap();
        assert_eq!(t.shape(), [1, 2, 2, 3]);
        assert_eq!(t.get(1, 0, 2), 8.0 / 12.0);
    }
}
