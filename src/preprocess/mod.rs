pub mod tensor;
pub mod decode;

pub use tensor::NormalizedTensor;
pub use decode::{prepare, CHANNELS, INPUT_HEIGHT, INPUT_WIDTH};
