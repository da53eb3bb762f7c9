pub mod ml_model;
pub mod inference;

pub use ml_model::{ModelConfig, QuantizedClassifier};
pub use inference::{BurnEngine, CpuBackend};
