//! 量子化画像分類パイプライン
//!
//! 画像 -> 入力テンソル -> 推論 -> 逆量子化 -> 最大値選択 -> ラベル

pub mod error;
pub mod labels;
pub mod preprocess;
pub mod quantization;
pub mod decode;
pub mod engine;
pub mod pipeline;
pub mod types;
pub mod report;
pub mod model;
#[cfg(feature = "ml")]
pub mod ml;

pub use engine::InferenceEngine;
pub use error::{ClassifierError, Result};
pub use labels::LabelTable;
pub use pipeline::{Pipeline, PipelineConfig};
pub use preprocess::{ImagePreprocessor, InputTensor, ResizeFilter};
pub use quantization::QuantParams;
pub use types::{BatchResult, ImageInput, ImageOutcome, Prediction};

/// 既定のCPU推論パイプライン
#[cfg(feature = "ml")]
pub type DefaultPipeline = Pipeline<ml::BurnEngine<ml::CpuBackend>>;
