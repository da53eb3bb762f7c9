//! Burnによる推論エンジン

use std::io::{Read, Write};

use burn::{
    module::Module,
    record::{FullPrecisionSettings, NamedMpkBytesRecorder, Recorder},
    tensor::{backend::Backend, Tensor},
};

use crate::engine::InferenceEngine;
use crate::error::{ClassifierError, Result};
use crate::ml::{ModelConfig, QuantizedClassifier};
use crate::model::{read_model_bundle, write_model_bundle, InferenceConfig, ModelMetadata};

/// CPUバックエンド
pub type CpuBackend = burn_ndarray::NdArray;

/// 推論エンジン
pub struct BurnEngine<B: Backend> {
    model: QuantizedClassifier<B>,
    metadata: ModelMetadata,
    config: InferenceConfig,
    device: B::Device,
}

impl<B: Backend> BurnEngine<B> {
    /// モデルバンドルのバイトストリームから推論エンジンを初期化
    pub fn load<R: Read>(model_source: R, device: B::Device) -> Result<Self> {
        let (metadata, model_binary) = read_model_bundle(model_source)?;
        Self::from_bundle(metadata, model_binary, device)
    }

    /// メタデータと重みバイナリから初期化
    pub fn from_bundle(metadata: ModelMetadata, model_binary: Vec<u8>, device: B::Device) -> Result<Self> {
        metadata.validate()?;

        let model = ModelConfig::new(metadata.num_classes)
            .with_stem_channels(metadata.stem_channels)
            .init::<B>(&device);

        // モデルの重みを復元
        let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::default();
        let record = recorder
            .load(model_binary, &device)
            .map_err(|e| ClassifierError::ModelLoad(format!("failed to restore weights: {:?}", e)))?;
        let model = model.load_record(record);
        model.check_shapes(metadata.stem_channels, metadata.num_classes)?;

        log::info!(
            "Loaded model: {}x{} input, {} classes (created {})",
            metadata.input_width,
            metadata.input_height,
            metadata.num_classes,
            metadata.created_at
        );

        Ok(Self::from_model(model, metadata, device))
    }

    /// 構築済みモデルから初期化
    pub fn from_model(model: QuantizedClassifier<B>, metadata: ModelMetadata, device: B::Device) -> Self {
        let config = InferenceConfig::from_metadata(&metadata);
        Self {
            model,
            metadata,
            config,
            device,
        }
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// 現在の重みとメタデータをモデルバンドルとして書き出す
    pub fn export_bundle<W: Write>(&self, writer: W) -> Result<()> {
        let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::default();
        let model_binary = Recorder::<B>::record(&recorder, self.model.clone().into_record(), ())
            .map_err(|e| ClassifierError::ModelLoad(format!("failed to serialize weights: {:?}", e)))?;
        write_model_bundle(writer, &self.metadata, &model_binary)
    }
}

impl<B: Backend> InferenceEngine for BurnEngine<B> {
    fn inference_config(&self) -> &InferenceConfig {
        &self.config
    }

    fn run(&mut self, input: &[u8], output: &mut [u8]) -> Result<()> {
        let expected = self.config.input_len();
        if input.len() != expected {
            return Err(ClassifierError::TensorShape {
                expected,
                actual: input.len(),
            });
        }
        if output.len() != self.config.num_classes {
            return Err(ClassifierError::Inference(format!(
                "output buffer holds {} scores, model produces {}",
                output.len(),
                self.config.num_classes
            )));
        }

        // u8入力を逆量子化 (NHWC)
        let input_quantization = self.metadata.input_quantization;
        let values: Vec<f32> = input.iter().map(|&q| input_quantization.dequantize(q)).collect();

        // Tensorに変換 [1, H, W, 3] -> [1, 3, H, W]
        let height = self.config.input_height as usize;
        let width = self.config.input_width as usize;
        let images = Tensor::<B, 1>::from_floats(values.as_slice(), &self.device)
            .reshape([1, height, width, 3])
            .permute([0, 3, 1, 2]);

        let probabilities = self
            .model
            .probabilities(images)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("failed to read model output: {:?}", e)))?;

        // 確率をu8に量子化
        let output_quantization = self.config.output_quantization;
        for (slot, probability) in output.iter_mut().zip(probabilities) {
            *slot = output_quantization.quantize(probability);
        }

        Ok(())
    }
}
