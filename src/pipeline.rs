//! 推論パイプライン
//!
//! 画像 -> 前処理 -> 推論 -> 逆量子化 -> 最大値選択 -> ラベル の流れを管理します。
//! `Pipeline` の値が存在すること自体が Ready 状態を意味し、初期化に失敗した場合は値が作られない。

use std::sync::Mutex;

use image::DynamicImage;

use crate::decode;
use crate::engine::InferenceEngine;
use crate::error::{ClassifierError, Result};
use crate::labels::LabelTable;
use crate::model::InferenceConfig;
use crate::preprocess::{ImagePreprocessor, ResizeFilter};
use crate::quantization::QuantParams;
use crate::types::{BatchResult, ImageInput, ImageOutcome, Prediction};

/// パイプライン設定
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PipelineConfig {
    pub resize_filter: ResizeFilter,
    /// 指定時はモデルの出力量子化パラメータの代わりに使う
    pub output_quantization: Option<QuantParams>,
}

/// 初期化済みの分類パイプライン
///
/// モデルとラベルは初期化後に変更されない。
/// エンジンはMutexで保護され、`classify` の呼び出しは直列化される。
pub struct Pipeline<E: InferenceEngine> {
    engine: Mutex<E>,
    labels: LabelTable,
    preprocessor: ImagePreprocessor,
    model_config: InferenceConfig,
    output_quantization: QuantParams,
}

impl<E: InferenceEngine> Pipeline<E> {
    /// ロード済みエンジンとラベルからパイプラインを構築
    pub fn with_engine(engine: E, labels: LabelTable, config: PipelineConfig) -> Result<Self> {
        let model_config = *engine.inference_config();
        let output_quantization = config
            .output_quantization
            .unwrap_or(model_config.output_quantization);
        output_quantization.validate()?;

        if labels.len() != model_config.num_classes {
            log::warn!(
                "Label table has {} entries but the model outputs {} classes",
                labels.len(),
                model_config.num_classes
            );
        }

        log::info!(
            "Pipeline ready: input {}x{}, {} classes, output scale {}",
            model_config.input_width,
            model_config.input_height,
            model_config.num_classes,
            output_quantization.scale
        );

        Ok(Self {
            engine: Mutex::new(engine),
            labels,
            preprocessor: ImagePreprocessor::new(config.resize_filter),
            model_config,
            output_quantization,
        })
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn model_config(&self) -> &InferenceConfig {
        &self.model_config
    }

    pub fn output_quantization(&self) -> QuantParams {
        self.output_quantization
    }

    /// エンコード済み画像を1枚分類
    pub fn classify(&self, image: &ImageInput) -> Result<Prediction> {
        let decoded = self.preprocessor.decode(&image.bytes)?;
        self.classify_decoded(&image.id, &decoded)
    }

    /// デコード済み画像を1枚分類
    pub fn classify_decoded(&self, image_id: &str, image: &DynamicImage) -> Result<Prediction> {
        let tensor = self.preprocessor.process(
            image,
            self.model_config.input_width,
            self.model_config.input_height,
        )?;

        let output = self.run_engine(tensor.as_bytes())?;
        let top = decode::top_class(&output, &self.output_quantization)
            .ok_or_else(|| ClassifierError::Inference("model produced an empty output vector".to_string()))?;
        let label = self.labels.lookup(top.index)?;

        log::debug!("{} -> {} ({}, score {:.4})", image_id, label, top.index, top.score);

        Ok(Prediction {
            image_id: image_id.to_string(),
            class_index: top.index,
            label: label.to_string(),
            score: top.score,
        })
    }

    /// 複数画像を入力順に分類
    ///
    /// 画像単位の失敗はその枠にエラーとして残し、処理を続ける。
    /// 致命的エラーの場合はそこで中断し、残りの枠は `Pending` になる。
    pub fn classify_all(&self, images: &[ImageInput]) -> BatchResult {
        let mut outcomes = Vec::with_capacity(images.len());
        let mut aborted_at = None;

        for (index, image) in images.iter().enumerate() {
            if aborted_at.is_some() {
                outcomes.push(ImageOutcome::Pending {
                    image_id: image.id.clone(),
                });
                continue;
            }

            match self.classify(image) {
                Ok(prediction) => outcomes.push(ImageOutcome::Classified(prediction)),
                Err(error) => {
                    if error.is_fatal() {
                        log::error!("Aborting batch at {}: {}", image.id, error);
                        aborted_at = Some(index);
                    } else {
                        log::warn!("Failed to classify {}: {}", image.id, error);
                    }
                    outcomes.push(ImageOutcome::Failed {
                        image_id: image.id.clone(),
                        error,
                    });
                }
            }
        }

        BatchResult {
            outcomes,
            aborted_at,
        }
    }

    fn run_engine(&self, input: &[u8]) -> Result<Vec<u8>> {
        let expected = self.model_config.input_len();
        if input.len() != expected {
            return Err(ClassifierError::TensorShape {
                expected,
                actual: input.len(),
            });
        }

        let mut output = vec![0u8; self.model_config.num_classes];
        let mut engine = self.engine.lock().map_err(|_| ClassifierError::EnginePoisoned)?;
        engine.run(input, &mut output)?;
        Ok(output)
    }
}

#[cfg(feature = "ml")]
mod burn_pipeline {
    use std::io::Read;

    use super::*;
    use crate::ml::{BurnEngine, CpuBackend};

    impl Pipeline<BurnEngine<CpuBackend>> {
        /// モデルバンドルとラベルを読み込んでパイプラインを初期化
        ///
        /// どちらかの読み込みに失敗した場合はパイプラインを返さない。
        pub fn initialize<M: Read, L: Read>(
            model_source: M,
            label_source: L,
            config: PipelineConfig,
        ) -> Result<Self> {
            let engine = BurnEngine::load(model_source, Default::default())?;
            let labels = LabelTable::load(label_source)?;
            Self::with_engine(engine, labels, config)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::ml::ModelConfig;
        use crate::model::{write_model_bundle, ModelMetadata};
        use crate::quantization::QuantParams;
        use image::{ImageFormat, Rgb, RgbImage};
        use std::io::Cursor;

        fn bundle(num_classes: usize) -> Vec<u8> {
            let device = Default::default();
            let model = ModelConfig::new(num_classes)
                .with_stem_channels(4)
                .init::<CpuBackend>(&device);
            let metadata = ModelMetadata::new(
                16,
                16,
                num_classes,
                4,
                QuantParams::new(1.0 / 255.0, 0).unwrap(),
                QuantParams::default(),
            );
            let mut bytes = Vec::new();
            BurnEngine::from_model(model, metadata, device)
                .export_bundle(&mut bytes)
                .unwrap();
            bytes
        }

        fn png() -> Vec<u8> {
            let img = RgbImage::from_fn(40, 30, |x, y| Rgb([(x * 6) as u8, (y * 8) as u8, 128]));
            let mut cursor = Cursor::new(Vec::new());
            image::DynamicImage::ImageRgb8(img)
                .write_to(&mut cursor, ImageFormat::Png)
                .unwrap();
            cursor.into_inner()
        }

        #[test]
        fn test_initialize_and_classify() {
            let labels = "apple\nbanana\ncherry\n";
            let pipeline = Pipeline::initialize(
                Cursor::new(bundle(3)),
                Cursor::new(labels),
                PipelineConfig::default(),
            )
            .unwrap();

            assert_eq!(pipeline.model_config().input_width, 16);
            assert_eq!(pipeline.labels().len(), 3);

            let image = ImageInput::new("fruit.png", png());
            let first = pipeline.classify(&image).unwrap();
            let second = pipeline.classify(&image).unwrap();
            assert_eq!(first, second);
            assert!(["apple", "banana", "cherry"].contains(&first.label.as_str()));
        }

        #[test]
        fn test_initialize_rejects_corrupt_model() {
            let result = Pipeline::initialize(
                Cursor::new(b"garbage".to_vec()),
                Cursor::new("a\n"),
                PipelineConfig::default(),
            );
            assert!(matches!(result, Err(ClassifierError::ModelLoad(_))));
        }

        #[test]
        fn test_initialize_rejects_undecodable_weights() {
            // アーカイブとメタデータは正常で、model.bin だけが壊れている
            let metadata = ModelMetadata::new(
                16,
                16,
                2,
                4,
                QuantParams::new(1.0 / 255.0, 0).unwrap(),
                QuantParams::default(),
            );
            let mut bytes = Vec::new();
            write_model_bundle(&mut bytes, &metadata, &[1, 2, 3]).unwrap();

            let result = Pipeline::initialize(
                Cursor::new(bytes),
                Cursor::new("a\nb\n"),
                PipelineConfig::default(),
            );
            assert!(matches!(result, Err(ClassifierError::ModelLoad(_))));
        }

        #[test]
        fn test_initialize_propagates_label_errors() {
            let result = Pipeline::initialize(
                Cursor::new(bundle(2)),
                Cursor::new(vec![0xff, 0xfe, 0x0a]),
                PipelineConfig::default(),
            );
            assert!(matches!(result, Err(ClassifierError::Io { .. })));
        }
    }
}
