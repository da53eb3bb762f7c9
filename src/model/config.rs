//! アプリケーション設定管理モジュール
//!
//! モデル・ラベルのパスや量子化パラメータの上書きをJSON形式で保存・読み込みします。

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ClassifierError;
use crate::pipeline::PipelineConfig;
use crate::preprocess::ResizeFilter;
use crate::quantization::QuantParams;

/// モデル設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// モデルバンドル（tar.gz）のパス
    pub model_path: String,
    /// ラベルファイルのパス
    pub labels_path: String,
    /// 出力スケールの上書き（未指定ならモデルの値）
    #[serde(default)]
    pub output_scale: Option<f32>,
    /// 出力ゼロ点の上書き
    #[serde(default)]
    pub output_zero_point: Option<i32>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_path: "models/mobilenet_v1_1.0_224_quant.tar.gz".to_string(),
            labels_path: "models/labels.txt".to_string(),
            output_scale: None,
            output_zero_point: None,
        }
    }
}

/// 前処理設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreprocessSettings {
    /// リサイズ補間方法
    #[serde(default)]
    pub resize_filter: ResizeFilter,
}

/// アプリケーション設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// モデル設定
    pub model: ModelSettings,
    /// 前処理設定
    #[serde(default)]
    pub preprocess: PreprocessSettings,
}

impl AppConfig {
    /// 設定ファイルのデフォルトパス
    pub fn default_path() -> PathBuf {
        PathBuf::from("config.json")
    }

    /// 設定を読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// デフォルトパスから設定を読み込む、存在しない場合はデフォルト設定を返す
    pub fn load_or_default() -> Self {
        let path = Self::default_path();
        if path.exists() {
            match Self::load(&path) {
                Ok(config) => {
                    log::info!("Loaded config file: {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("{:#}; using default settings", e);
                    Self::default()
                }
            }
        } else {
            log::info!("No config file found, using default settings");
            Self::default()
        }
    }

    /// 設定を保存する
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;
        Ok(())
    }

    /// 出力量子化の上書き値
    ///
    /// ゼロ点だけ指定された場合は参照モデルのスケールを使う。
    pub fn output_quantization(&self) -> Result<Option<QuantParams>, ClassifierError> {
        match (self.model.output_scale, self.model.output_zero_point) {
            (None, None) => Ok(None),
            (scale, zero_point) => {
                let defaults = QuantParams::default();
                QuantParams::new(
                    scale.unwrap_or(defaults.scale),
                    zero_point.unwrap_or(defaults.zero_point),
                )
                .map(Some)
            }
        }
    }

    /// パイプライン設定を作成
    pub fn pipeline_config(&self) -> Result<PipelineConfig, ClassifierError> {
        Ok(PipelineConfig {
            resize_filter: self.preprocess.resize_filter,
            output_quantization: self.output_quantization()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.preprocess.resize_filter, ResizeFilter::Triangle);
        assert!(config.model.output_scale.is_none());
        assert_eq!(config.pipeline_config().unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_serialize_deserialize() {
        let mut config = AppConfig::default();
        config.model.output_scale = Some(0.5);
        config.preprocess.resize_filter = ResizeFilter::Lanczos3;

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"lanczos3\""));
        let deserialized: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_minimal_json() {
        let json = r#"{ "model": { "model_path": "m.tar.gz", "labels_path": "l.txt" } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.model.model_path, "m.tar.gz");
        assert_eq!(config.preprocess.resize_filter, ResizeFilter::Triangle);
    }

    #[test]
    fn test_output_quantization_override() {
        let mut config = AppConfig::default();
        config.model.output_scale = Some(0.25);
        let params = config.pipeline_config().unwrap().output_quantization.unwrap();
        assert_eq!(params.scale, 0.25);
        assert_eq!(params.zero_point, 0);

        config.model.output_scale = None;
        config.model.output_zero_point = Some(10);
        let params = config.output_quantization().unwrap().unwrap();
        assert_eq!(params.scale, 0.00390625);
        assert_eq!(params.zero_point, 10);

        config.model.output_scale = Some(-1.0);
        assert!(matches!(config.pipeline_config(), Err(ClassifierError::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("image_classifier_config_{}.json", std::process::id()));
        let mut config = AppConfig::default();
        config.model.labels_path = "assets/labels.txt".to_string();

        config.save(&path).unwrap();
        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, config);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_missing_file() {
        assert!(AppConfig::load("/nonexistent/config.json").is_err());
    }
}
