//! モデルメタデータの定義
//!
//! モデルバンドル（tar.gz）内の `metadata.json` として保存されます。
//!
//! ## 入出力の仕様
//! - 入力: `input_width` x `input_height` x 3 のu8テンソル（NHWC, RGB）
//! - 出力: `num_classes` 個のu8スコア（`output_quantization` で逆量子化）

use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, Result};
use crate::quantization::QuantParams;

/// 現在のバンドル形式バージョン
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// モデルメタデータ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// バンドル形式のバージョン
    pub format_version: u32,

    /// モデル入力の幅（ピクセル）
    pub input_width: u32,

    /// モデル入力の高さ（ピクセル）
    pub input_height: u32,

    /// 出力クラス数（ラベル数と一致すべき）
    pub num_classes: usize,

    /// ステム畳み込みのチャンネル数
    pub stem_channels: usize,

    /// 入力u8の量子化パラメータ
    pub input_quantization: QuantParams,

    /// 出力u8の量子化パラメータ（参照モデルは scale=1/256）
    #[serde(default)]
    pub output_quantization: QuantParams,

    /// 作成時刻（ISO8601形式）
    pub created_at: String,
}

impl ModelMetadata {
    /// 新しいメタデータを作成
    pub fn new(
        input_width: u32,
        input_height: u32,
        num_classes: usize,
        stem_channels: usize,
        input_quantization: QuantParams,
        output_quantization: QuantParams,
    ) -> Self {
        let created_at = chrono::Local::now().to_rfc3339();

        Self {
            format_version: BUNDLE_FORMAT_VERSION,
            input_width,
            input_height,
            num_classes,
            stem_channels,
            input_quantization,
            output_quantization,
            created_at,
        }
    }

    /// 内容の整合性を検証
    pub fn validate(&self) -> Result<()> {
        if self.format_version != BUNDLE_FORMAT_VERSION {
            return Err(ClassifierError::ModelLoad(format!(
                "unsupported bundle format version {}",
                self.format_version
            )));
        }
        // 3x3 stride 2 のステムには最低 3x3 の入力が必要
        if self.input_width < 3 || self.input_height < 3 {
            return Err(ClassifierError::ModelLoad(format!(
                "model input {}x{} is too small",
                self.input_width, self.input_height
            )));
        }
        if self.num_classes == 0 || self.stem_channels == 0 {
            return Err(ClassifierError::ModelLoad(
                "num_classes and stem_channels must be non-zero".to_string(),
            ));
        }
        self.input_quantization
            .validate()
            .and_then(|_| self.output_quantization.validate())
            .map_err(|e| ClassifierError::ModelLoad(e.to_string()))
    }

    /// メタデータをJSON文字列に変換
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ClassifierError::ModelLoad(format!("failed to serialize metadata: {}", e)))
    }

    /// JSON文字列からメタデータを生成
    pub fn from_json_string(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ClassifierError::ModelLoad(format!("failed to parse metadata.json: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> ModelMetadata {
        ModelMetadata::new(
            224,
            224,
            1001,
            16,
            QuantParams::new(1.0 / 255.0, 0).unwrap(),
            QuantParams::default(),
        )
    }

    #[test]
    fn test_json_roundtrip() {
        let metadata = reference();
        let json = metadata.to_json_string().unwrap();
        assert_eq!(ModelMetadata::from_json_string(&json).unwrap(), metadata);
    }

    #[test]
    fn test_output_quantization_defaults() {
        let json = r#"{
            "format_version": 1,
            "input_width": 224,
            "input_height": 224,
            "num_classes": 1001,
            "stem_channels": 8,
            "input_quantization": { "scale": 0.0078125, "zero_point": 128 },
            "created_at": "2024-01-01T00:00:00+00:00"
        }"#;
        let metadata = ModelMetadata::from_json_string(json).unwrap();
        assert_eq!(metadata.output_quantization, QuantParams::default());
        metadata.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_metadata() {
        let mut metadata = reference();
        metadata.num_classes = 0;
        assert!(matches!(metadata.validate(), Err(ClassifierError::ModelLoad(_))));

        let mut metadata = reference();
        metadata.input_width = 2;
        assert!(metadata.validate().is_err());

        let mut metadata = reference();
        metadata.format_version = 99;
        assert!(metadata.validate().is_err());

        let mut metadata = reference();
        metadata.output_quantization.scale = -1.0;
        assert!(matches!(metadata.validate(), Err(ClassifierError::ModelLoad(_))));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            ModelMetadata::from_json_string("{ not json"),
            Err(ClassifierError::ModelLoad(_))
        ));
    }
}
