//! モデルメタデータから取得する推論設定
//!
//! 入力サイズや逆量子化スケールはモデル固有の値なので、
//! パイプラインはここから読み取り、定数として持たない。

use crate::model::model_metadata::ModelMetadata;
use crate::quantization::QuantParams;

/// モデルの入出力仕様
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceConfig {
    /// モデル入力解像度
    pub input_width: u32,
    pub input_height: u32,

    /// 出力ベクトル長（クラス数）
    pub num_classes: usize,

    /// 出力の量子化パラメータ
    pub output_quantization: QuantParams,
}

impl InferenceConfig {
    /// メタデータからInferenceConfigを作成
    pub fn from_metadata(metadata: &ModelMetadata) -> Self {
        Self {
            input_width: metadata.input_width,
            input_height: metadata.input_height,
            num_classes: metadata.num_classes,
            output_quantization: metadata.output_quantization,
        }
    }

    /// 入力テンソルのバイト数（W*H*3）
    pub fn input_len(&self) -> usize {
        self.input_width as usize * self.input_height as usize * 3
    }

    /// 設定情報を表示
    pub fn print_info(&self) {
        println!("\n=== 推論設定 ===");
        println!("モデル入力サイズ: {}x{}", self.input_width, self.input_height);
        println!("総クラス数: {}", self.num_classes);
        println!(
            "出力量子化: scale={} zero_point={}",
            self.output_quantization.scale, self.output_quantization.zero_point
        );
        println!("==================");
    }
}
