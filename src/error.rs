//! 分類パイプラインのエラー定義

use std::io;

/// パイプライン全体で使用するエラー型
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// モデル・ラベル・画像ソースが読み込めない
    #[error("failed to read {what}: {source}")]
    Io {
        what: String,
        #[source]
        source: io::Error,
    },

    /// 画像としてデコードできない
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// RGBに変換できないフォーマット
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// 推論エンジンがモデルを受け付けなかった
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// ラベルテーブルの範囲外（モデルとラベルの不整合）
    #[error("class index {index} is out of range for a label table of {len} entries")]
    IndexOutOfRange { index: usize, len: usize },

    /// 入力テンソル長が W*H*3 と一致しない
    #[error("input tensor has {actual} bytes, expected {expected}")]
    TensorShape { expected: usize, actual: usize },

    /// 1画像分の推論失敗
    #[error("inference failed: {0}")]
    Inference(String),

    #[error("inference engine lock was poisoned")]
    EnginePoisoned,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClassifierError {
    pub fn io(what: impl Into<String>, source: io::Error) -> Self {
        ClassifierError::Io {
            what: what.into(),
            source,
        }
    }

    /// パイプライン全体を停止すべきエラーかどうか
    ///
    /// 画像単位のエラー（デコード失敗など）は false。
    /// モデルとラベルの不整合や前提条件違反は true。
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ClassifierError::IndexOutOfRange { .. }
                | ClassifierError::TensorShape { .. }
                | ClassifierError::EnginePoisoned
        )
    }
}

pub type Result<T> = std::result::Result<T, ClassifierError>;
