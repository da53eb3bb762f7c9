//! 推論エンジンの抽象
//!
//! パイプラインは量子化モデルの実行系をこのトレイト越しにだけ扱う。

use crate::error::Result;
use crate::model::InferenceConfig;

/// 量子化分類モデルの実行系
///
/// 同時呼び出しに対して安全とは限らないため `run` は `&mut self` を取る。
pub trait InferenceEngine {
    /// ロード済みモデルの入出力仕様
    fn inference_config(&self) -> &InferenceConfig;

    /// 入力テンソル（W*H*3 バイト）を推論し、`output` をクラスごとのu8スコアで埋める
    fn run(&mut self, input: &[u8], output: &mut [u8]) -> Result<()>;
}
