//! 量子化入出力の分類モデル定義
//!
//! 内部は実数で計算し、入出力の境界でだけu8と相互変換します。

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        Linear, LinearConfig, Relu,
    },
    tensor::{activation::softmax, backend::Backend, Tensor},
};

use crate::error::ClassifierError;

/// モデル設定
#[derive(Config, Debug)]
pub struct ModelConfig {
    /// 分類クラス数
    pub num_classes: usize,
    /// ステム畳み込みの出力チャンネル数
    #[config(default = 16)]
    pub stem_channels: usize,
}

impl ModelConfig {
    /// モデルを初期化
    pub fn init<B: Backend>(&self, device: &B::Device) -> QuantizedClassifier<B> {
        QuantizedClassifier {
            // Stem: 3x3 (no padding, stride 2)
            stem: Conv2dConfig::new([3, self.stem_channels], [3, 3])
                .with_stride([2, 2])
                .init(device),
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            head: LinearConfig::new(self.stem_channels, self.num_classes).init(device),
            activation: Relu::new(),
        }
    }
}

/// 画像分類モデル
///
/// # アーキテクチャ
/// - Conv 3x3 stride 2 + ReLU
/// - Global Average Pooling
/// - FC: stem_channels -> num_classes
/// - Softmax (確率出力時)
#[derive(Module, Debug)]
pub struct QuantizedClassifier<B: Backend> {
    stem: Conv2d<B>,
    pool: AdaptiveAvgPool2d,
    head: Linear<B>,
    activation: Relu,
}

impl<B: Backend> QuantizedClassifier<B> {
    /// 順伝播
    ///
    /// # 引数
    /// - `images`: バッチ画像 [batch_size, 3, height, width]
    ///
    /// # 戻り値
    /// - クラスごとのロジット [batch_size, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _, _, _] = images.dims();

        let x = self.stem.forward(images);
        let x = self.activation.forward(x);
        let x = self.pool.forward(x);

        let [_, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        self.head.forward(x)
    }

    /// クラスごとの確率 [batch_size, num_classes]
    pub fn probabilities(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }

    /// 読み込んだ重みの形状がメタデータと一致するか確認
    pub fn check_shapes(&self, stem_channels: usize, num_classes: usize) -> crate::error::Result<()> {
        let stem = self.stem.weight.dims();
        if stem != [stem_channels, 3, 3, 3] {
            return Err(ClassifierError::ModelLoad(format!(
                "stem weight shape {:?} does not match {} channels",
                stem, stem_channels
            )));
        }

        let head = self.head.weight.dims();
        if head != [stem_channels, num_classes] {
            return Err(ClassifierError::ModelLoad(format!(
                "head weight shape {:?} does not match {} classes",
                head, num_classes
            )));
        }

        Ok(())
    }
}
