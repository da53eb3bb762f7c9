//! 画像前処理
//!
//! デコード済み画像をモデル入力用の固定長バイト列に変換します。
//!
//! ## 入力テンソルの仕様
//! - 長さ: 幅 x 高さ x 3 バイト
//! - 並び: 行優先（上の行から、行内は左から右）
//! - チャンネル順: R, G, B（各1バイト、0-255の生値。正規化しない）
//! - アルファは破棄
//!
//! アスペクト比は保持せず、指定サイズへそのまま引き伸ばします。

use image::{imageops, ColorType, DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, Result};

/// リサイズ時の補間方法（最近傍は提供しない）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    /// バイリニア
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for imageops::FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Triangle => imageops::FilterType::Triangle,
            ResizeFilter::CatmullRom => imageops::FilterType::CatmullRom,
            ResizeFilter::Gaussian => imageops::FilterType::Gaussian,
            ResizeFilter::Lanczos3 => imageops::FilterType::Lanczos3,
        }
    }
}

impl std::fmt::Display for ResizeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResizeFilter::Triangle => write!(f, "triangle"),
            ResizeFilter::CatmullRom => write!(f, "catmull_rom"),
            ResizeFilter::Gaussian => write!(f, "gaussian"),
            ResizeFilter::Lanczos3 => write!(f, "lanczos3"),
        }
    }
}

/// モデル入力テンソル（RGB 1バイト/チャンネル）
///
/// 長さは常に `width * height * 3`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputTensor {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl InputTensor {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(ClassifierError::TensorShape {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// 画像前処理器
///
/// 状態を持たない純粋な変換。
#[derive(Debug, Clone, Copy, Default)]
pub struct ImagePreprocessor {
    filter: ResizeFilter,
}

impl ImagePreprocessor {
    pub fn new(filter: ResizeFilter) -> Self {
        Self { filter }
    }

    /// バイト列を画像としてデコード
    ///
    /// 形式を判別できないデータも含め、デコードの失敗はすべて `Decode`。
    pub fn decode(&self, bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(bytes).map_err(|e| ClassifierError::Decode(e.to_string()))
    }

    /// 画像を `target_width` x `target_height` の入力テンソルに変換
    pub fn process(
        &self,
        image: &DynamicImage,
        target_width: u32,
        target_height: u32,
    ) -> Result<InputTensor> {
        if target_width == 0 || target_height == 0 {
            return Err(ClassifierError::Config(format!(
                "target size must be non-zero, got {}x{}",
                target_width, target_height
            )));
        }

        let rgb = to_rgb(image)?;
        let resized = if rgb.dimensions() == (target_width, target_height) {
            rgb
        } else {
            imageops::resize(&rgb, target_width, target_height, self.filter.into())
        };

        let mut data = Vec::with_capacity(target_width as usize * target_height as usize * 3);
        // pixels() は行優先で走査する
        for pixel in resized.pixels() {
            data.extend_from_slice(&pixel.0);
        }

        InputTensor::new(target_width, target_height, data)
    }

    /// デコードと変換をまとめて行う
    pub fn process_bytes(
        &self,
        bytes: &[u8],
        target_width: u32,
        target_height: u32,
    ) -> Result<InputTensor> {
        let image = self.decode(bytes)?;
        self.process(&image, target_width, target_height)
    }
}

fn to_rgb(image: &DynamicImage) -> Result<RgbImage> {
    match image.color() {
        ColorType::L8
        | ColorType::La8
        | ColorType::Rgb8
        | ColorType::Rgba8
        | ColorType::L16
        | ColorType::La16
        | ColorType::Rgb16
        | ColorType::Rgba16
        | ColorType::Rgb32F
        | ColorType::Rgba32F => Ok(image.to_rgb8()),
        other => Err(ClassifierError::UnsupportedFormat(format!(
            "cannot resolve {:?} to RGB",
            other
        ))),
    }
}
