//! 8bit量子化パラメータ
//!
//! 実数値 = (量子化値 - zero_point) * scale

use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, Result};

/// 参照モデル（MobileNet v1 quant）の出力スケール 1/256
pub const DEFAULT_OUTPUT_SCALE: f32 = 0.00390625;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantParams {
    pub scale: f32,
    #[serde(default)]
    pub zero_point: i32,
}

impl Default for QuantParams {
    fn default() -> Self {
        Self {
            scale: DEFAULT_OUTPUT_SCALE,
            zero_point: 0,
        }
    }
}

impl QuantParams {
    pub fn new(scale: f32, zero_point: i32) -> Result<Self> {
        let params = Self { scale, zero_point };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(ClassifierError::Config(format!(
                "quantization scale must be a positive finite number, got {}",
                self.scale
            )));
        }
        if !(0..=255).contains(&self.zero_point) {
            return Err(ClassifierError::Config(format!(
                "quantization zero point must be within 0..=255, got {}",
                self.zero_point
            )));
        }
        Ok(())
    }

    pub fn dequantize(&self, value: u8) -> f32 {
        (i32::from(value) - self.zero_point) as f32 * self.scale
    }

    /// 実数値を u8 に量子化（四捨五入して 0..=255 にクランプ）
    pub fn quantize(&self, value: f32) -> u8 {
        let q = (value / self.scale).round() + self.zero_point as f32;
        q.clamp(0.0, 255.0) as u8
    }
}
