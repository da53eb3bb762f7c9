use serde::Serialize;
use std::path::Path;

use crate::error::{ClassifierError, Result};

/// 分類対象の画像（識別子 + エンコード済みバイト列）
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub id: String,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    pub fn new(id: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            bytes,
        }
    }

    /// ファイルから読み込む（識別子はパス）
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let id = path.display().to_string();
        let bytes = std::fs::read(path).map_err(|e| ClassifierError::io(id.clone(), e))?;
        Ok(Self { id, bytes })
    }
}

/// 1画像の推論結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub image_id: String,
    pub class_index: usize,
    pub label: String,
    /// 逆量子化済みスコア
    pub score: f32,
}

/// バッチ内の1枠
#[derive(Debug)]
pub enum ImageOutcome {
    Classified(Prediction),
    Failed {
        image_id: String,
        error: ClassifierError,
    },
    /// まだ推論されていない（バッチ中断時の残り）
    Pending { image_id: String },
}

impl ImageOutcome {
    pub fn image_id(&self) -> &str {
        match self {
            ImageOutcome::Classified(prediction) => &prediction.image_id,
            ImageOutcome::Failed { image_id, .. } | ImageOutcome::Pending { image_id } => image_id,
        }
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        match self {
            ImageOutcome::Classified(prediction) => Some(prediction),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ClassifierError> {
        match self {
            ImageOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ImageOutcome::Pending { .. })
    }
}

/// `classify_all` の結果
///
/// `outcomes` は入力と同じ順序・同じ件数。
#[derive(Debug)]
pub struct BatchResult {
    pub outcomes: Vec<ImageOutcome>,
    /// 致命的エラーで中断した場合、そのエラーが発生した枠の位置
    pub aborted_at: Option<usize>,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted_at.is_some()
    }

    /// 中断の原因になった致命的エラー
    pub fn abort_error(&self) -> Option<&ClassifierError> {
        self.aborted_at
            .and_then(|index| self.outcomes.get(index))
            .and_then(ImageOutcome::error)
    }

    /// 予測の得られなかった枠を `error` で上書きする
    ///
    /// 分類済みの枠と中断の原因になった枠は変更しない。上書きした場合 `true`。
    pub fn record_failure(&mut self, index: usize, error: ClassifierError) -> bool {
        if self.aborted_at == Some(index) {
            return false;
        }
        match self.outcomes.get_mut(index) {
            Some(slot) if slot.prediction().is_none() => {
                let image_id = slot.image_id().to_string();
                *slot = ImageOutcome::Failed { image_id, error };
                true
            }
            _ => false,
        }
    }

    pub fn predictions(&self) -> impl Iterator<Item = &Prediction> {
        self.outcomes.iter().filter_map(ImageOutcome::prediction)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &ClassifierError)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            ImageOutcome::Failed { image_id, error } => Some((image_id.as_str(), error)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(id: &str) -> Prediction {
        Prediction {
            image_id: id.to_string(),
            class_index: 3,
            label: "cat".to_string(),
            score: 0.9,
        }
    }

    #[test]
    fn test_batch_accessors() {
        let batch = BatchResult {
            outcomes: vec![
                ImageOutcome::Classified(prediction("a.png")),
                ImageOutcome::Failed {
                    image_id: "b.png".to_string(),
                    error: ClassifierError::IndexOutOfRange { index: 9, len: 4 },
                },
                ImageOutcome::Pending {
                    image_id: "c.png".to_string(),
                },
            ],
            aborted_at: Some(1),
        };

        assert_eq!(batch.len(), 3);
        assert!(batch.is_aborted());
        assert!(batch.abort_error().unwrap().is_fatal());
        assert_eq!(batch.predictions().count(), 1);
        assert_eq!(batch.failures().next().unwrap().0, "b.png");
        assert!(batch.outcomes[2].is_pending());
        assert_eq!(batch.outcomes[2].image_id(), "c.png");
    }

    #[test]
    fn test_image_input_from_missing_path() {
        let result = ImageInput::from_path("/nonexistent/photo.jpg");
        assert!(matches!(result, Err(ClassifierError::Io { .. })));
    }

    #[test]
    fn test_record_failure_replaces_failed_and_pending_slots() {
        let read_error = || ClassifierError::io("missing.png", std::io::Error::from(std::io::ErrorKind::NotFound));
        let mut batch = BatchResult {
            outcomes: vec![
                ImageOutcome::Classified(prediction("a.png")),
                ImageOutcome::Failed {
                    image_id: "b.png".to_string(),
                    error: ClassifierError::Decode("empty".into()),
                },
                ImageOutcome::Failed {
                    image_id: "c.png".to_string(),
                    error: ClassifierError::IndexOutOfRange { index: 9, len: 4 },
                },
                ImageOutcome::Pending {
                    image_id: "d.png".to_string(),
                },
            ],
            aborted_at: Some(2),
        };

        assert!(!batch.record_failure(0, read_error()));
        assert!(batch.record_failure(1, read_error()));
        assert!(!batch.record_failure(2, read_error()));
        assert!(batch.record_failure(3, read_error()));
        assert!(!batch.record_failure(4, read_error()));

        assert!(batch.outcomes[0].prediction().is_some());
        assert!(matches!(batch.outcomes[1].error(), Some(ClassifierError::Io { .. })));
        assert!(batch.abort_error().unwrap().is_fatal());
        assert_eq!(batch.outcomes[3].image_id(), "d.png");
        assert!(matches!(batch.outcomes[3].error(), Some(ClassifierError::Io { .. })));
    }
}
