//! ラベルテーブル
//!
//! 改行区切りのテキストを1行1ラベルとして読み込みます。
//! 行番号がそのままクラスIDになります（空行も1エントリとして保持）。

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::error::{ClassifierError, Result};

/// クラスID -> ラベル名の対応表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    /// 任意のバイトストリームからラベルを読み込む
    pub fn load<R: Read>(source: R) -> Result<Self> {
        let reader = BufReader::new(source);
        let labels = reader
            .lines()
            .collect::<std::io::Result<Vec<String>>>()
            .map_err(|e| ClassifierError::io("label source", e))?;

        log::debug!("Loaded {} labels", labels.len());
        Ok(Self { labels })
    }

    /// ファイルからラベルを読み込む
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ClassifierError::io(path.display().to_string(), e))?;
        Self::load(file)
    }

    pub fn from_labels(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// クラスIDからラベルを取得
    ///
    /// 範囲外の場合はデフォルト値を返さず `IndexOutOfRange` で失敗する。
    pub fn lookup(&self, index: usize) -> Result<&str> {
        self.labels
            .get(index)
            .map(String::as_str)
            .ok_or(ClassifierError::IndexOutOfRange {
                index,
                len: self.labels.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    #[test]
    fn test_load_preserves_order() {
        let table = LabelTable::load(Cursor::new("background\ntench\ngoldfish\n")).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.lookup(0).unwrap(), "background");
        assert_eq!(table.lookup(2).unwrap(), "goldfish");
    }

    #[test]
    fn test_blank_lines_are_entries() {
        let table = LabelTable::load(Cursor::new("a\n\n  c \r\nd")).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.lookup(1).unwrap(), "");
        // 前後の空白はトリムしない
        assert_eq!(table.lookup(2).unwrap(), "  c ");
        assert_eq!(table.lookup(3).unwrap(), "d");
    }

    #[test]
    fn test_lookup_one_past_end_fails() {
        let table = LabelTable::from_labels(vec!["x".into(), "y".into()]);
        match table.lookup(2) {
            Err(ClassifierError::IndexOutOfRange { index, len }) => {
                assert_eq!(index, 2);
                assert_eq!(len, 2);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_empty_source() {
        let table = LabelTable::load(Cursor::new("")).unwrap();
        assert!(table.is_empty());
        assert!(table.lookup(0).is_err());
    }

    #[test]
    fn test_unreadable_source() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
            }
        }

        assert!(matches!(LabelTable::load(Broken), Err(ClassifierError::Io { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = LabelTable::load_from_path("/nonexistent/labels.txt");
        assert!(matches!(result, Err(ClassifierError::Io { .. })));
    }

    #[test]
    fn test_invalid_utf8_is_io_error() {
        let result = LabelTable::load(Cursor::new(vec![0x61, 0xff, 0xfe, 0x0a]));
        assert!(matches!(result, Err(ClassifierError::Io { .. })));
    }
}
