//! モデルバンドルの永続化
//!
//! Tar.gz形式でモデルとメタデータを1ファイルに統合して保存・読み込みします。
//!
//! ファイル構成（tar.gz内部）:
//! - metadata.json   - メタデータ（入力サイズ、クラス数、量子化パラメータ）
//! - model.bin       - モデルの重み（バイナリ）

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Archive, Builder};

use crate::error::{ClassifierError, Result};
use crate::model::model_metadata::ModelMetadata;

const METADATA_ENTRY: &str = "metadata.json";
const MODEL_ENTRY: &str = "model.bin";

/// バンドル解析中のエラーはすべて不正なモデルとして扱う
fn corrupt(err: io::Error) -> ClassifierError {
    ClassifierError::ModelLoad(format!("corrupt model bundle: {}", err))
}

fn append_entry<W: Write>(builder: &mut Builder<W>, name: &str, bytes: &[u8]) -> io::Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_path(name)?;
    header.set_size(bytes.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append(&header, bytes)
}

/// メタデータとモデルバイナリを任意の出力先へ書き込む
pub fn write_model_bundle<W: Write>(
    writer: W,
    metadata: &ModelMetadata,
    model_binary: &[u8],
) -> Result<()> {
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut tar_builder = Builder::new(encoder);

    let json_str = metadata.to_json_string()?;
    append_entry(&mut tar_builder, METADATA_ENTRY, json_str.as_bytes())
        .map_err(|e| ClassifierError::io("metadata.json entry", e))?;
    append_entry(&mut tar_builder, MODEL_ENTRY, model_binary)
        .map_err(|e| ClassifierError::io("model.bin entry", e))?;

    // tarアーカイブとgzipストリームを完成させる
    tar_builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .map_err(|e| ClassifierError::io("model bundle", e))?;

    Ok(())
}

/// メタデータと共にモデルをTar.gz形式で保存
pub fn save_model_bundle(
    output_path: &Path,
    metadata: &ModelMetadata,
    model_binary: &[u8],
) -> Result<()> {
    // 親ディレクトリが存在しない場合は作成
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ClassifierError::io(parent.display().to_string(), e))?;
        }
    }

    let file = File::create(output_path)
        .map_err(|e| ClassifierError::io(output_path.display().to_string(), e))?;
    write_model_bundle(file, metadata, model_binary)
}

/// バイトストリームからメタデータとモデルバイナリを共に読み込む
///
/// ストリームを最後まで読んでから解析する。
/// 読み込み失敗は `Io`、内容の破損は `ModelLoad` になる。
pub fn read_model_bundle<R: Read>(mut source: R) -> Result<(ModelMetadata, Vec<u8>)> {
    let mut bundle = Vec::new();
    source
        .read_to_end(&mut bundle)
        .map_err(|e| ClassifierError::io("model source", e))?;
    parse_model_bundle(&bundle)
}

/// メモリ上のTar.gzバイト列を解析
pub fn parse_model_bundle(bundle: &[u8]) -> Result<(ModelMetadata, Vec<u8>)> {
    let decoder = GzDecoder::new(bundle);
    let mut archive = Archive::new(decoder);

    let mut metadata_opt: Option<ModelMetadata> = None;
    let mut model_binary_opt: Option<Vec<u8>> = None;

    for entry in archive.entries().map_err(corrupt)? {
        let mut entry = entry.map_err(corrupt)?;
        let path = entry.path().map_err(corrupt)?.into_owned();

        match path.to_str() {
            Some(METADATA_ENTRY) => {
                let mut json_str = String::new();
                entry.read_to_string(&mut json_str).map_err(corrupt)?;
                metadata_opt = Some(ModelMetadata::from_json_string(&json_str)?);
            }
            Some(MODEL_ENTRY) => {
                let mut buffer = Vec::new();
                entry.read_to_end(&mut buffer).map_err(corrupt)?;
                model_binary_opt = Some(buffer);
            }
            _ => {}
        }
    }

    match (metadata_opt, model_binary_opt) {
        (Some(metadata), Some(binary)) => {
            metadata.validate()?;
            Ok((metadata, binary))
        }
        (None, _) => Err(ClassifierError::ModelLoad(
            "metadata.json not found in model bundle".to_string(),
        )),
        (_, None) => Err(ClassifierError::ModelLoad(
            "model.bin not found in model bundle".to_string(),
        )),
    }
}

/// Tar.gzファイルからメタデータとモデルバイナリを読み込む
pub fn load_model_bundle(path: &Path) -> Result<(ModelMetadata, Vec<u8>)> {
    let file = File::open(path).map_err(|e| ClassifierError::io(path.display().to_string(), e))?;
    read_model_bundle(file)
}
