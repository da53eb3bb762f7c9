//! 指定したモデルとラベルで画像を分類し、結果を表示するコマンド

#[cfg(feature = "ml")]
use std::path::PathBuf;

#[cfg(feature = "ml")]
const USAGE: &str = "Usage: classify <image>... [--model <model.tar.gz>] [--labels <labels.txt>] [--config <config.json>] [--csv <out.csv>] [--json <out.json>]";

#[cfg(feature = "ml")]
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    image_paths: Vec<String>,
    model_path: Option<String>,
    labels_path: Option<String>,
    config_path: Option<PathBuf>,
    csv_path: Option<PathBuf>,
    json_path: Option<PathBuf>,
}

/// コマンドライン引数を解析する
///
/// 値のないフラグや画像の指定がない場合は `None`。
#[cfg(feature = "ml")]
fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Option<CliArgs> {
    let mut parsed = CliArgs::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--model" => parsed.model_path = Some(args.next()?),
            "--labels" => parsed.labels_path = Some(args.next()?),
            "--config" => parsed.config_path = Some(PathBuf::from(args.next()?)),
            "--csv" => parsed.csv_path = Some(PathBuf::from(args.next()?)),
            "--json" => parsed.json_path = Some(PathBuf::from(args.next()?)),
            _ => parsed.image_paths.push(arg),
        }
    }

    if parsed.image_paths.is_empty() {
        return None;
    }
    Some(parsed)
}

#[cfg(feature = "ml")]
fn main() -> anyhow::Result<()> {
    use anyhow::Context;
    use image_classifier_lib::model::AppConfig;
    use image_classifier_lib::{report, DefaultPipeline, ImageInput, ImageOutcome};
    use std::fs::File;

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let Some(CliArgs {
        image_paths,
        model_path,
        labels_path,
        config_path,
        csv_path,
        json_path,
    }) = parse_args(std::env::args().skip(1))
    else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let config = match config_path {
        Some(path) => AppConfig::load(&path)?,
        None => AppConfig::load_or_default(),
    };
    let model_path = model_path.unwrap_or_else(|| config.model.model_path.clone());
    let labels_path = labels_path.unwrap_or_else(|| config.model.labels_path.clone());

    println!("Classify:\n  model: {}\n  labels: {}\n  images: {}", model_path, labels_path, image_paths.len());

    // 初期化
    let model_file = File::open(&model_path).with_context(|| format!("Failed to open model: {}", model_path))?;
    let labels_file =
        File::open(&labels_path).with_context(|| format!("Failed to open labels: {}", labels_path))?;
    let pipeline = DefaultPipeline::initialize(model_file, labels_file, config.pipeline_config()?)
        .context("Pipeline initialization failed")?;

    pipeline.model_config().print_info();

    // 読み込めなかった画像は空データとして投入し、結果の枠を後でI/Oエラーに差し替える
    let mut images = Vec::with_capacity(image_paths.len());
    let mut read_errors = Vec::new();
    for (index, path) in image_paths.iter().enumerate() {
        match ImageInput::from_path(path) {
            Ok(image) => images.push(image),
            Err(e) => {
                images.push(ImageInput::new(path.clone(), Vec::new()));
                read_errors.push((index, e));
            }
        }
    }

    let mut batch = pipeline.classify_all(&images);
    for (index, error) in read_errors {
        batch.record_failure(index, error);
    }

    for outcome in &batch.outcomes {
        match outcome {
            ImageOutcome::Classified(prediction) => println!(
                "{} -> Prediction : {} ({:.4})",
                prediction.image_id, prediction.label, prediction.score
            ),
            ImageOutcome::Failed { image_id, error } => println!("{} -> Error : {}", image_id, error),
            ImageOutcome::Pending { image_id } => println!("{} -> Prediction : NA", image_id),
        }
    }

    if let Some(path) = csv_path {
        report::save_csv(&path, &batch)?;
        println!("CSV report written to {}", path.display());
    }
    if let Some(path) = json_path {
        report::save_json(&path, &batch)?;
        println!("JSON report written to {}", path.display());
    }

    println!("Classified {}/{} images", batch.predictions().count(), batch.len());

    if let Some(error) = batch.abort_error() {
        eprintln!("Batch aborted: {}", error);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(not(feature = "ml"))]
fn main() {
    eprintln!("This binary requires the 'ml' feature. Rebuild with --features ml");
}
