//! 推論結果のCSV/JSON出力

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::types::{BatchResult, ImageOutcome};

/// 出力1行分
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub image_id: String,
    pub status: &'static str,
    pub class_index: Option<usize>,
    pub label: Option<String>,
    pub score: Option<f32>,
    pub error: Option<String>,
}

impl From<&ImageOutcome> for ReportRow {
    fn from(outcome: &ImageOutcome) -> Self {
        match outcome {
            ImageOutcome::Classified(prediction) => ReportRow {
                image_id: prediction.image_id.clone(),
                status: "classified",
                class_index: Some(prediction.class_index),
                label: Some(prediction.label.clone()),
                score: Some(prediction.score),
                error: None,
            },
            ImageOutcome::Failed { image_id, error } => ReportRow {
                image_id: image_id.clone(),
                status: "failed",
                class_index: None,
                label: None,
                score: None,
                error: Some(error.to_string()),
            },
            ImageOutcome::Pending { image_id } => ReportRow {
                image_id: image_id.clone(),
                status: "pending",
                class_index: None,
                label: None,
                score: None,
                error: None,
            },
        }
    }
}

pub fn rows(batch: &BatchResult) -> Vec<ReportRow> {
    batch.outcomes.iter().map(ReportRow::from).collect()
}

/// CSVとして書き出す（ヘッダ付き）
pub fn write_csv<W: Write>(writer: W, batch: &BatchResult) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().has_headers(true).from_writer(writer);
    for row in rows(batch) {
        csv_writer
            .serialize(&row)
            .with_context(|| format!("Failed to write CSV row for {}", row.image_id))?;
    }
    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

pub fn save_csv(path: &Path, batch: &BatchResult) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    write_csv(file, batch)
}

pub fn to_json_string(batch: &BatchResult) -> Result<String> {
    serde_json::to_string_pretty(&rows(batch)).context("Failed to serialize report to JSON")
}

pub fn save_json(path: &Path, batch: &BatchResult) -> Result<()> {
    let json = to_json_string(batch)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write JSON file: {}", path.display()))
}
