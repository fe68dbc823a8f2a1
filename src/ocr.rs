//! OCR adapter - turns receipt images into recognized text lines.
//!
//! The engine is a thin wrapper around the `tesseract` binary: the image is
//! handed to tesseract in TSV mode and its word-level output is regrouped
//! into lines with a length-weighted confidence score. Lines at or below the
//! confidence threshold are dropped before the parser ever sees them.
//!
//! Multiple files are processed strictly sequentially (one OCR session at a
//! time); a failure for one file is logged and skipped so the remaining
//! files still produce results.

use crate::errors::{Error, Result};
use crate::models::ReceiptLine;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, warn};

/// Progress callback invoked with a percentage in `0..=100`.
pub type ProgressFn = dyn Fn(u8) + Send + Sync;

/// Result of recognizing one image.
#[derive(Debug, Clone, Default)]
pub struct OcrOutput {
    /// All recognized line texts joined with newlines
    pub raw_text: String,
    /// Recognized lines that survived the confidence filter
    pub lines: Vec<ReceiptLine>,
}

/// An OCR engine that recognizes text lines in an image file.
pub trait OcrEngine {
    /// Recognizes the image at `path`. The optional progress callback
    /// receives values in `0..=100`.
    async fn recognize(&self, path: &Path, progress: Option<&ProgressFn>) -> Result<OcrOutput>;
}

/// OCR engine backed by the `tesseract` command-line binary.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    languages: String,
    confidence_threshold: u8,
}

impl TesseractOcr {
    /// Creates an engine for the given tesseract language string (e.g.
    /// `eng+deu`). Lines with confidence at or below the threshold are
    /// filtered out.
    #[must_use]
    pub fn new(languages: impl Into<String>, confidence_threshold: u8) -> Self {
        Self {
            languages: languages.into(),
            confidence_threshold,
        }
    }
}

impl OcrEngine for TesseractOcr {
    async fn recognize(&self, path: &Path, progress: Option<&ProgressFn>) -> Result<OcrOutput> {
        if let Some(report) = progress {
            report(0);
        }

        let output = Command::new("tesseract")
            .arg(path)
            .arg("stdout")
            .args(["-l", &self.languages, "--psm", "6", "--dpi", "300", "tsv"])
            .output()
            .await
            .map_err(|e| Error::Ocr {
                message: format!("failed to run tesseract (is it installed?): {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Ocr {
                message: format!("tesseract failed for {}: {}", path.display(), stderr.trim()),
            });
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let source_file = source_label(path);
        let lines = parse_tsv_lines(&tsv, &source_file, self.confidence_threshold);
        debug!(file = %source_file, lines = lines.len(), "ocr recognition finished");

        if let Some(report) = progress {
            report(100);
        }

        Ok(OcrOutput {
            raw_text: lines
                .iter()
                .map(|l| l.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            lines,
        })
    }
}

/// Runs OCR over several files in sequence, one at a time.
///
/// A failure for one file is logged and that file is skipped; processing
/// continues with the remaining files. There is no cancellation for an
/// in-flight recognition.
pub async fn process_files<E: OcrEngine>(
    engine: &E,
    files: &[std::path::PathBuf],
    progress: Option<&ProgressFn>,
) -> Vec<ReceiptLine> {
    let mut all_lines = Vec::new();
    for file in files {
        match engine.recognize(file, progress).await {
            Ok(output) => all_lines.extend(output.lines),
            Err(e) => {
                warn!(file = %file.display(), error = %e, "skipping file after OCR failure");
            }
        }
    }
    all_lines
}

fn source_label(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Regroups tesseract's word-level TSV output (level 5 rows) into lines.
///
/// Words are keyed by their (page, block, paragraph, line) position, joined
/// with single spaces in reading order, and the line confidence is the
/// character-length-weighted average of the word confidences. Empty lines
/// and lines at or below `confidence_threshold` are dropped; surviving lines
/// are indexed in reading order.
fn parse_tsv_lines(tsv: &str, source_file: &str, confidence_threshold: u8) -> Vec<ReceiptLine> {
    let mut grouped: BTreeMap<(u32, u32, u32, u32), Vec<(String, f32)>> = BTreeMap::new();

    for (idx, row) in tsv.lines().enumerate() {
        // First row is the column header.
        if idx == 0 {
            continue;
        }
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }
        let level: u32 = cols[0].parse().unwrap_or(0);
        if level != 5 {
            continue;
        }
        let page: u32 = cols[1].parse().unwrap_or(0);
        let block: u32 = cols[2].parse().unwrap_or(0);
        let paragraph: u32 = cols[3].parse().unwrap_or(0);
        let line: u32 = cols[4].parse().unwrap_or(0);
        let conf: f32 = cols[10].parse().unwrap_or(-1.0);
        let text = cols[11].trim();
        if text.is_empty() || conf < 0.0 {
            continue;
        }
        grouped
            .entry((page, block, paragraph, line))
            .or_default()
            .push((text.to_string(), conf));
    }

    let mut lines = Vec::new();
    for words in grouped.into_values() {
        let text = words
            .iter()
            .map(|(word, _)| word.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        let mut conf_sum = 0.0f32;
        let mut weight_sum = 0.0f32;
        for (word, conf) in &words {
            #[allow(clippy::cast_precision_loss)]
            let weight = word.chars().count().max(1) as f32;
            conf_sum += conf * weight;
            weight_sum += weight;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let confidence = (conf_sum / weight_sum.max(1.0)).round().clamp(0.0, 100.0) as u8;
        if confidence <= confidence_threshold {
            continue;
        }

        lines.push(ReceiptLine {
            text: text.to_string(),
            confidence,
            source_file: source_file.to_string(),
            source_index: lines.len(),
            translated_text: None,
            detected_language: None,
        });
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn word_row(block: u32, line: u32, word: u32, conf: f32, text: &str) -> String {
        format!("5\t1\t{block}\t1\t{line}\t{word}\t0\t0\t10\t10\t{conf}\t{text}")
    }

    #[test]
    fn test_parse_tsv_groups_words_into_lines() {
        let tsv = [
            HEADER.to_string(),
            "1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t".to_string(),
            word_row(1, 1, 1, 90.0, "Vollmilch"),
            word_row(1, 1, 2, 80.0, "1.65"),
            word_row(1, 2, 1, 95.0, "Brot"),
            word_row(1, 2, 2, 85.0, "2.20"),
        ]
        .join("\n");

        let lines = parse_tsv_lines(&tsv, "a.jpg", 30);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Vollmilch 1.65");
        assert_eq!(lines[1].text, "Brot 2.20");
        assert_eq!(lines[0].source_file, "a.jpg");
        assert_eq!(lines[0].source_index, 0);
        assert_eq!(lines[1].source_index, 1);
    }

    #[test]
    fn test_confidence_is_length_weighted() {
        // "Vollmilch" (9 chars, conf 90) and "x" (1 char, conf 0):
        // weighted average = (9*90 + 1*0) / 10 = 81.
        let tsv = [
            HEADER.to_string(),
            word_row(1, 1, 1, 90.0, "Vollmilch"),
            word_row(1, 1, 2, 0.0, "x"),
        ]
        .join("\n");

        let lines = parse_tsv_lines(&tsv, "a.jpg", 30);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].confidence, 81);
    }

    #[test]
    fn test_low_confidence_lines_filtered() {
        let tsv = [
            HEADER.to_string(),
            word_row(1, 1, 1, 20.0, "noise"),
            word_row(1, 2, 1, 90.0, "Brot"),
        ]
        .join("\n");

        let lines = parse_tsv_lines(&tsv, "a.jpg", 30);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Brot");
        // Indexing is over kept lines only.
        assert_eq!(lines[0].source_index, 0);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // Confidence exactly at the threshold is dropped (filter is "> 30").
        let tsv = [HEADER.to_string(), word_row(1, 1, 1, 30.0, "edge")].join("\n");
        assert!(parse_tsv_lines(&tsv, "a.jpg", 30).is_empty());

        let tsv = [HEADER.to_string(), word_row(1, 1, 1, 31.0, "edge")].join("\n");
        assert_eq!(parse_tsv_lines(&tsv, "a.jpg", 30).len(), 1);
    }

    #[test]
    fn test_negative_conf_rows_ignored() {
        // Structural rows (level < 5) and conf -1 placeholders never
        // contribute words.
        let tsv = [
            HEADER.to_string(),
            "4\t1\t1\t1\t1\t0\t0\t0\t10\t10\t-1\t".to_string(),
            word_row(1, 1, 1, -1.0, "ghost"),
        ]
        .join("\n");
        assert!(parse_tsv_lines(&tsv, "a.jpg", 30).is_empty());
    }
}
