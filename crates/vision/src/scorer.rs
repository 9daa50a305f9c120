//! Variant OCR Scorer.
//!
//! Every variant is recognized at every magnification; the result with the
//! highest information-density score wins. Score is
//! `chars(joined non-blank lines) + 5 * line_count`, so many short lines can
//! beat a few long ones.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::VisionError;
use crate::ocr::OcrEngine;
use crate::variants::{Variant, VariantKind};

pub const MAGNIFICATIONS: [f32; 2] = [1.0, 1.5];

const LINE_WEIGHT: i64 = 5;
/// Best score before anything succeeded. Any real result beats it.
const NO_SCORE: i64 = -1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recognition {
    /// Non-blank lines joined with `\n`.
    pub text: String,
    pub lines: Vec<String>,
    pub score: i64,
    pub variant: VariantKind,
    pub magnification: f32,
}

/// Joined text and score of one candidate.
pub fn score_lines(lines: &[String]) -> (String, i64) {
    let text = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n");
    let score = text.chars().count() as i64 + LINE_WEIGHT * lines.len() as i64;
    (text, score)
}

/// Picks the best-scoring recognition. Ties keep the first found.
///
/// Failed combinations are skipped. Only when all of them fail does this
/// return [`VisionError::RecognitionExhausted`].
pub fn select_best(
    engine: &dyn OcrEngine,
    variants: &[Variant],
    magnifications: &[f32],
) -> Result<Recognition, VisionError> {
    let mut best: Option<Recognition> = None;
    let mut best_score = NO_SCORE;
    let mut attempts = 0usize;
    let mut last_error = None;

    for variant in variants {
        for &magnification in magnifications {
            attempts += 1;
            let lines = match engine.recognize(&variant.image, magnification) {
                Ok(lines) => lines,
                Err(err) => {
                    warn!(variant = variant.kind.as_str(), magnification, error = %err, "ocr attempt failed");
                    last_error = Some(err.to_string());
                    continue;
                }
            };
            let (text, score) = score_lines(&lines);
            debug!(variant = variant.kind.as_str(), magnification, score, lines = lines.len(), "ocr candidate");
            if score > best_score {
                best_score = score;
                best = Some(Recognition {
                    text,
                    lines,
                    score,
                    variant: variant.kind,
                    magnification,
                });
            }
        }
    }

    best.ok_or(VisionError::RecognitionExhausted {
        attempts,
        last_error,
    })
}
