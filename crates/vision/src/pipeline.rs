//! Bytes in, best recognition out.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::error::VisionError;
use crate::normalize::{ImageNormalizer, SourceHint};
use crate::ocr::OcrEngine;
use crate::scorer::{MAGNIFICATIONS, Recognition, select_best};
use crate::variants::build_variants;

/// Normalizer + variants + scorer around one shared engine.
#[derive(Clone)]
pub struct OcrPipeline {
    normalizer: ImageNormalizer,
    engine: Arc<dyn OcrEngine>,
}

impl OcrPipeline {
    pub fn new(normalizer: ImageNormalizer, engine: Arc<dyn OcrEngine>) -> Self {
        Self { normalizer, engine }
    }

    pub fn normalizer(&self) -> &ImageNormalizer {
        &self.normalizer
    }

    #[instrument(skip(self, bytes), fields(engine = self.engine.name(), size = bytes.len()))]
    pub fn recognize(&self, bytes: &[u8], hint: SourceHint<'_>) -> Result<Recognition, VisionError> {
        let image = self.normalizer.normalize(bytes, hint)?;
        let variants = build_variants(&image);
        let best = select_best(self.engine.as_ref(), &variants, &MAGNIFICATIONS)?;
        info!(
            variant = best.variant.as_str(),
            magnification = best.magnification,
            score = best.score,
            lines = best.lines.len(),
            "ocr selected"
        );
        Ok(best)
    }
}
