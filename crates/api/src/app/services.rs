//! Process-wide capabilities shared by the handlers.
//!
//! The OCR engine and the provider client are expensive to set up, so they
//! are built once here and shared read-only. Tests build the same struct
//! around fakes.

use std::sync::Arc;

use paperflow_infra::ApiConfig;
use paperflow_vision::{
    HeicDecoder, HeifConvertDecoder, ImageNormalizer, NormalizerConfig, OcrEngine, OcrPipeline,
    OpenAiConfig, OpenAiExtractor, PdfBackend, PopplerPdf, StructuredExtractor, TesseractEngine,
    VisionError,
};
use tracing::info;

#[derive(Clone)]
pub struct AppServices {
    config: ApiConfig,
    engine: Arc<dyn OcrEngine>,
    ocr_normalizer: ImageNormalizer,
    vision_normalizer: ImageNormalizer,
    pdf: Option<Arc<dyn PdfBackend>>,
    extractor: Option<Arc<dyn StructuredExtractor>>,
}

impl AppServices {
    /// Images only: no PDF, no HEIC, no structured extraction.
    pub fn new(config: ApiConfig, engine: Arc<dyn OcrEngine>) -> Self {
        let ocr_normalizer = ImageNormalizer::new(NormalizerConfig::ocr().with_max_side(config.ocr_max_side));
        let vision_normalizer =
            ImageNormalizer::new(NormalizerConfig::vision().with_max_side(config.vision_max_side));
        Self {
            config,
            engine,
            ocr_normalizer,
            vision_normalizer,
            pdf: None,
            extractor: None,
        }
    }

    /// Production wiring: Tesseract, poppler, heif-convert, and OpenAI when a key is set.
    pub fn from_config(config: ApiConfig) -> Result<Self, VisionError> {
        let engine: Arc<dyn OcrEngine> = Arc::new(TesseractEngine::new(config.ocr_model.clone()));
        let extractor = match &config.openai_api_key {
            Some(key) => {
                let mut openai = OpenAiConfig::new(key.clone());
                openai.model = config.openai_model.clone();
                openai.base_url = config.openai_base_url.clone();
                Some(Arc::new(OpenAiExtractor::new(openai)?) as Arc<dyn StructuredExtractor>)
            }
            None => None,
        };
        info!(
            ocr_model = %config.ocr_model,
            extraction = extractor.is_some(),
            "services initialized"
        );

        let mut services = Self::new(config, engine)
            .with_pdf(Arc::new(PopplerPdf::new()))
            .with_heic(Arc::new(HeifConvertDecoder));
        services.extractor = extractor;
        Ok(services)
    }

    pub fn with_pdf(mut self, pdf: Arc<dyn PdfBackend>) -> Self {
        self.ocr_normalizer = self.ocr_normalizer.with_pdf(pdf.clone());
        self.vision_normalizer = self.vision_normalizer.with_pdf(pdf.clone());
        self.pdf = Some(pdf);
        self
    }

    pub fn with_heic(mut self, decoder: Arc<dyn HeicDecoder>) -> Self {
        self.ocr_normalizer = self.ocr_normalizer.with_heic(decoder.clone());
        self.vision_normalizer = self.vision_normalizer.with_heic(decoder);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn StructuredExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn ocr_pipeline(&self) -> OcrPipeline {
        OcrPipeline::new(self.ocr_normalizer.clone(), self.engine.clone())
    }

    pub fn vision_normalizer(&self) -> &ImageNormalizer {
        &self.vision_normalizer
    }

    pub fn pdf(&self) -> Option<&Arc<dyn PdfBackend>> {
        self.pdf.as_ref()
    }

    pub fn extractor(&self) -> Option<&Arc<dyn StructuredExtractor>> {
        self.extractor.as_ref()
    }
}
