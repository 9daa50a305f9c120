//! `paperflow-vision`: from raw document bytes to recognized text.
//!
//! The OCR engine and the structured-extraction provider are capabilities
//! ([`OcrEngine`], [`StructuredExtractor`]) constructed once by the process
//! entry point and injected where needed. Everything else here is plain image
//! processing.

pub mod error;
pub mod heic;
pub mod normalize;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod provider;
pub mod scorer;
pub mod variants;

pub use error::VisionError;
pub use heic::{HeicDecoder, HeifConvertDecoder};
pub use normalize::{ImageNormalizer, NormalizerConfig, SourceFormat, SourceHint, encode_png};
pub use ocr::{OcrEngine, TesseractEngine};
pub use pdf::{PdfBackend, PopplerPdf};
pub use pipeline::OcrPipeline;
pub use provider::{OpenAiConfig, OpenAiExtractor, StructuredExtractor};
pub use scorer::{MAGNIFICATIONS, Recognition, score_lines, select_best};
pub use variants::{Variant, VariantKind, build_variants};
