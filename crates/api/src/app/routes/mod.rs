//! One file per endpoint; `common` holds the upload and OCR plumbing they share.

pub mod common;
pub mod extract;
pub mod ocr;
pub mod parse;
pub mod system;
