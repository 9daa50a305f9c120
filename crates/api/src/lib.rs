//! HTTP API: document extraction, OCR, and text parsing over multipart uploads.

pub mod app;
