use paperflow_core::DocumentPayload;
use paperflow_extraction::ExtractedFields;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ExtractResponse {
    pub filename: String,
    pub content_type: String,
    pub payload: DocumentPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OcrJsonRequest {
    #[serde(rename = "imageBase64")]
    pub image_base64: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OcrResponse {
    pub ok: bool,
    pub company: String,
    pub total: Option<f64>,
    pub vat: Option<f64>,
    pub raw_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMethod {
    Text,
    Ocr,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParseResponse {
    pub ok: bool,
    pub method: ParseMethod,
    pub fields: ExtractedFields,
    pub text: String,
}
