use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};

use paperflow_api::app::{build_app, services::AppServices};
use paperflow_core::DocumentPayload;
use paperflow_infra::ApiConfig;
use paperflow_vision::{OcrEngine, PdfBackend, StructuredExtractor, VisionError, encode_png};

/// Returns the same receipt for every variant.
struct ReceiptEngine;

impl OcrEngine for ReceiptEngine {
    fn recognize(&self, _image: &RgbImage, _magnification: f32) -> Result<Vec<String>, VisionError> {
        Ok(vec![
            "KVITTO".to_string(),
            "ICA Maxi Lindhagen".to_string(),
            "Org nr: 556677-8899".to_string(),
            "Total: 1234,50 SEK".to_string(),
            "Moms 246,90".to_string(),
        ])
    }

    fn name(&self) -> &str {
        "receipt-fake"
    }
}

struct CannedExtractor(Result<Value, String>);

#[async_trait]
impl StructuredExtractor for CannedExtractor {
    async fn extract(&self, png: &[u8]) -> Result<DocumentPayload, VisionError> {
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']), "provider must receive a PNG");
        match &self.0 {
            Ok(value) => Ok(DocumentPayload::from_value(value.clone())?),
            Err(message) => Err(VisionError::UpstreamUnavailable(message.clone())),
        }
    }

    fn model(&self) -> &str {
        "canned"
    }
}

struct TextLayerPdf(&'static str);

impl PdfBackend for TextLayerPdf {
    fn text_layer(&self, _pdf: &[u8]) -> Result<String, VisionError> {
        Ok(self.0.to_string())
    }

    fn rasterize_first_page(&self, _pdf: &[u8]) -> Result<Vec<u8>, VisionError> {
        encode_png(&RgbImage::from_pixel(40, 60, Rgb([255, 255, 255])))
    }
}

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(services: AppServices) -> Self {
        // Same router as prod, but bound to an ephemeral port.
        let app = build_app(Arc::new(services));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn config() -> ApiConfig {
    ApiConfig {
        max_upload_size: 64 * 1024,
        ocr_timeout: Duration::from_secs(10),
        ..ApiConfig::default()
    }
}

fn services() -> AppServices {
    AppServices::new(config(), Arc::new(ReceiptEngine))
}

fn sample_png() -> Vec<u8> {
    encode_png(&RgbImage::from_pixel(40, 60, Rgb([250, 250, 250]))).unwrap()
}

fn file_form(bytes: Vec<u8>, filename: &str, mime: &str) -> Form {
    let part = Part::bytes(bytes).file_name(filename.to_string()).mime_str(mime).unwrap();
    Form::new().part("file", part)
}

fn offer_payload() -> Value {
    json!({
        "document_type": "offer",
        "document_number": "OFF-2024-17",
        "issue_date": "2024-03-01",
        "total": { "currency": "SEK", "amount": 1234.5 },
        "customer": { "name": "Acme AB", "vat_number": "556677-8899" },
        "items": [{ "description": "Målning", "quantity": 2.0, "unit_price": 617.25, "total": 1234.5 }]
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let srv = TestServer::spawn(services()).await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "ok": true, "status": "ok" }));
}

#[tokio::test]
async fn any_origin_is_allowed() {
    let srv = TestServer::spawn(services()).await;
    let res = reqwest::Client::new()
        .get(srv.url("/health"))
        .header("origin", "https://intranet.example")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let allow = res
        .headers()
        .get("access-control-allow-origin")
        .and_then(|v| v.to_str().ok());
    assert_eq!(allow, Some("*"));
}

#[tokio::test]
async fn ocr_multipart_returns_receipt_summary() {
    let srv = TestServer::spawn(services()).await;
    let res = reqwest::Client::new()
        .post(srv.url("/ocr"))
        .multipart(file_form(sample_png(), "kvitto.png", "image/png"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["company"], "ICA Maxi Lindhagen");
    assert_eq!(body["total"], 1234.5);
    assert_eq!(body["vat"], 246.9);
    assert!(body["raw_text"].as_str().unwrap().contains("Org nr: 556677-8899"));
}

#[tokio::test]
async fn ocr_accepts_base64_data_url() {
    use base64::Engine as _;
    let encoded = base64::engine::general_purpose::STANDARD.encode(sample_png());

    let srv = TestServer::spawn(services()).await;
    let res = reqwest::Client::new()
        .post(srv.url("/ocr"))
        .json(&json!({ "imageBase64": format!("data:image/png;base64,{encoded}") }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["company"], "ICA Maxi Lindhagen");
}

#[tokio::test]
async fn ocr_error_codes() {
    let srv = TestServer::spawn(services()).await;
    let client = reqwest::Client::new();

    let cases = [
        (json!({}), StatusCode::BAD_REQUEST, "NO_FILE"),
        (json!({ "imageBase64": "data:image/png;base64,@@@" }), StatusCode::BAD_REQUEST, "BASE64_DECODE_FAILED"),
        (json!({ "imageBase64": "aGk=" }), StatusCode::BAD_REQUEST, "EMPTY_FILE"),
        (
            json!({ "imageBase64": "bm90IGFuIGltYWdlIGF0IGFsbCwganVzdCB0ZXh0" }),
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "DECODE_FAILED",
        ),
    ];
    for (body, status, code) in cases {
        let res = client.post(srv.url("/ocr")).json(&body).send().await.unwrap();
        assert_eq!(res.status(), status, "{code}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], code);
    }
}

#[tokio::test]
async fn ocr_multipart_without_file_field() {
    let srv = TestServer::spawn(services()).await;
    let form = Form::new().text("note", "no file here");
    let res = reqwest::Client::new()
        .post(srv.url("/ocr"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "NO_FILE");
}

#[tokio::test]
async fn extract_is_not_mounted_without_provider() {
    let srv = TestServer::spawn(services()).await;
    let res = reqwest::Client::new()
        .post(srv.url("/extract"))
        .multipart(file_form(sample_png(), "offer.png", "image/png"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn extract_returns_payload_and_secure_filename() {
    let services = services().with_extractor(Arc::new(CannedExtractor(Ok(offer_payload()))));
    let srv = TestServer::spawn(services).await;
    let res = reqwest::Client::new()
        .post(srv.url("/extract"))
        .multipart(file_form(sample_png(), "my offer.png", "image/png"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let filename = body["filename"].as_str().unwrap();
    assert!(filename.starts_with("my_offer-"), "{filename}");
    assert!(filename.ends_with(".png"));
    assert_eq!(body["content_type"], "image/png");
    assert_eq!(body["payload"]["document_type"], "offer");
    assert_eq!(body["payload"]["document_number"], "OFF-2024-17");
    assert_eq!(body["payload"]["items"][0]["description"], "Målning");
}

#[tokio::test]
async fn extract_rejects_bad_uploads() {
    let services = services().with_extractor(Arc::new(CannedExtractor(Ok(offer_payload()))));
    let srv = TestServer::spawn(services).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/extract"))
        .multipart(file_form(Vec::new(), "empty.png", "image/png"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/extract"))
        .multipart(file_form(vec![0u8; 64 * 1024 + 1], "big.png", "image/png"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let res = client
        .post(srv.url("/extract"))
        .multipart(file_form(b"plain text body".to_vec(), "notes.txt", "text/plain"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unsupported_file_type");

    let res = client
        .post(srv.url("/extract"))
        .multipart(file_form(b"definitely not a png".to_vec(), "broken.png", "image/png"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_image");
}

#[tokio::test]
async fn extract_provider_failures_are_bad_gateway() {
    let services = services().with_extractor(Arc::new(CannedExtractor(Err("timeout".into()))));
    let srv = TestServer::spawn(services).await;
    let res = reqwest::Client::new()
        .post(srv.url("/extract"))
        .multipart(file_form(sample_png(), "r.png", "image/png"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    let invalid = services_with_payload(json!({ "document_type": "poem" }));
    let srv = TestServer::spawn(invalid).await;
    let res = reqwest::Client::new()
        .post(srv.url("/extract"))
        .multipart(file_form(sample_png(), "r.png", "image/png"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
}

fn services_with_payload(payload: Value) -> AppServices {
    services().with_extractor(Arc::new(CannedExtractor(Ok(payload))))
}

#[tokio::test]
async fn parse_uses_pdf_text_layer_when_long_enough() {
    let text = "Offertnr: OFF-2024-17\nOrg nr: 556677-8899\nDatum 2024-03-01\nTotal: 1234,50 SEK";
    let services = services().with_pdf(Arc::new(TextLayerPdf(text)));
    let srv = TestServer::spawn(services).await;
    let res = reqwest::Client::new()
        .post(srv.url("/parse"))
        .multipart(file_form(b"%PDF-1.7 fake".to_vec(), "offer.pdf", "application/pdf"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["method"], "text");
    assert_eq!(body["fields"]["organization_number"], "556677-8899");
    assert_eq!(body["fields"]["offer_number"], "OFF-2024-17");
    assert_eq!(body["fields"]["date_iso"], "2024-03-01");
}

#[tokio::test]
async fn parse_falls_back_to_ocr_for_scanned_pdf() {
    let services = services().with_pdf(Arc::new(TextLayerPdf("  \n ")));
    let srv = TestServer::spawn(services).await;
    let res = reqwest::Client::new()
        .post(srv.url("/parse"))
        .multipart(file_form(b"%PDF-1.7 scanned".to_vec(), "scan.pdf", "application/pdf"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["method"], "ocr");
    assert_eq!(body["fields"]["organization_number"], "556677-8899");
    assert!(body["fields"]["total"].as_str().unwrap().contains("1234,50"));
}

#[tokio::test]
async fn parse_images_go_through_ocr() {
    let srv = TestServer::spawn(services()).await;
    let res = reqwest::Client::new()
        .post(srv.url("/parse"))
        .multipart(file_form(sample_png(), "kvitto.png", "image/png"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["method"], "ocr");
}
