//! Shared fixtures for HTTP-level tests
//!
//! Images are generated at test time; the remote service is a `wiremock`
//! stub server.

#![allow(dead_code)]

use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use imgly_enhance::{InputImage, ServiceConfig};
use std::io::Cursor;
use std::time::Duration;
use wiremock::{
    matchers::{method, path},
    Match, Mock, MockServer, Request, ResponseTemplate,
};

pub const ENHANCE_PATH: &str = "/enhance/";
pub const REMOVE_PATH: &str = "/remove-and-enhance/";

/// Encode a small RGBA image as PNG
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 16) as u8, (y * 16) as u8, 128, 255])
    });
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("Failed to encode PNG fixture");
    buffer.into_inner()
}

/// Encode a small RGB image as JPEG
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 64]));
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .expect("Failed to encode JPEG fixture");
    buffer.into_inner()
}

pub fn png_input() -> InputImage {
    InputImage::new(png_bytes(8, 6), "photo.png", "image/png")
}

/// 200 response carrying `bytes` as `image/png`
pub fn image_response(bytes: Vec<u8>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(bytes, "image/png")
}

/// Response carrying a JSON body
pub fn json_response(status: u16, body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(body)
}

/// Mount `template` for POSTs to `route`
pub async fn mount(server: &MockServer, route: &str, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

/// Configuration pointing both stages at `server`
pub fn config_for(server: &MockServer, timeout: Duration) -> ServiceConfig {
    ServiceConfig::builder()
        .base_url(server.uri())
        .timeout(timeout)
        .build()
        .expect("Failed to build test configuration")
}

/// Matches a multipart upload whose `file` part carries `payload` under
/// `filename` with content type `image/png`
pub struct MultipartUpload {
    pub filename: String,
    pub payload: Vec<u8>,
}

impl Match for MultipartUpload {
    fn matches(&self, request: &Request) -> bool {
        let is_multipart = request
            .headers
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        let body = &request.body;
        let lowered = body.to_ascii_lowercase();
        let disposition = format!("name=\"file\"; filename=\"{}\"", self.filename);

        is_multipart
            && contains(body, disposition.as_bytes())
            && contains(&lowered, b"content-type: image/png")
            && contains(body, &self.payload)
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}
