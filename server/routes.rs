use std::io::{Cursor, Read};

use serde_json::{json, Value};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::handlers;
use crate::state::{AppState, SharedState};

/// Uploads above this size are refused without being read.
pub const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// A JSON response before it is bound to a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        ApiResponse { status: 200, body }
    }

    /// `{"detail": ...}` error body.
    pub fn error(status: u16, detail: &str) -> Self {
        ApiResponse { status, body: json!({ "detail": detail }) }
    }

    pub fn into_http(self) -> Response<Cursor<Vec<u8>>> {
        let bytes = self.body.to_string().into_bytes();
        let len = bytes.len();
        Response::new(
            StatusCode(self.status),
            vec![json_content_type()],
            Cursor::new(bytes),
            Some(len),
            None,
        )
    }
}

fn json_content_type() -> Header {
    Header::from_bytes(b"Content-Type", b"application/json").unwrap()
}

// ---------------------------------------------------------------------------
// Request dispatcher
// ---------------------------------------------------------------------------

/// Maps a request onto a handler. Kept free of tiny_http's `Request` so it
/// can be driven directly.
pub fn route(state: &AppState, method: &Method, path: &str, content_type: &str, body: &[u8]) -> ApiResponse {
    let expected = match path {
        "/" | "/health" | "/api/health" => Method::Get,
        "/predict" | "/api/predict" => Method::Post,
        _ => return ApiResponse::error(404, "Not Found"),
    };
    if *method != expected {
        return ApiResponse::error(405, "Method Not Allowed");
    }

    match path {
        "/" => handlers::health::handle_root(),
        "/health" | "/api/health" => handlers::health::handle_health(),
        _ => handlers::predict::handle(state, content_type, body),
    }
}

/// Reads one request off the wire, routes it and writes the response.
pub fn dispatch(mut request: Request, state: SharedState) {
    let method = request.method().clone();
    let url = request.url().to_owned();
    let path = url.split('?').next().unwrap_or("").to_owned();

    let content_type = request.headers().iter()
        .find(|h| h.field.equiv("Content-Type"))
        .map(|h| h.value.as_str().to_owned())
        .unwrap_or_default();

    let response = match request.body_length() {
        Some(len) if len > MAX_BODY_BYTES => ApiResponse::error(413, "upload too large"),
        _ => {
            let mut body = Vec::new();
            match request.as_reader().take(MAX_BODY_BYTES as u64 + 1).read_to_end(&mut body) {
                Ok(_) if body.len() > MAX_BODY_BYTES => ApiResponse::error(413, "upload too large"),
                Ok(_) => route(&state, &method, &path, &content_type, &body),
                Err(e) => {
                    log::warn!("Could not read body of {} {}: {}", method, path, e);
                    ApiResponse::error(400, "could not read request body")
                }
            }
        }
    };

    log::debug!("{} {} -> {}", method, path, response.status);
    if let Err(e) = request.respond(response.into_http()) {
        log::warn!("Failed to send response for {} {}: {}", method, path, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
    use optic::{Classifier, ImagePipeline, ModerationError, NormalizedTensor};

    struct Stub(Option<f64>);

    impl Classifier for Stub {
        fn predict(&self, _tensor: &NormalizedTensor) -> Result<f64, ModerationError> {
            self.0.ok_or_else(|| ModerationError::ModelUnavailable("model not loaded".into()))
        }

        fn ensure_ready(&self) -> Result<(), ModerationError> {
            self.0.map(|_| ()).ok_or_else(|| ModerationError::ModelUnavailable("model not loaded".into()))
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    fn state(score: Option<f64>) -> AppState {
        AppState::with_pipeline(ImagePipeline::new(Arc::new(Stub(score))))
    }

    fn black_png() -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([0, 0, 0])))
            .write_to(&mut std::io::Cursor::new(&mut buf), ImageOutputFormat::Png)
            .unwrap();
        buf
    }

    const CT: &str = "multipart/form-data; boundary=optic";

    fn upload(filename: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(b"--optic\r\n");
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n", filename).as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n--optic--\r\n");
        body
    }

    #[test]
    fn content_type_is_matched_case_insensitively() {
        let ct = "Multipart/Form-Data; Boundary=optic";
        let resp = route(&state(Some(0.9)), &Method::Post, "/predict", ct, &upload("black.png", &black_png()));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["label"], "Licit");
    }

    #[test]
    fn predict_licit() {
        let resp = route(&state(Some(0.9)), &Method::Post, "/predict", CT, &upload("black.png", &black_png()));
        assert_eq!(resp.status, 200);
        assert_eq!(
            resp.body,
            json!({
                "filename": "black.png",
                "label": "Licit",
                "is_licit": true,
                "confidence": 0.9,
                "raw_score": 0.9
            })
        );
    }

    #[test]
    fn predict_illicit_on_api_alias() {
        let resp = route(&state(Some(0.2)), &Method::Post, "/api/predict", CT, &upload("b.png", &black_png()));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["label"], "Illicit");
        assert_eq!(resp.body["is_licit"], false);
        assert_eq!(resp.body["confidence"], 0.8);
        assert_eq!(resp.body["raw_score"], 0.2);
    }

    #[test]
    fn model_unavailable_is_503() {
        let resp = route(&state(None), &Method::Post, "/predict", CT, &upload("b.png", &black_png()));
        assert_eq!(resp.status, 503);
        assert!(resp.body["detail"].as_str().unwrap().contains("model"));
    }

    #[test]
    fn undecodable_upload_is_400() {
        let resp = route(&state(Some(0.9)), &Method::Post, "/predict", CT, &upload("b.png", b"not an image"));
        assert_eq!(resp.status, 400);
        assert!(resp.body["detail"].is_string());
    }

    #[test]
    fn missing_file_is_422() {
        let resp = route(&state(Some(0.9)), &Method::Post, "/predict", CT, b"--optic--\r\n");
        assert_eq!(resp.status, 422);
        let resp = route(&state(Some(0.9)), &Method::Post, "/predict", "application/json", b"{}");
        assert_eq!(resp.status, 422);
    }

    #[test]
    fn liveness_routes() {
        let s = state(None);
        assert_eq!(
            route(&s, &Method::Get, "/", "", b"").body,
            json!({ "message": "Optic API is running" })
        );
        for path in ["/health", "/api/health"] {
            let resp = route(&s, &Method::Get, path, "", b"");
            assert_eq!(resp.status, 200);
            assert_eq!(resp.body, json!({ "status": "ok" }));
        }
    }

    #[test]
    fn unknown_route_and_wrong_method() {
        let s = state(Some(0.9));
        assert_eq!(route(&s, &Method::Get, "/nope", "", b"").status, 404);
        assert_eq!(route(&s, &Method::Get, "/predict", "", b"").status, 405);
        assert_eq!(route(&s, &Method::Post, "/health", "", b"").status, 405);
    }
}
