use serde::Serialize;

use optic::Verdict;

use crate::routes::ApiResponse;
use crate::state::AppState;
use crate::util::multipart::{extract_boundary, extract_file, is_form_data};

/// Form field the upload is expected under.
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
struct PredictResponse {
    filename: String,
    #[serde(flatten)]
    verdict: Verdict,
}

/// `POST /predict`: one image in a multipart body, verdict JSON out.
pub fn handle(state: &AppState, content_type: &str, body: &[u8]) -> ApiResponse {
    if !is_form_data(content_type) {
        return ApiResponse::error(422, "expected a multipart/form-data body with a `file` field");
    }
    let Some(boundary) = extract_boundary(content_type) else {
        return ApiResponse::error(422, "multipart boundary missing from Content-Type");
    };
    let Some(part) = extract_file(body, &boundary, FILE_FIELD) else {
        return ApiResponse::error(422, "field required: file");
    };

    match state.pipeline.classify(&part.data) {
        Ok(verdict) => {
            log::info!(
                "{}: {} (confidence {:.4})",
                part.filename,
                verdict.label.as_str(),
                verdict.confidence
            );
            let response = PredictResponse { filename: part.filename, verdict };
            match serde_json::to_value(&response) {
                Ok(value) => ApiResponse::ok(value),
                Err(e) => ApiResponse::error(500, &e.to_string()),
            }
        }
        Err(e) => {
            let status = e.status_code();
            if status >= 500 {
                log::warn!("Prediction for {} failed: {}", part.filename, e);
            } else {
                log::info!("Rejected {}: {}", part.filename, e);
            }
            ApiResponse::error(status, &e.to_string())
        }
    }
}
